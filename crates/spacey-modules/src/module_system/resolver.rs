// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution (Node.js algorithm)

use crate::config::LoaderConfig;
use crate::error::{ModuleError, Result};
use crate::fs::FileSystem;
use crate::module_system::format::ModuleFormat;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Result of module resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    /// Host-registered built-in module
    BuiltIn(String),
    /// File module (canonical path)
    File(PathBuf),
}

impl ResolveResult {
    /// The resolved path, or the built-in's name
    pub fn display_name(&self) -> String {
        match self {
            ResolveResult::BuiltIn(name) => name.clone(),
            ResolveResult::File(path) => path.display().to_string(),
        }
    }
}

/// Module resolver implementing the Node.js resolution algorithm
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    /// Built-in module names
    builtins: HashSet<String>,
    /// File extensions to try
    extensions: Vec<String>,
    /// Package directory names (node_modules)
    module_directories: Vec<String>,
}

impl ModuleResolver {
    /// Create a new module resolver with default settings
    pub fn new() -> Self {
        Self::from_config(&LoaderConfig::default())
    }

    /// Create a resolver using the config's extensions and package directories
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            builtins: HashSet::new(),
            extensions: config.extensions.clone(),
            module_directories: config.module_directories.clone(),
        }
    }

    /// Make `name` resolve as a built-in module
    pub fn add_builtin(&mut self, name: impl Into<String>) {
        self.builtins.insert(name.into());
    }

    /// Check if a module is a built-in
    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains(name)
    }

    /// Resolve a module specifier requested from `from_dir`
    pub fn resolve(
        &self,
        specifier: &str,
        from_dir: &Path,
        fs: &dyn FileSystem,
    ) -> Result<ResolveResult> {
        if self.is_builtin(specifier) {
            return Ok(ResolveResult::BuiltIn(specifier.to_string()));
        }

        if is_path_specifier(specifier) {
            let path = from_dir.join(specifier);
            let found = if names_directory(specifier) {
                self.resolve_directory_only(&path, fs)?
            } else {
                self.resolve_file(&path, fs)?
            };
            return found
                .map(ResolveResult::File)
                .ok_or_else(|| ModuleError::not_found(specifier));
        }

        self.resolve_package(specifier, from_dir, fs)
            .map(ResolveResult::File)
    }

    /// Resolve an absolute file system path (exact, extensions, directory)
    pub fn resolve_path(&self, path: &Path, fs: &dyn FileSystem) -> Result<PathBuf> {
        self.resolve_file(path, fs)?
            .ok_or_else(|| ModuleError::not_found(path.display().to_string()))
    }

    /// Resolve a file path
    fn resolve_file(&self, path: &Path, fs: &dyn FileSystem) -> Result<Option<PathBuf>> {
        // Try exact path first
        if fs.is_file(path) {
            return self.canonical(path, fs).map(Some);
        }

        // Try appending each extension to the full file name
        if let Some(file_name) = path.file_name() {
            for ext in &self.extensions {
                let mut candidate = file_name.to_os_string();
                candidate.push(ext);
                let with_ext = path.with_file_name(candidate);
                if fs.is_file(&with_ext) {
                    return self.canonical(&with_ext, fs).map(Some);
                }
            }
        }

        // Try as directory with index file
        if fs.is_dir(path) {
            return self.resolve_directory(path, fs);
        }

        Ok(None)
    }

    /// `./lib/` skips the file steps, so a sibling `lib.js` never wins
    fn resolve_directory_only(&self, dir: &Path, fs: &dyn FileSystem) -> Result<Option<PathBuf>> {
        if fs.is_dir(dir) {
            self.resolve_directory(dir, fs)
        } else {
            Ok(None)
        }
    }

    /// Resolve a directory (package.json main, then index files)
    fn resolve_directory(&self, dir: &Path, fs: &dyn FileSystem) -> Result<Option<PathBuf>> {
        let package_json_path = dir.join("package.json");
        if fs.is_file(&package_json_path) {
            let pkg = read_package_json(&package_json_path, fs)?;
            if let Some(main) = pkg.main.filter(|m| !m.is_empty()) {
                let main_path = dir.join(&main);
                if fs.is_file(&main_path) {
                    return self.canonical(&main_path, fs).map(Some);
                }
                if let Some(found) = self.resolve_index(&main_path, fs)? {
                    return Ok(Some(found));
                }
                if let Some(file_name) = main_path.file_name() {
                    for ext in &self.extensions {
                        let mut candidate = file_name.to_os_string();
                        candidate.push(ext);
                        let with_ext = main_path.with_file_name(candidate);
                        if fs.is_file(&with_ext) {
                            return self.canonical(&with_ext, fs).map(Some);
                        }
                    }
                }
                trace!("package.json main '{}' in {} not found", main, dir.display());
            }
        }

        self.resolve_index(dir, fs)
    }

    /// Try `index` + each extension inside `dir`
    fn resolve_index(&self, dir: &Path, fs: &dyn FileSystem) -> Result<Option<PathBuf>> {
        for ext in &self.extensions {
            let index = dir.join(format!("index{}", ext));
            if fs.is_file(&index) {
                return self.canonical(&index, fs).map(Some);
            }
        }
        Ok(None)
    }

    /// Resolve a package from the package directories above `from_dir`
    fn resolve_package(
        &self,
        specifier: &str,
        from_dir: &Path,
        fs: &dyn FileSystem,
    ) -> Result<PathBuf> {
        let (package_name, subpath) = self.parse_package_specifier(specifier);
        if package_name.is_empty() {
            return Err(ModuleError::not_found(specifier));
        }

        // Walk up directory tree looking for node_modules
        let mut current = Some(from_dir);
        while let Some(dir) = current {
            current = dir.parent();

            // node_modules/node_modules is never searched
            let in_module_dir = dir
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| self.module_directories.iter().any(|m| m == n));
            if in_module_dir {
                continue;
            }

            for module_dir in &self.module_directories {
                let package_root = dir.join(module_dir).join(package_name);
                let target = match subpath {
                    Some(sub) => package_root.join(sub),
                    None => package_root,
                };
                let found = if names_directory(specifier) {
                    self.resolve_directory_only(&target, fs)?
                } else {
                    self.resolve_file(&target, fs)?
                };
                if let Some(found) = found {
                    trace!("Resolved package '{}' to {}", specifier, found.display());
                    return Ok(found);
                }
            }
        }

        Err(ModuleError::not_found(specifier))
    }

    /// Parse a package specifier into name and optional subpath
    fn parse_package_specifier<'a>(&self, specifier: &'a str) -> (&'a str, Option<&'a str>) {
        if specifier.starts_with('@') {
            // Scoped package: @scope/name or @scope/name/subpath
            if let Some(slash_pos) = specifier[1..].find('/') {
                let after_scope = &specifier[slash_pos + 2..];
                if let Some(subpath_pos) = after_scope.find('/') {
                    let name_end = slash_pos + 2 + subpath_pos;
                    return (&specifier[..name_end], Some(&specifier[name_end + 1..]));
                }
            }
            (specifier, None)
        } else if let Some(slash_pos) = specifier.find('/') {
            (&specifier[..slash_pos], Some(&specifier[slash_pos + 1..]))
        } else {
            (specifier, None)
        }
    }

    /// Format declared by the nearest package.json "type" field.
    ///
    /// The nearest package.json ends the search even when it has no "type".
    pub fn package_scope_format(
        &self,
        path: &Path,
        fs: &dyn FileSystem,
    ) -> Result<Option<ModuleFormat>> {
        let mut current = path.parent();
        while let Some(dir) = current {
            let pkg_path = dir.join("package.json");
            if fs.is_file(&pkg_path) {
                let pkg = read_package_json(&pkg_path, fs)?;
                return Ok(ModuleFormat::from_package_type(pkg.type_field.as_deref()));
            }
            current = dir.parent();
        }
        Ok(None)
    }

    fn canonical(&self, path: &Path, fs: &dyn FileSystem) -> Result<PathBuf> {
        fs.canonicalize(path).map_err(|e| ModuleError::Resolution {
            module: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true for `./x`, `../x`, `/x` and friends
fn is_path_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || (cfg!(windows) && specifier.chars().nth(1) == Some(':'))
}

/// Specifiers that can only name a directory
fn names_directory(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.ends_with('/')
}

/// Minimal package.json structure for resolution
#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    main: Option<String>,
    #[serde(rename = "type")]
    type_field: Option<String>,
}

fn read_package_json(path: &Path, fs: &dyn FileSystem) -> Result<PackageJson> {
    let content = fs.read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| ModuleError::Resolution {
        module: path.display().to_string(),
        reason: format!("invalid package.json: {}", e),
    })
}
