// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loader - resolves, executes and caches modules

use crate::config::LoaderConfig;
use crate::error::{ModuleError, Result, ScriptError};
use crate::fs::{FileSystem, OsFileSystem};
use crate::module_system::cache::{ModuleCache, ModuleRecord, ModuleState};
use crate::module_system::evaluator::{ModuleContext, ModuleEvaluator, ModuleHost, RequiredModule};
use crate::module_system::format::{ModuleFormat, assign_json_exports};
use crate::module_system::require::{require_cache, require_main, require_resolve};
use crate::module_system::resolver::{ModuleResolver, ResolveResult};
use crate::script::ScriptEvaluator;
use crate::value::{Object, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, instrument, trace, warn};

/// Module loader
///
/// Each loader owns its cache; two loaders never share modules.
pub struct ModuleLoader {
    /// Loader configuration
    config: LoaderConfig,
    /// File access
    fs: Box<dyn FileSystem>,
    /// Executes module bodies
    evaluator: Rc<dyn ModuleEvaluator>,
    /// Module resolver
    resolver: ModuleResolver,
    /// Module cache
    cache: ModuleCache,
    /// Host-registered built-in modules
    builtins: HashMap<String, Object>,
    /// Stack of currently loading modules, outermost first
    loading_stack: Vec<PathBuf>,
    /// First module loaded
    main_module: Option<PathBuf>,
}

impl ModuleLoader {
    /// Create a loader over the real file system with default settings
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a loader over the real file system
    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            resolver: ModuleResolver::from_config(&config),
            config,
            fs: Box::new(OsFileSystem),
            evaluator: Rc::new(ScriptEvaluator::new()),
            cache: ModuleCache::new(),
            builtins: HashMap::new(),
            loading_stack: Vec::new(),
            main_module: None,
        }
    }

    /// Replace the file system
    pub fn with_file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    /// Replace the module evaluator
    pub fn with_evaluator(mut self, evaluator: impl ModuleEvaluator + 'static) -> Self {
        self.evaluator = Rc::new(evaluator);
        self
    }

    /// Get the loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load the module at `path` and return its exports.
    ///
    /// Relative paths are taken from the configured base directory. Loading
    /// the same file again returns the same exports object without
    /// executing it a second time.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Object> {
        let resolved = self.resolve_path(path)?;
        self.load_file(&resolved).map(|module| module.exports)
    }

    /// Canonical path [`ModuleLoader::load`] would load for `path`
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir()?.join(path)
        };

        self.resolver
            .resolve_path(&absolute, self.fs.as_ref())
            .map_err(|err| self.with_require_stack(err))
    }

    /// Load `specifier` as requested by a module living in `from_dir`
    #[instrument(level = "debug", skip(self))]
    pub fn require(&mut self, specifier: &str, from_dir: &Path) -> Result<RequiredModule> {
        let resolved = self
            .resolver
            .resolve(specifier, from_dir, self.fs.as_ref())
            .map_err(|err| self.with_require_stack(err))?;

        match resolved {
            ResolveResult::BuiltIn(name) => self.load_builtin(&name),
            ResolveResult::File(path) => self.load_file(&path),
        }
    }

    /// Resolve `specifier` from `from_dir` without loading it
    pub fn resolve(&self, specifier: &str, from_dir: &Path) -> Result<ResolveResult> {
        self.resolver.resolve(specifier, from_dir, self.fs.as_ref())
    }

    /// Make `name` resolvable as a built-in module with the given exports
    pub fn register_builtin(&mut self, name: impl Into<String>, exports: Object) {
        let name = name.into();
        self.resolver.add_builtin(name.clone());
        self.builtins.insert(name, exports);
    }

    /// Get the module cache
    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// State of the module cached at `path`
    pub fn state(&self, path: &Path) -> Option<ModuleState> {
        self.cache.get(path).map(|record| record.state)
    }

    /// Drop one module from the cache so the next load executes it again
    pub fn evict(&mut self, path: &Path) -> Option<ModuleRecord> {
        debug!("Evicting {}", path.display());
        self.cache.remove(path)
    }

    /// Clear the module cache
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.main_module = None;
    }

    /// The first module this loader loaded
    pub fn main_module(&self) -> Option<&Path> {
        self.main_module.as_deref()
    }

    /// Check if a module is a built-in
    pub fn is_builtin(&self, name: &str) -> bool {
        self.resolver.is_builtin(name)
    }

    fn base_dir(&self) -> Result<PathBuf> {
        if self.config.base_dir.is_absolute() {
            Ok(self.config.base_dir.clone())
        } else {
            Ok(std::env::current_dir()?.join(&self.config.base_dir))
        }
    }

    /// Load a built-in module
    fn load_builtin(&self, name: &str) -> Result<RequiredModule> {
        let exports = self
            .builtins
            .get(name)
            .cloned()
            .ok_or_else(|| ModuleError::not_found(name))?;
        Ok(RequiredModule {
            exports,
            format: ModuleFormat::CommonJs,
            complete: true,
        })
    }

    /// Load a resolved file, consulting the cache first
    fn load_file(&mut self, path: &Path) -> Result<RequiredModule> {
        let parent = self.loading_stack.last().cloned();
        if let Some(parent) = &parent {
            self.cache.add_child(parent, path);
        }

        if let Some(record) = self.cache.get(path) {
            return match &record.state {
                ModuleState::Loaded => {
                    trace!("Cache hit for {}", path.display());
                    Ok(RequiredModule {
                        exports: record.exports.clone(),
                        format: record.format,
                        complete: true,
                    })
                }
                // Also reached for a module whose body failed earlier
                ModuleState::Loading => {
                    debug!("Circular require of {}, returning partial exports", path.display());
                    Ok(RequiredModule {
                        exports: record.exports.clone(),
                        format: record.format,
                        complete: false,
                    })
                }
            };
        }

        let source = self.fs.read_to_string(path)?;
        let format = self.detect_format(path, &source)?;
        debug!("Loading {} as {}", path.display(), format);

        let is_main = self.loading_stack.is_empty() && self.main_module.is_none();
        if is_main {
            self.main_module = Some(path.to_path_buf());
        }

        // Registered before execution so re-entrant requires see it as Loading
        let record = ModuleRecord::loading(path.to_path_buf(), format, parent);
        let exports = record.exports.clone();
        self.cache.insert(record);

        self.loading_stack.push(path.to_path_buf());
        let outcome = match format {
            ModuleFormat::Json => serde_json::from_str::<serde_json::Value>(&source)
                .map(|json| assign_json_exports(&exports, &json))
                .map_err(|e| ModuleError::Json {
                    path: path.to_path_buf(),
                    source: e,
                }),
            ModuleFormat::CommonJs | ModuleFormat::EsModule => {
                let context = ModuleContext {
                    path: path.to_path_buf(),
                    dirname: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                    source,
                    format,
                    exports: exports.clone(),
                    is_main,
                };
                let evaluator = Rc::clone(&self.evaluator);
                evaluator
                    .evaluate(&context, self)
                    .map_err(|err| match err {
                        // Nested require failures pass through unchanged
                        ScriptError::Module(inner) => *inner,
                        other => ModuleError::Execution {
                            path: path.to_path_buf(),
                            source: other,
                        },
                    })
            }
        };
        self.loading_stack.pop();

        match &outcome {
            Ok(()) => {
                if let Some(record) = self.cache.get_mut(path) {
                    record.state = ModuleState::Loaded;
                }
            }
            // The record stays Loading
            Err(err) => {
                warn!("Failed to load {}: {}", path.display(), err);
                if is_main {
                    self.main_module = None;
                }
            }
        }

        outcome.map(|()| {
            debug!("Loaded {} ({} exports)", path.display(), exports.len());
            RequiredModule {
                exports,
                format,
                complete: true,
            }
        })
    }

    /// Decide the format of a file that is about to execute
    fn detect_format(&self, path: &Path, source: &str) -> Result<ModuleFormat> {
        if let Some(format) = ModuleFormat::from_extension(path) {
            return Ok(format);
        }

        if self.config.package_type_lookup {
            if let Some(format) = self
                .resolver
                .package_scope_format(path, self.fs.as_ref())?
            {
                return Ok(format);
            }
        }

        if self.config.detect_module_syntax && ModuleFormat::has_module_syntax(source) {
            trace!("Detected module syntax in {}", path.display());
            return Ok(ModuleFormat::EsModule);
        }

        Ok(self.config.default_format)
    }

    /// Attach the current require stack to a not-found error
    fn with_require_stack(&self, err: ModuleError) -> ModuleError {
        match err {
            ModuleError::NotFound {
                specifier,
                require_stack,
            } if require_stack.is_empty() => ModuleError::NotFound {
                specifier,
                require_stack: self.loading_stack.iter().rev().cloned().collect(),
            },
            other => other,
        }
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleHost for ModuleLoader {
    fn require(&mut self, specifier: &str, from_dir: &Path) -> Result<RequiredModule> {
        ModuleLoader::require(self, specifier, from_dir)
    }

    fn resolve(&self, specifier: &str, from_dir: &Path) -> Result<String> {
        require_resolve(self, specifier, from_dir)
    }

    fn cache_snapshot(&self) -> Object {
        require_cache(self)
    }

    fn main_module_object(&self) -> Value {
        require_main(self)
    }
}
