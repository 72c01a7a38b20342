// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration.
//!
//! Layers, lowest priority first: defaults, the global config file, the
//! project config file (or an explicit one), then `SPACEY_LOADER_*`
//! environment variables.

use crate::error::{ModuleError, Result};
use crate::module_system::ModuleFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project config file name, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "spacey-loader.json";

/// Prefix of environment variables that override config keys
pub const ENV_PREFIX: &str = "SPACEY_LOADER_";

/// Configuration for a [`ModuleLoader`](crate::ModuleLoader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory that relative `load()` paths are joined to.
    /// Relative values are taken from the process working directory.
    pub base_dir: PathBuf,

    /// Extensions tried, in order, when a path has no exact match
    pub extensions: Vec<String>,

    /// Format of files whose extension and package.json don't decide it
    pub default_format: ModuleFormat,

    /// Treat ambiguous files containing `import`/`export` as ES modules
    pub detect_module_syntax: bool,

    /// Honor the nearest package.json "type" field
    pub package_type_lookup: bool,

    /// Directory names searched for packages
    pub module_directories: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            extensions: vec![
                ".js".to_string(),
                ".mjs".to_string(),
                ".cjs".to_string(),
                ".json".to_string(),
            ],
            default_format: ModuleFormat::CommonJs,
            detect_module_syntax: true,
            package_type_lookup: true,
            module_directories: vec!["node_modules".to_string()],
        }
    }
}

impl LoaderConfig {
    /// Load configuration from default locations.
    ///
    /// `explicit` replaces the project config file when given.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = LoaderConfig::default();

        if let Some(global) = global_config_path() {
            if global.is_file() {
                config.merge_from_file(&global)?;
            }
        }

        match explicit {
            Some(path) => config.merge_from_file(path)?,
            None => {
                let project = PathBuf::from(PROJECT_CONFIG_FILE);
                if project.is_file() {
                    config.merge_from_file(&project)?;
                }
            }
        }

        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Merge keys present in a JSON config file over this config.
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        debug!("Reading loader config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        self.merge_from_str(&content)
            .map_err(|e| ModuleError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Merge keys present in a JSON document over this config.
    pub fn merge_from_str(&mut self, content: &str) -> Result<()> {
        let json: serde_json::Value =
            serde_json::from_str(content).map_err(|e| ModuleError::Config(e.to_string()))?;
        let serde_json::Value::Object(map) = json else {
            return Err(ModuleError::Config("expected a JSON object".to_string()));
        };

        for (key, value) in map {
            match value {
                serde_json::Value::String(s) => self.set(&key, &s)?,
                serde_json::Value::Bool(b) => self.set(&key, &b.to_string())?,
                serde_json::Value::Array(items) => {
                    let joined = items
                        .iter()
                        .map(|item| match item {
                            serde_json::Value::String(s) => Ok(s.clone()),
                            other => Err(ModuleError::Config(format!(
                                "'{}' entries must be strings, found {}",
                                key, other
                            ))),
                        })
                        .collect::<Result<Vec<_>>>()?
                        .join(",");
                    self.set(&key, &joined)?;
                }
                other => {
                    return Err(ModuleError::Config(format!(
                        "unsupported value for '{}': {}",
                        key, other
                    )));
                }
            }
        }
        Ok(())
    }

    /// Apply `SPACEY_LOADER_*` variables from `vars`.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                let config_key = config_key.to_lowercase();
                debug!("Config override from environment: {}", config_key);
                self.set(&config_key, &value)?;
            }
        }
        Ok(())
    }

    /// Set a configuration value. List values are comma separated.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.replace('-', "_").as_str() {
            "base_dir" => self.base_dir = PathBuf::from(value),
            "extensions" => {
                self.extensions = split_list(value)
                    .map(|ext| {
                        if ext.starts_with('.') {
                            ext.to_string()
                        } else {
                            format!(".{}", ext)
                        }
                    })
                    .collect();
            }
            "default_format" => {
                self.default_format = value.parse().map_err(ModuleError::Config)?;
            }
            "detect_module_syntax" => self.detect_module_syntax = parse_bool(key, value)?,
            "package_type_lookup" => self.package_type_lookup = parse_bool(key, value)?,
            "module_directories" => {
                self.module_directories = split_list(value).map(str::to_string).collect();
            }
            _ => {
                return Err(ModuleError::Config(format!("unknown key '{}'", key)));
            }
        }
        Ok(())
    }

    /// Builder-style override of [`LoaderConfig::base_dir`]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ModuleError::Config(format!(
            "'{}' expects a boolean, found '{}'",
            key, other
        ))),
    }
}

/// Global config file location.
fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spacey").join("loader.json"))
}
