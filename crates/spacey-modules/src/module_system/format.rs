// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module format detection and export interop
//!
//! Every format ends up as the same thing: a mapping from export name to
//! value. This module decides which format a file is in and translates the
//! shapes that are not already a mapping.

use crate::value::{Object, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

/// Top-level `import`/`export` statement at the start of a line.
///
/// `import(` and `import.meta` are excluded; both are valid expressions
/// outside ES modules too.
static MODULE_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:import\s*(?:["'{*]|[A-Za-z_$][\w$]*\s*(?:,|\bfrom\b))|export\s+(?:default\b|const\b|let\b|var\b|\{|\*))"#)
        .expect("module syntax pattern is valid")
});

/// Module format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleFormat {
    /// CommonJS module (require/module.exports)
    #[serde(rename = "commonjs")]
    CommonJs,
    /// ECMAScript module (import/export)
    #[serde(rename = "module")]
    EsModule,
    /// JSON document
    #[serde(rename = "json")]
    Json,
}

impl ModuleFormat {
    /// Detect the format from the file extension alone.
    ///
    /// Returns `None` for extensions that don't decide the format (`.js`).
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("mjs") => Some(ModuleFormat::EsModule),
            Some("cjs") => Some(ModuleFormat::CommonJs),
            Some("json") => Some(ModuleFormat::Json),
            _ => None,
        }
    }

    /// Detect the format from a package.json "type" field
    pub fn from_package_type(type_field: Option<&str>) -> Option<Self> {
        match type_field {
            Some("module") => Some(ModuleFormat::EsModule),
            Some("commonjs") => Some(ModuleFormat::CommonJs),
            _ => None,
        }
    }

    /// Returns true if the source has top-level ES module syntax.
    pub fn has_module_syntax(source: &str) -> bool {
        MODULE_SYNTAX.is_match(source)
    }

    /// The name used in config files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::CommonJs => "commonjs",
            ModuleFormat::EsModule => "module",
            ModuleFormat::Json => "json",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "commonjs" | "cjs" => Ok(ModuleFormat::CommonJs),
            "module" | "esm" => Ok(ModuleFormat::EsModule),
            "json" => Ok(ModuleFormat::Json),
            other => Err(format!("unknown module format '{}'", other)),
        }
    }
}

/// Store a CommonJS `module.exports = value` assignment into `exports`.
///
/// The exports handle never changes. An object's properties are copied in;
/// any other value becomes the `default` export.
pub fn assign_module_exports(exports: &Object, value: Value) {
    match value {
        Value::Object(obj) => exports.replace_entries(&obj),
        other => {
            exports.clear();
            exports.set("default", other);
        }
    }
}

/// Store a parsed JSON document into `exports`.
pub fn assign_json_exports(exports: &Object, json: &serde_json::Value) {
    assign_module_exports(exports, Value::from_json(json));
}

/// The value an ES `import x from` binds for a module of `format`.
///
/// ES modules bind their `default` entry. CommonJS and JSON modules bind
/// their `default` entry when they have one, otherwise the whole exports
/// object. `None` means there is nothing to bind.
pub fn default_import(exports: &Object, format: ModuleFormat) -> Option<Value> {
    match format {
        ModuleFormat::CommonJs | ModuleFormat::Json => exports
            .get("default")
            .or_else(|| Some(Value::Object(exports.clone()))),
        ModuleFormat::EsModule => exports.get("default"),
    }
}

/// import.meta object
#[derive(Debug, Clone)]
pub struct ImportMeta {
    /// The URL of the current module
    pub url: String,
    /// The directory of the current module
    pub dirname: String,
    /// The filename of the current module
    pub filename: String,
    /// Whether this is the main module
    pub main: bool,
}

impl ImportMeta {
    /// Create import.meta for a module
    pub fn new(module_path: &Path, is_main: bool) -> Self {
        let url = format!("file://{}", module_path.display());
        let dirname = module_path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let filename = module_path.display().to_string();

        Self {
            url,
            dirname,
            filename,
            main: is_main,
        }
    }

    /// Convert to an object value
    pub fn to_object(&self) -> Object {
        let obj = Object::new();
        obj.set("url", self.url.clone());
        obj.set("dirname", self.dirname.clone());
        obj.set("filename", self.filename.clone());
        obj.set("main", self.main);
        obj
    }
}
