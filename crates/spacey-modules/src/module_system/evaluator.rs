// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The seam between the loader and whatever executes module bodies.

use crate::error::{Result, ScriptError};
use crate::module_system::format::ModuleFormat;
use crate::value::{Object, Value};
use std::path::{Path, PathBuf};

/// Everything an evaluator needs to run one module body.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// Canonical path of the module
    pub path: PathBuf,
    /// Directory containing the module; relative requires start here
    pub dirname: PathBuf,
    /// Module source text
    pub source: String,
    /// Format the body must be executed as
    pub format: ModuleFormat,
    /// The shared exports object; populate it while executing
    pub exports: Object,
    /// Whether this is the first module loaded by the loader
    pub is_main: bool,
}

/// A module obtained through [`ModuleHost::require`].
#[derive(Debug, Clone)]
pub struct RequiredModule {
    /// The module's exports (partial while `complete` is false)
    pub exports: Object,
    /// Format of the required module
    pub format: ModuleFormat,
    /// False when the module is still executing (a require cycle)
    pub complete: bool,
}

/// Loader services available to a module body while it runs.
pub trait ModuleHost {
    /// Load `specifier` relative to `from_dir`
    fn require(&mut self, specifier: &str, from_dir: &Path) -> Result<RequiredModule>;

    /// Resolve `specifier` without loading it
    fn resolve(&self, specifier: &str, from_dir: &Path) -> Result<String>;

    /// Cached exports keyed by path
    fn cache_snapshot(&self) -> Object;

    /// The main module's `module` object, or undefined
    fn main_module_object(&self) -> Value;
}

/// Executes module bodies.
///
/// Implementations write exports into [`ModuleContext::exports`] as they go
/// and may call back into the loader through `host`.
pub trait ModuleEvaluator {
    /// Execute one module body
    fn evaluate(
        &self,
        module: &ModuleContext,
        host: &mut dyn ModuleHost,
    ) -> std::result::Result<(), ScriptError>;
}
