// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-modules
//!
//! A synchronous, `require()`-style module loader.
//!
//! - Resolves specifiers to canonical paths (relative files, directories,
//!   `node_modules` packages, host-registered built-ins)
//! - Executes each module once and caches its exports by canonical path
//! - Hands cyclic requesters the partially populated exports object
//! - Normalizes CommonJS, ES module and JSON exports to one mapping shape
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spacey_modules::ModuleLoader;
//!
//! let mut loader = ModuleLoader::new();
//! let hello = loader.load("hello.js")?;
//! assert_eq!(hello.get("hello"), Some("hello world!".into()));
//!
//! // Same exports object every time
//! assert!(hello.ptr_eq(&loader.load("hello.js")?));
//! ```
//!
//! Module bodies are executed by a [`ModuleEvaluator`]. The default
//! [`ScriptEvaluator`] understands a small JavaScript subset that covers
//! `require`/`exports`/`module.exports` and `import`/`export` declarations.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod fs;
pub mod module_system;
pub mod script;
pub mod value;

// Re-exports
pub use config::LoaderConfig;
pub use error::{ModuleError, Result, ScriptError};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use module_system::{
    ModuleCache, ModuleContext, ModuleEvaluator, ModuleFormat, ModuleHost, ModuleLoader,
    ModuleRecord, ModuleResolver, ModuleState, RequiredModule, ResolveResult,
};
pub use script::ScriptEvaluator;
pub use value::{Object, Value};

/// Version of the spacey-modules crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
