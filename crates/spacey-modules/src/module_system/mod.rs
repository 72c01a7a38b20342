// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module system implementation
//!
//! Loads CommonJS modules, ES modules and JSON documents through one cache.
//!
//! ## CommonJS
//! - `require()` function
//! - `module.exports` / `exports`
//! - Partial exports for circular requires
//!
//! ## ESM
//! - `import` / `export` declarations
//! - `import.meta` object
//! - `.mjs` / `.cjs` file extensions
//! - `package.json` "type" field

mod cache;
mod evaluator;
pub mod format;
mod loader;
mod require;
mod resolver;

pub use cache::{ModuleCache, ModuleRecord, ModuleState};
pub use evaluator::{ModuleContext, ModuleEvaluator, ModuleHost, RequiredModule};
pub use format::{ImportMeta, ModuleFormat};
pub use loader::ModuleLoader;
pub use require::{require, require_cache, require_main, require_resolve};
pub use resolver::{ModuleResolver, ResolveResult};
