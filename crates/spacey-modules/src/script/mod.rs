// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in evaluator for module bodies.
//!
//! Understands the part of JavaScript that module bodies are made of:
//! declarations, assignments to `exports` / `module.exports`, `require()`,
//! `import` / `export` declarations and simple expressions.
//!
//! ## Structure
//!
//! - `scanner.rs` - `Scanner` that produces tokens
//! - `token.rs` - `Token` and `TokenKind` definitions
//! - `parser.rs` - recursive descent `Parser` producing `ast` nodes
//! - `interp.rs` - tree-walking `Interpreter`

pub mod ast;
mod interp;
mod parser;
mod scanner;
mod token;

pub use interp::Interpreter;
pub use parser::Parser;
pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};

use crate::error::ScriptError;
use crate::module_system::{ModuleContext, ModuleEvaluator, ModuleHost};
use tracing::trace;

/// The default [`ModuleEvaluator`]: parses and interprets module bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptEvaluator;

impl ScriptEvaluator {
    /// Create a new script evaluator
    pub fn new() -> Self {
        Self
    }
}

impl ModuleEvaluator for ScriptEvaluator {
    fn evaluate(&self, module: &ModuleContext, host: &mut dyn ModuleHost) -> Result<(), ScriptError> {
        let program = Parser::new(&module.source).parse_program()?;
        trace!(
            "Parsed {} statements from {}",
            program.body.len(),
            module.path.display()
        );
        Interpreter::new(module, host).run(&program)
    }
}
