// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use std::path::PathBuf;
use thiserror::Error;

/// Result type for module loader operations
pub type Result<T> = std::result::Result<T, ModuleError>;

/// Errors raised by the loader.
///
/// Variants fall into two families: resolution errors (the module could not
/// be located) and execution errors (the module was found but its body
/// failed). See [`ModuleError::is_resolution_error`] and
/// [`ModuleError::is_execution_error`].
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Module not found
    #[error("Cannot find module '{specifier}'{}", format_require_stack(.require_stack))]
    NotFound {
        /// The specifier or path that was requested
        specifier: String,
        /// Modules that were loading when the lookup failed, innermost first
        require_stack: Vec<PathBuf>,
    },

    /// Module resolution error
    #[error("Error resolving module '{module}': {reason}")]
    Resolution {
        /// Module specifier
        module: String,
        /// Reason for failure
        reason: String,
    },

    /// The module body failed while executing
    #[error("{}: {source}", .path.display())]
    Execution {
        /// Module that failed
        path: PathBuf,
        /// What went wrong
        #[source]
        source: ScriptError,
    },

    /// A JSON module could not be parsed
    #[error("{}: JSON parse error: {source}", .path.display())]
    Json {
        /// Module that failed
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModuleError {
    /// Create a module not found error
    pub fn not_found(specifier: impl Into<String>) -> Self {
        Self::NotFound {
            specifier: specifier.into(),
            require_stack: Vec::new(),
        }
    }

    /// Returns true if the module could not be located.
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Resolution { .. })
    }

    /// Returns true if the module was located but failed to execute.
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self,
            Self::Execution { .. } | Self::Json { .. }
        )
    }
}

fn format_require_stack(stack: &[PathBuf]) -> String {
    if stack.is_empty() {
        return String::new();
    }
    let mut out = String::from("\nRequire stack:");
    for path in stack {
        out.push_str("\n- ");
        out.push_str(&path.display().to_string());
    }
    out
}

/// Errors raised while executing a module body.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Source could not be parsed
    #[error("SyntaxError: {message} (line {line})")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// Description
        message: String,
    },

    /// Undefined variable
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    /// Wrong kind of value
    #[error("TypeError: {0}")]
    Type(String),

    /// A value thrown by the module with `throw`
    #[error("Uncaught {0}")]
    Thrown(String),

    /// Named import that the target module does not export
    #[error("SyntaxError: The requested module '{specifier}' does not provide an export named '{name}'")]
    MissingExport {
        /// Import specifier
        specifier: String,
        /// Export name
        name: String,
    },

    /// A nested require failed; carried through unchanged
    #[error(transparent)]
    Module(Box<ModuleError>),
}

impl ScriptError {
    /// Create a new TypeError
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    /// Create a new SyntaxError
    pub fn syntax(line: usize, msg: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: msg.into(),
        }
    }
}

impl From<ModuleError> for ScriptError {
    fn from(err: ModuleError) -> Self {
        ScriptError::Module(Box::new(err))
    }
}
