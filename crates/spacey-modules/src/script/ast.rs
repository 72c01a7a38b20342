// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Syntax tree for module bodies.

/// A parsed module body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements in source order
    pub body: Vec<Statement>,
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `const`/`let`/`var` declaration
    Variable(VariableDeclaration),
    /// Expression statement
    Expression(Expression),
    /// `throw expr`
    Throw(Expression),
    /// `import ...`
    Import(ImportDeclaration),
    /// `export ...`
    Export(ExportDeclaration),
    /// `;`
    Empty,
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// Declaration keyword
    pub kind: VariableKind,
    /// `name = init` pairs
    pub declarations: Vec<VariableDeclarator>,
    /// Line of the keyword
    pub line: usize,
}

/// One `name = init` in a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// Bound name
    pub name: String,
    /// Initializer
    pub init: Option<Expression>,
}

/// `import` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDeclaration {
    /// Module specifier
    pub source: String,
    /// `import d from`
    pub default: Option<String>,
    /// `import * as ns from`
    pub namespace: Option<String>,
    /// `import { imported as local }`
    pub named: Vec<ImportSpecifier>,
    /// Line of the `import` keyword
    pub line: usize,
}

/// `imported as local`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    /// Name exported by the target module
    pub imported: String,
    /// Local binding
    pub local: String,
}

/// `export` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDeclaration {
    /// What is exported
    pub kind: ExportKind,
    /// Line of the `export` keyword
    pub line: usize,
}

/// The forms of `export`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportKind {
    /// `export const|let|var ...`
    Variable(VariableDeclaration),
    /// `export default expr`
    Default(Expression),
    /// `export { local as exported }`, optionally `from "m"`
    Named {
        /// Exported names
        specifiers: Vec<ExportSpecifier>,
        /// Re-export source
        source: Option<String>,
    },
    /// `export * from "m"` / `export * as ns from "m"`
    All {
        /// Re-export source
        source: String,
        /// Namespace name
        alias: Option<String>,
    },
}

/// `local as exported`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    /// Local binding, or the name in the source module for re-exports
    pub local: String,
    /// Name exposed to importers
    pub exported: String,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null
    Null,
    /// Identifier reference
    Identifier(String),
    /// `[a, b]`
    Array(Vec<Expression>),
    /// `{ key: value }`
    Object(Vec<(String, Expression)>),
    /// `object.property`
    Member {
        /// Object expression
        object: Box<Expression>,
        /// Property name
        property: String,
    },
    /// `object[property]`
    Computed {
        /// Object expression
        object: Box<Expression>,
        /// Property expression
        property: Box<Expression>,
    },
    /// `callee(arguments)`
    Call {
        /// Called expression
        callee: Box<Expression>,
        /// Arguments
        arguments: Vec<Expression>,
    },
    /// Prefix operator
    Unary {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        argument: Box<Expression>,
    },
    /// Infix operator
    Binary {
        /// Operator
        operator: BinaryOperator,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },
    /// `target = value`
    Assign {
        /// Identifier or member target
        target: Box<Expression>,
        /// Assigned value
        value: Box<Expression>,
    },
    /// `import.meta`, with its line
    ImportMeta(usize),
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `!`
    Not,
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `typeof`
    Typeof,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `===`
    StrictEqual,
    /// `!==`
    StrictNotEqual,
}
