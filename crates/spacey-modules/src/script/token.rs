// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Token definitions for the module body scanner.

/// A span in the source code, representing a range of characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A token produced by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
    /// 1-based line the token starts on
    pub line: usize,
    /// A line terminator separates this token from the previous one
    pub newline_before: bool,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span, line: usize, newline_before: bool) -> Self {
        Self {
            kind,
            span,
            line,
            newline_before,
        }
    }
}

/// The kinds of tokens the scanner produces.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Identifier
    Identifier(String),

    // Keywords
    /// const
    Const,
    /// let
    Let,
    /// var
    Var,
    /// import
    Import,
    /// export
    Export,
    /// default
    Default,
    /// throw
    Throw,
    /// typeof
    Typeof,
    /// true
    True,
    /// false
    False,
    /// null
    Null,

    // Punctuators
    /// {
    LeftBrace,
    /// }
    RightBrace,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// ;
    Semicolon,
    /// ,
    Comma,
    /// :
    Colon,
    /// .
    Dot,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// !
    Bang,
    /// =
    Equal,
    /// ==
    EqualEqual,
    /// ===
    EqualEqualEqual,
    /// !=
    BangEqual,
    /// !==
    BangEqualEqual,

    /// Character or literal the scanner could not make sense of
    Invalid(String),
    /// End of input
    Eof,
}

impl TokenKind {
    /// Keyword text, for tokens that may also be used as property names
    pub fn keyword(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::Const => "const",
            TokenKind::Let => "let",
            TokenKind::Var => "var",
            TokenKind::Import => "import",
            TokenKind::Export => "export",
            TokenKind::Default => "default",
            TokenKind::Throw => "throw",
            TokenKind::Typeof => "typeof",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            _ => return None,
        };
        Some(text)
    }

    /// Short description used in syntax errors
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => crate::value::Value::Number(*n).to_string(),
            TokenKind::String(s) => format!("'{}'", s),
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Invalid(text) => text.clone(),
            TokenKind::Eof => "end of input".to_string(),
            other => {
                if let Some(keyword) = other.keyword() {
                    return keyword.to_string();
                }
                let text = match other {
                    TokenKind::LeftBrace => "{",
                    TokenKind::RightBrace => "}",
                    TokenKind::LeftParen => "(",
                    TokenKind::RightParen => ")",
                    TokenKind::LeftBracket => "[",
                    TokenKind::RightBracket => "]",
                    TokenKind::Semicolon => ";",
                    TokenKind::Comma => ",",
                    TokenKind::Colon => ":",
                    TokenKind::Dot => ".",
                    TokenKind::Plus => "+",
                    TokenKind::Minus => "-",
                    TokenKind::Star => "*",
                    TokenKind::Bang => "!",
                    TokenKind::Equal => "=",
                    TokenKind::EqualEqual => "==",
                    TokenKind::EqualEqualEqual => "===",
                    TokenKind::BangEqual => "!=",
                    TokenKind::BangEqualEqual => "!==",
                    _ => "token",
                };
                text.to_string()
            }
        }
    }
}
