//! Magik parser: turns source text into an arena [`Ast`].
//!
//! Parsing is total. Lexical and syntax problems are collected as
//! [`ParseError`]s next to a tree that contains `Error` nodes where the
//! input could not be understood.

pub mod ast;
pub mod error;
mod parser;

use magik_lexer::Lexer;

use crate::ast::Ast;
use crate::error::ParseError;
use crate::parser::Parser;

/// The result of parsing one source file.
#[derive(Debug, Clone)]
pub struct Parse {
    ast: Ast,
    errors: Vec<ParseError>,
}

impl Parse {
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Whether the source parsed without any error.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_parts(self) -> (Ast, Vec<ParseError>) {
        (self.ast, self.errors)
    }
}

/// Parse a complete Magik source file.
pub fn parse(source: &str) -> Parse {
    let (tokens, lex_errors) = Lexer::tokenize_with_errors(source);
    let mut parser = Parser::new(tokens, source);
    for error in lex_errors {
        parser.push_error(error.into());
    }

    let root = parser::statements::module(&mut parser);
    let (ast, errors) = parser.finish(root);
    Parse { ast, errors }
}
