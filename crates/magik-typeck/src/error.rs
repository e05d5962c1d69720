//! Error types for the reasoner and the type database loader.
//!
//! Missing type information is never an error: it degrades to the
//! undefined type. The errors here are the two cases that cannot be
//! papered over, an unreadable type database and a syntax tree that breaks
//! the reasoner's structural assumptions.

use std::fmt;
use std::path::PathBuf;

use magik_common::span::Span;

/// A syntax tree shape the reasoner cannot handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ReasonerError {
    Invariant { message: String, span: Span },
}

impl ReasonerError {
    pub fn invariant(message: impl Into<String>, span: Span) -> Self {
        ReasonerError::Invariant {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ReasonerError::Invariant { span, .. } => *span,
        }
    }
}

impl fmt::Display for ReasonerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonerError::Invariant { message, span } => {
                write!(f, "reasoner invariant violated at {}..{}: {message}", span.start, span.end)
            }
        }
    }
}

impl std::error::Error for ReasonerError {}

/// Failure while loading a type database.
#[derive(Debug)]
pub enum TypeDbError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A line that is not a valid instruction. `line` is 1-based.
    Json {
        line: usize,
        source: serde_json::Error,
    },
}

impl fmt::Display for TypeDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDbError::Io { path, source } => {
                write!(f, "cannot read type database {}: {source}", path.display())
            }
            TypeDbError::Json { line, source } => write!(f, "line {line}: {source}"),
        }
    }
}

impl std::error::Error for TypeDbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TypeDbError::Io { source, .. } => Some(source),
            TypeDbError::Json { source, .. } => Some(source),
        }
    }
}
