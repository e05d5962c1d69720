//! Shared types for the Magik tooling: byte spans, line lookup, tokens and
//! lexer errors. Every other crate in the workspace depends on this one.

pub mod error;
pub mod span;
pub mod token;
