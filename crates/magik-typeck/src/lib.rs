//! Magik type reasoner: flow-sensitive local type inference.
//!
//! This crate infers the types of Magik expressions without running them.
//! Given a parsed compilation unit and a registry of known exemplars,
//! methods and procedures, it records for every expression the ordered
//! tuple of types it can produce, and for every method or procedure the
//! results it answers and the values it yields to a loop.
//!
//! - Flow sensitivity: a read of a variable sees its latest assignment
//! - Guard narrowing for `_is _unset`, literal comparisons and kind checks
//! - Multiple return values and iterator loop results
//! - Self-type and parameter-reference substitution at call sites
//!
//! # Architecture
//!
//! - [`type_string`]: Structural type identifiers as written in type databases and comments
//! - [`ty`]: Resolved types (concrete, union, self, parameter reference, procedure)
//! - [`result`]: Multi-value expression results
//! - [`registry`]: The read-only registry trait and the in-memory `TypeKeeper`
//! - [`builtins`]: Built-in `sw` exemplars
//! - [`type_db`]: JSON-lines type database loader
//! - [`scope`]: Lexical scopes and bindings
//! - [`state`]: Per-run node results and active definitions
//! - [`reasoner`]: The tree walk
//! - [`instructions`]: `# type:` override comments
//! - [`diagnostics`]: Notes and their ariadne rendering
//! - [`error`]: Reasoner and loader errors

pub mod builtins;
pub mod diagnostics;
pub mod error;
pub mod instructions;
pub mod reasoner;
pub mod registry;
pub mod result;
pub mod scope;
pub mod state;
pub mod ty;
pub mod type_db;
pub mod type_string;

use magik_parser::ast::Ast;
use magik_parser::error::ParseError;

pub use crate::error::{ReasonerError, TypeDbError};
pub use crate::reasoner::{DefinitionKind, DefinitionResult, LocalTypeReasoner, Reasoning};
pub use crate::registry::{TypeKeeper, TypeRegistry};
pub use crate::result::ExpressionResult;
pub use crate::scope::ScopeTree;
pub use crate::ty::Type;

/// Everything known about one source file after reasoning over it.
pub struct Analysis {
    pub ast: Ast,
    /// Syntax errors. Definitions containing them were skipped.
    pub parse_errors: Vec<ParseError>,
    pub scopes: ScopeTree,
    pub reasoning: Reasoning,
    /// The first structural invariant violation, if any statement hit one.
    pub error: Option<ReasonerError>,
}

/// Parse `source`, build its scopes and reason over it.
///
/// `package` is the package in effect before the first `_package`
/// statement.
pub fn analyze(source: &str, registry: &dyn TypeRegistry, package: &str) -> Analysis {
    let (ast, parse_errors) = magik_parser::parse(source).into_parts();
    let scopes = ScopeTree::build(&ast);
    let mut reasoner = LocalTypeReasoner::new(&ast, source, &scopes, registry)
        .with_package(package)
        .with_syntax_errors(&parse_errors);
    let error = reasoner.run().err();
    let reasoning = reasoner.finish();
    Analysis {
        ast,
        parse_errors,
        scopes,
        reasoning,
        error,
    }
}
