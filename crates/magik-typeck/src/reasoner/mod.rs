//! Local type reasoner.
//!
//! [`LocalTypeReasoner`] makes one depth-first pass over a syntax tree and
//! records an [`ExpressionResult`] for every expression it visits. Children
//! are handled before their parent and sibling statements in source order,
//! so a binding's latest assignment is always visible to the statements
//! that follow it.
//!
//! The handlers are split by syntactic category:
//!
//! - `atoms`: literals, identifiers, `_self`, `_super`, slots and parameters
//! - `assignment`: variable definitions and (multiple) assignment
//! - `operators`: binary and unary operators
//! - `invocation`: method and procedure calls
//! - `statements`: definitions, bodies, exits and control flow
//! - `narrowing`: type restrictions from `_if`/`_while` guards

mod assignment;
mod atoms;
mod invocation;
mod narrowing;
mod operators;
mod statements;

use magik_common::span::Span;
use magik_parser::ast::{Ast, NodeId, NodeKind};
use magik_parser::error::ParseError;
use rustc_hash::FxHashSet;

use crate::diagnostics::{Note, NoteKind};
use crate::error::ReasonerError;
use crate::instructions::{self, InstructionReader};
use crate::registry::TypeRegistry;
use crate::result::ExpressionResult;
use crate::scope::{BindingId, ScopeTree};
use crate::state::ReasonerState;
use crate::ty::Type;
use crate::type_string::{ResultString, USER_PACKAGE};

use self::narrowing::NarrowingFrames;

// ── Outputs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Method,
    Procedure,
}

/// Inferred results of one method or procedure definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionResult {
    pub node: NodeId,
    /// `exemplar.name` for methods, the procedure name (or `_proc`) for
    /// procedures.
    pub name: String,
    pub kind: DefinitionKind,
    pub result: ExpressionResult,
    pub loop_result: ExpressionResult,
    pub span: Span,
}

/// Everything a finished run produced, detached from the tree and the
/// registry it was computed against.
#[derive(Debug, Clone, Default)]
pub struct Reasoning {
    state: ReasonerState,
    definitions: Vec<DefinitionResult>,
    notes: Vec<Note>,
}

impl Reasoning {
    pub fn has_result(&self, node: NodeId) -> bool {
        self.state.has_result(node)
    }

    pub fn result(&self, node: NodeId) -> ExpressionResult {
        self.state.result(node)
    }

    pub fn loop_result(&self, node: NodeId) -> ExpressionResult {
        self.state.loop_result(node)
    }

    pub fn definitions(&self) -> &[DefinitionResult] {
        &self.definitions
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn state(&self) -> &ReasonerState {
        &self.state
    }
}

// ── Reasoner ───────────────────────────────────────────────────────────

/// The method or procedure currently being walked.
struct Frame {
    node: NodeId,
    /// Exemplar the enclosing method is defined on; undefined at top level.
    owner: Type,
    result: Option<ExpressionResult>,
    loop_result: Option<ExpressionResult>,
}

pub struct LocalTypeReasoner<'a> {
    ast: &'a Ast,
    scopes: &'a ScopeTree,
    registry: &'a dyn TypeRegistry,
    package: String,
    state: ReasonerState,
    frames: Vec<Frame>,
    narrowing: NarrowingFrames,
    definitions: Vec<DefinitionResult>,
    notes: Vec<Note>,
    instructions: InstructionReader<'a>,
    unset: Type,
    /// Top-level statements a reported syntax error belongs to.
    broken: FxHashSet<NodeId>,
}

impl<'a> LocalTypeReasoner<'a> {
    pub fn new(
        ast: &'a Ast,
        source: &'a str,
        scopes: &'a ScopeTree,
        registry: &'a dyn TypeRegistry,
    ) -> Self {
        LocalTypeReasoner {
            ast,
            scopes,
            registry,
            package: USER_PACKAGE.to_string(),
            state: ReasonerState::new(),
            frames: Vec::new(),
            narrowing: NarrowingFrames::default(),
            definitions: Vec::new(),
            notes: Vec::new(),
            instructions: InstructionReader::new(ast, source),
            unset: registry.sw_type(crate::builtins::UNSET),
            broken: FxHashSet::default(),
        }
    }

    /// Package in effect until the first `_package` statement.
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Mark the top-level statements that `errors` were reported in.
    ///
    /// A failed `expect` leaves no `Error` node behind, so the tree alone
    /// cannot tell that an unclosed definition is broken. An error belongs
    /// to the last statement that starts before it; an error carrying an
    /// opener span also belongs to the statement holding the opener.
    pub fn with_syntax_errors(mut self, errors: &[ParseError]) -> Self {
        let ast = self.ast;
        let NodeKind::Module { statements } = ast.kind(ast.root()) else {
            return self;
        };
        let starts: Vec<(u32, NodeId)> = statements
            .iter()
            .map(|&statement| (ast.span(statement).start, statement))
            .collect();
        let owner_before = |offset: u32, inclusive: bool| {
            starts
                .iter()
                .take_while(|(start, _)| *start < offset || (inclusive && *start == offset))
                .last()
                .or(starts.first())
                .map(|&(_, statement)| statement)
        };
        for error in errors {
            self.broken.extend(owner_before(error.span.start, false));
            if let Some((_, opener)) = &error.related {
                self.broken.extend(owner_before(opener.start, true));
            }
        }
        self
    }

    /// Walk the whole tree.
    ///
    /// Top-level statements that contain a syntax error are skipped. A
    /// statement that violates a structural invariant is abandoned and the
    /// walk continues with the next one; the first such error is returned
    /// once every statement has been tried.
    #[tracing::instrument(level = "debug", skip_all, fields(package = %self.package))]
    pub fn run(&mut self) -> Result<(), ReasonerError> {
        let ast = self.ast;
        let root = ast.root();
        let NodeKind::Module { statements } = ast.kind(root) else {
            return Ok(());
        };
        self.narrowing.push(Vec::new());
        let mut first_error = None;
        for &statement in statements {
            if self.broken.contains(&statement) || ast.contains_error(statement) {
                self.skip_statement(statement);
                continue;
            }
            if let Err(error) = self.walk_statement(statement) {
                tracing::warn!("abandoning statement: {error}");
                self.frames.clear();
                self.narrowing.truncate(1);
                first_error.get_or_insert(error);
            }
        }
        self.narrowing.pop();

        tracing::debug!(
            nodes = self.state.len(),
            definitions = self.definitions.len(),
            notes = self.notes.len(),
            "reasoning finished"
        );
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn has_result(&self, node: NodeId) -> bool {
        self.state.has_result(node)
    }

    pub fn result(&self, node: NodeId) -> ExpressionResult {
        self.state.result(node)
    }

    pub fn loop_result(&self, node: NodeId) -> ExpressionResult {
        self.state.loop_result(node)
    }

    pub fn definitions(&self) -> &[DefinitionResult] {
        &self.definitions
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn state(&self) -> &ReasonerState {
        &self.state
    }

    pub fn finish(self) -> Reasoning {
        Reasoning {
            state: self.state,
            definitions: self.definitions,
            notes: self.notes,
        }
    }

    // ── Walk ───────────────────────────────────────────────────────────

    fn skip_statement(&mut self, statement: NodeId) {
        let ast = self.ast;
        let name = match ast.kind(statement) {
            NodeKind::MethodDefinition(def) => format!("{}.{}", def.exemplar, def.name),
            NodeKind::ProcedureDefinition(def) => {
                def.name.clone().unwrap_or_else(|| "_proc".to_string())
            }
            _ => return,
        };
        tracing::debug!(definition = %name, "skipping definition with syntax errors");
        self.notes.push(Note::new(
            NoteKind::SkippedDefinition { name },
            ast.span(statement),
        ));
    }

    /// Walk one statement of a module or body, then apply any instruction
    /// comment attached to it.
    fn walk_statement(&mut self, statement: NodeId) -> Result<(), ReasonerError> {
        self.walk(statement)?;
        self.apply_instructions(statement);
        Ok(())
    }

    fn walk(&mut self, node: NodeId) -> Result<(), ReasonerError> {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::Module { .. } => Err(self.invariant(node, "nested module")),
            NodeKind::Package { name } => {
                self.package = name.clone();
                Ok(())
            }
            NodeKind::MethodDefinition(def) => self.walk_method_definition(node, def),
            NodeKind::ProcedureDefinition(def) => self.walk_procedure_definition(node, def),
            NodeKind::Body { .. } => self.walk_body(node, Vec::new()),
            NodeKind::VariableDefinitionStatement {
                modifier,
                definitions,
            } => self.walk_variable_definitions(node, *modifier, definitions),
            NodeKind::MultipleAssignment { targets, value } => {
                self.walk_multiple_assignment(node, targets, *value)
            }
            NodeKind::Return { value } => self.walk_return(*value),
            NodeKind::Emit { value } => self.walk_emit(node, *value),
            NodeKind::Leave { label, value } => self.walk_leave(node, label.as_deref(), *value),
            NodeKind::Continue { value, .. } => match value {
                Some(value) => self.walk(*value),
                None => Ok(()),
            },
            NodeKind::Loopbody { value } => self.walk_loopbody(*value),
            NodeKind::Assignment { target, op, value } => {
                self.walk_assignment(node, *target, *op, *value)
            }
            NodeKind::Binary { op, left, right } => self.walk_binary(node, *op, *left, *right),
            NodeKind::Unary { op, operand } => self.walk_unary(node, *op, *operand),
            NodeKind::MethodInvocation {
                receiver,
                name,
                arguments,
            } => self.walk_method_invocation(node, *receiver, name, arguments),
            NodeKind::ProcedureInvocation { callee, arguments } => {
                self.walk_procedure_invocation(node, *callee, arguments)
            }
            NodeKind::Identifier { .. } => self.walk_identifier(node),
            NodeKind::Slot { name } => {
                self.walk_slot(node, name);
                Ok(())
            }
            NodeKind::Literal(literal) => {
                self.walk_literal(node, literal);
                Ok(())
            }
            NodeKind::Atom(atom) => {
                self.walk_atom(node, *atom);
                Ok(())
            }
            NodeKind::Super { parent } => {
                self.walk_super(node, parent.as_deref());
                Ok(())
            }
            NodeKind::SimpleVector { elements } => {
                for &element in elements {
                    self.walk(element)?;
                }
                let ty = self.registry.sw_type(crate::builtins::SIMPLE_VECTOR);
                self.state.set_result(node, ExpressionResult::single(ty));
                Ok(())
            }
            NodeKind::GlobalRef { .. } => {
                let ty = self.registry.sw_type(crate::builtins::GLOBAL_VARIABLE);
                self.state.set_result(node, ExpressionResult::single(ty));
                Ok(())
            }
            NodeKind::Tuple { elements } => self.walk_tuple(node, elements),
            NodeKind::Block { body, .. } => self.walk_block(node, *body),
            NodeKind::If {
                clauses,
                else_body,
            } => self.walk_if(node, clauses, *else_body),
            NodeKind::Loop {
                iteration, body, ..
            } => self.walk_loop(node, iteration, *body),
            NodeKind::Try {
                variable,
                body,
                whens,
            } => self.walk_try(node, *variable, *body, whens),
            NodeKind::Parameter { .. }
            | NodeKind::VariableDefinition { .. }
            | NodeKind::IfClause { .. }
            | NodeKind::When { .. } => Err(self.invariant(
                node,
                format!("{} outside its enclosing construct", ast.kind(node).name()),
            )),
            NodeKind::Error => Err(self.invariant(node, "error node in a walked statement")),
        }
    }

    /// Walk the statements of a body inside a fresh narrowing frame seeded
    /// with `restrictions`.
    fn walk_body(
        &mut self,
        body: NodeId,
        restrictions: Vec<(BindingId, Type)>,
    ) -> Result<(), ReasonerError> {
        let ast = self.ast;
        let NodeKind::Body { statements } = ast.kind(body) else {
            return Err(self.invariant(body, "expected a body"));
        };
        self.narrowing.push(restrictions);
        let walked = statements
            .iter()
            .try_for_each(|&statement| self.walk_statement(statement));
        self.narrowing.pop();
        walked
    }

    fn walk_tuple(&mut self, node: NodeId, elements: &[NodeId]) -> Result<(), ReasonerError> {
        for &element in elements {
            self.walk(element)?;
        }
        let result = match elements {
            [single] => self.state.result(*single),
            _ => ExpressionResult::Types(
                elements
                    .iter()
                    .map(|&e| self.state.result(e).nth(0, &self.unset))
                    .collect(),
            ),
        };
        self.state.set_result(node, result);
        Ok(())
    }

    // ── Instructions ───────────────────────────────────────────────────

    fn apply_instructions(&mut self, statement: NodeId) {
        let span = self.ast.span(statement);
        if let Some(text) = self.instructions.instruction(span, instructions::TYPE) {
            let result = self.parse_instruction(&text);
            tracing::trace!(node = %statement, "type instruction: {text}");
            for node in self.instruction_targets(statement) {
                self.state.set_result(node, result.clone());
            }
        }
        if let Some(text) = self.instructions.instruction(span, instructions::ITER_TYPE) {
            let result = self.parse_instruction(&text);
            for node in self.instruction_targets(statement) {
                self.state.set_loop_result(node, result.clone());
            }
        }
    }

    fn parse_instruction(&self, text: &str) -> ExpressionResult {
        self.registry
            .resolve_result(&ResultString::parse(text, &self.package))
    }

    /// The statement itself, plus the identifier it assigns when it
    /// assigns exactly one.
    fn instruction_targets(&mut self, statement: NodeId) -> Vec<NodeId> {
        let ast = self.ast;
        let mut targets = vec![statement];
        let assigned = match ast.kind(statement) {
            NodeKind::Assignment { target, .. } => Some(*target),
            NodeKind::VariableDefinitionStatement { definitions, .. } => match definitions.as_slice()
            {
                [definition] => match ast.kind(*definition) {
                    NodeKind::VariableDefinition { targets, .. } if targets.len() == 1 => {
                        Some(targets[0])
                    }
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        };
        if let Some(target) = assigned {
            if matches!(ast.kind(target), NodeKind::Identifier { .. }) {
                if let Some(binding) = self.scopes.binding_for_node(target) {
                    self.narrowing.invalidate(binding);
                }
                targets.push(target);
            }
        }
        targets
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn invariant(&self, node: NodeId, message: impl Into<String>) -> ReasonerError {
        ReasonerError::invariant(message, self.ast.span(node))
    }

    /// Owner of the innermost definition being walked.
    fn owner(&self) -> Type {
        self.frames
            .last()
            .map(|frame| frame.owner.clone())
            .unwrap_or(Type::Undefined)
    }

    fn in_method(&self) -> bool {
        self.frames.iter().any(|frame| {
            matches!(self.ast.kind(frame.node), NodeKind::MethodDefinition(_))
        })
    }

    fn note(&mut self, kind: NoteKind, span: Span) {
        self.notes.push(Note::new(kind, span));
    }
}
