//! Definitions, exits and control flow.
//!
//! Returns and `_loopbody` feed the innermost definition frame. `>>` and
//! `_leave` feed the construct they leave: a block, an `_if`, a loop or a
//! `_try`. A construct body that does not end on such an exit falls
//! through, which unions `sw:unset` into the construct's result.

use std::rc::Rc;

use magik_parser::ast::{Iteration, MethodDefinition, NodeId, NodeKind, ProcedureDefinition};
use rustc_hash::FxHashMap;

use crate::builtins;
use crate::error::ReasonerError;
use crate::result::ExpressionResult;
use crate::scope::BindingId;
use crate::ty::{ProcedureInstance, ProcedureParameter, Type};
use crate::type_string::TypeString;

use super::narrowing::{self, Narrowing};
use super::{DefinitionKind, DefinitionResult, Frame, LocalTypeReasoner};

impl LocalTypeReasoner<'_> {
    // ── Definitions ────────────────────────────────────────────────────

    pub(super) fn walk_method_definition(
        &mut self,
        node: NodeId,
        def: &MethodDefinition,
    ) -> Result<(), ReasonerError> {
        let owner = self
            .registry
            .resolve(&TypeString::parse(&def.exemplar, &self.package));
        tracing::debug!(exemplar = %def.exemplar, method = %def.name, "walking method");

        self.frames.push(Frame {
            node,
            owner,
            result: None,
            loop_result: None,
        });
        for &parameter in def.parameters.iter().chain(def.assignment_parameter.iter()) {
            self.walk_parameter(parameter, &def.doc);
        }
        self.walk_body(def.body, Vec::new())?;
        let (result, loop_result) = self.pop_frame(node)?;

        self.state.set_result(node, result.clone());
        self.state.set_loop_result(node, loop_result.clone());
        self.definitions.push(DefinitionResult {
            node,
            name: format!("{}.{}", def.exemplar, def.name),
            kind: DefinitionKind::Method,
            result,
            loop_result,
            span: self.ast.span(node),
        });
        Ok(())
    }

    pub(super) fn walk_procedure_definition(
        &mut self,
        node: NodeId,
        def: &ProcedureDefinition,
    ) -> Result<(), ReasonerError> {
        let ast = self.ast;
        self.frames.push(Frame {
            node,
            owner: self.owner(),
            result: None,
            loop_result: None,
        });
        let mut parameters = Vec::with_capacity(def.parameters.len());
        for &parameter in &def.parameters {
            let ty = self.walk_parameter(parameter, &def.doc);
            if let NodeKind::Parameter { name, modifier } = ast.kind(parameter) {
                parameters.push(ProcedureParameter {
                    name: name.clone(),
                    modifier: *modifier,
                    ty,
                });
            }
        }
        self.walk_body(def.body, Vec::new())?;
        let (result, loop_result) = self.pop_frame(node)?;

        let instance = ProcedureInstance {
            name: def.name.clone(),
            parameters,
            result: result.clone(),
            loop_result: loop_result.clone(),
            definition: Some(node),
        };
        self.state.set_result(
            node,
            ExpressionResult::single(Type::Procedure(Rc::new(instance))),
        );
        self.state.set_loop_result(node, loop_result.clone());
        self.definitions.push(DefinitionResult {
            node,
            name: def.name.clone().unwrap_or_else(|| "_proc".to_string()),
            kind: DefinitionKind::Procedure,
            result,
            loop_result,
            span: ast.span(node),
        });
        Ok(())
    }

    /// Close the frame of `node`. A definition that never returned
    /// produces no values.
    fn pop_frame(
        &mut self,
        node: NodeId,
    ) -> Result<(ExpressionResult, ExpressionResult), ReasonerError> {
        match self.frames.pop() {
            Some(frame) if frame.node == node => Ok((
                frame.result.unwrap_or_else(ExpressionResult::empty),
                frame.loop_result.unwrap_or_else(ExpressionResult::empty),
            )),
            _ => Err(self.invariant(node, "definition frame out of step")),
        }
    }

    // ── Exits ──────────────────────────────────────────────────────────

    pub(super) fn walk_return(&mut self, value: Option<NodeId>) -> Result<(), ReasonerError> {
        let result = self.exit_value(value)?;
        let unset = self.unset.clone();
        if let Some(frame) = self.frames.last_mut() {
            frame.result = Some(match frame.result.take() {
                Some(existing) => existing.combine(&result, &unset),
                None => result,
            });
        }
        Ok(())
    }

    pub(super) fn walk_loopbody(&mut self, value: NodeId) -> Result<(), ReasonerError> {
        let result = self.exit_value(Some(value))?;
        let unset = self.unset.clone();
        if let Some(frame) = self.frames.last_mut() {
            frame.loop_result = Some(match frame.loop_result.take() {
                Some(existing) => existing.combine(&result, &unset),
                None => result,
            });
        }
        Ok(())
    }

    /// `>> values` answers from the nearest enclosing block, `_if`, loop or
    /// `_try`, or from the definition when there is none.
    pub(super) fn walk_emit(&mut self, node: NodeId, value: NodeId) -> Result<(), ReasonerError> {
        let ast = self.ast;
        let result = self.exit_value(Some(value))?;
        let target = ast.first_ancestor(node, |kind| {
            matches!(
                kind,
                NodeKind::Block { .. }
                    | NodeKind::If { .. }
                    | NodeKind::Loop { .. }
                    | NodeKind::Try { .. }
                    | NodeKind::MethodDefinition(_)
                    | NodeKind::ProcedureDefinition(_)
            )
        });
        match target {
            Some(target) if ast.kind(target).is_definition() => {
                let unset = self.unset.clone();
                if let Some(frame) = self.frames.last_mut().filter(|f| f.node == target) {
                    frame.result = Some(match frame.result.take() {
                        Some(existing) => existing.combine(&result, &unset),
                        None => result,
                    });
                }
            }
            Some(target) => self.state.add_result(target, result, &self.unset),
            None => {}
        }
        Ok(())
    }

    /// `_leave [@label] [_with values]` answers from the labelled loop or
    /// block, else from the innermost loop, else the innermost block.
    pub(super) fn walk_leave(
        &mut self,
        node: NodeId,
        label: Option<&str>,
        value: Option<NodeId>,
    ) -> Result<(), ReasonerError> {
        let ast = self.ast;
        let result = self.exit_value(value)?;
        let enclosing: Vec<NodeId> = ast
            .ancestors(node)
            .take_while(|&a| !ast.kind(a).is_definition())
            .filter(|&a| matches!(ast.kind(a), NodeKind::Loop { .. } | NodeKind::Block { .. }))
            .collect();
        let target = match label {
            Some(label) => enclosing.iter().copied().find(|&a| match ast.kind(a) {
                NodeKind::Loop { label: l, .. } | NodeKind::Block { label: l, .. } => {
                    l.as_deref() == Some(label)
                }
                _ => false,
            }),
            None => enclosing
                .iter()
                .copied()
                .find(|&a| matches!(ast.kind(a), NodeKind::Loop { .. }))
                .or_else(|| enclosing.first().copied()),
        };
        if let Some(target) = target {
            self.state.add_result(target, result, &self.unset);
        }
        Ok(())
    }

    fn exit_value(&mut self, value: Option<NodeId>) -> Result<ExpressionResult, ReasonerError> {
        match value {
            Some(value) => {
                self.walk(value)?;
                Ok(self.state.result(value))
            }
            None => Ok(ExpressionResult::empty()),
        }
    }

    /// Union the fall-through of `body` into `construct`, unless the body
    /// ends on an exit of its own.
    fn finish_body(&mut self, construct: NodeId, body: NodeId) {
        let ast = self.ast;
        let exits = match ast.kind(body) {
            NodeKind::Body { statements } => statements.iter().any(|&s| {
                matches!(
                    ast.kind(s),
                    NodeKind::Return { .. } | NodeKind::Emit { .. } | NodeKind::Leave { .. }
                )
            }),
            _ => false,
        };
        if !exits {
            self.state
                .add_result(construct, ExpressionResult::empty(), &self.unset);
        }
    }

    /// A construct every path of which left early still has a result.
    fn settle(&mut self, construct: NodeId) {
        if !self.state.has_result(construct) {
            self.state.set_result(construct, ExpressionResult::empty());
        }
    }

    // ── Control flow ───────────────────────────────────────────────────

    pub(super) fn walk_block(&mut self, node: NodeId, body: NodeId) -> Result<(), ReasonerError> {
        self.walk_body(body, Vec::new())?;
        self.finish_body(node, body);
        self.settle(node);
        Ok(())
    }

    pub(super) fn walk_if(
        &mut self,
        node: NodeId,
        clauses: &[NodeId],
        else_body: Option<NodeId>,
    ) -> Result<(), ReasonerError> {
        let ast = self.ast;
        // Every guard walked so far failed.
        let mut failed = Narrowing::default();
        let mut falling_through = Vec::new();
        let mut guarded: FxHashMap<BindingId, Option<NodeId>> = FxHashMap::default();
        let mut any_exit = false;
        for &clause in clauses {
            let NodeKind::IfClause { condition, body } = ast.kind(clause) else {
                return Err(self.invariant(clause, "expected an if clause"));
            };
            self.walk(*condition)?;
            let restrictions = self.restrictions(*condition);
            for r in &restrictions {
                guarded
                    .entry(r.binding)
                    .or_insert_with(|| self.state.active_node(r.binding));
            }
            let inside = narrowing::holding(&restrictions);
            self.walk_body(*body, narrowing::frame(inside.clone()))?;
            self.finish_body(node, *body);

            if self.body_exits(*body) {
                any_exit = true;
            } else {
                let mut branch = failed.clone();
                for (binding, ty) in inside {
                    narrowing::restrict(&mut branch, binding, ty);
                }
                falling_through.push(branch);
            }
            for r in &restrictions {
                narrowing::restrict(&mut failed, r.binding, r.not().narrowed());
            }
        }
        match else_body {
            Some(else_body) => {
                self.walk_body(else_body, narrowing::frame(failed.clone()))?;
                self.finish_body(node, else_body);
                if self.body_exits(else_body) {
                    any_exit = true;
                } else {
                    falling_through.push(failed);
                }
            }
            None => falling_through.push(failed),
        }
        self.settle(node);
        if any_exit {
            self.narrow_upper_body(node, &falling_through, &guarded);
        }
        Ok(())
    }

    pub(super) fn walk_loop(
        &mut self,
        node: NodeId,
        iteration: &Iteration,
        body: NodeId,
    ) -> Result<(), ReasonerError> {
        let ast = self.ast;
        match iteration {
            Iteration::Plain => self.walk_body(body, Vec::new())?,
            Iteration::While { condition } => {
                self.walk(*condition)?;
                let restrictions = self.restrictions(*condition);
                self.walk_body(body, narrowing::frame(narrowing::holding(&restrictions)))?;
            }
            Iteration::Over {
                variables,
                iterable,
            } => {
                self.walk(*iterable)?;
                let produced = self.state.loop_result(*iterable);
                for (index, &variable) in variables.iter().enumerate() {
                    if !matches!(ast.kind(variable), NodeKind::Identifier { .. }) {
                        return Err(self.invariant(variable, "loop variable is not an identifier"));
                    }
                    let ty = produced.nth(index, &self.unset);
                    self.state
                        .set_result(variable, ExpressionResult::single(ty));
                    if let Some(binding) = self.scopes.binding_for_node(variable) {
                        self.state.set_active_node(binding, variable);
                        self.narrowing.invalidate(binding);
                    }
                }
                self.walk_body(body, Vec::new())?;
            }
        }
        // A loop only answers through `_leave`.
        self.settle(node);
        Ok(())
    }

    pub(super) fn walk_try(
        &mut self,
        node: NodeId,
        variable: Option<NodeId>,
        body: NodeId,
        whens: &[NodeId],
    ) -> Result<(), ReasonerError> {
        let ast = self.ast;
        self.walk_body(body, Vec::new())?;
        self.finish_body(node, body);

        let condition = ExpressionResult::single(self.registry.sw_type(builtins::CONDITION));
        if let Some(variable) = variable {
            self.state.set_result(variable, condition);
        }
        for &when in whens {
            let NodeKind::When { body, .. } = ast.kind(when) else {
                return Err(self.invariant(when, "expected a when clause"));
            };
            if let Some(variable) = variable {
                if let NodeKind::Identifier { name } = ast.kind(variable) {
                    let scope = self.scopes.scope_for_node(ast, *body);
                    if let Some(binding) = self.scopes.resolve(scope, name) {
                        self.state.set_active_node(binding, variable);
                        self.narrowing.invalidate(binding);
                    }
                }
            }
            self.walk_body(*body, Vec::new())?;
            self.finish_body(node, *body);
        }
        self.settle(node);
        Ok(())
    }
}
