//! Variable definitions and assignments.

use magik_parser::ast::{AssignOp, DefinitionModifier, NodeId, NodeKind};

use crate::error::ReasonerError;
use crate::result::ExpressionResult;
use crate::scope::{BindingId, BindingKind};

use super::LocalTypeReasoner;

impl LocalTypeReasoner<'_> {
    pub(super) fn walk_variable_definitions(
        &mut self,
        node: NodeId,
        modifier: DefinitionModifier,
        definitions: &[NodeId],
    ) -> Result<(), ReasonerError> {
        let ast = self.ast;
        let mut last = ExpressionResult::empty();
        for &definition in definitions {
            let NodeKind::VariableDefinition {
                targets,
                value,
                multi,
            } = ast.kind(definition)
            else {
                return Err(self.invariant(definition, "expected a variable definition"));
            };
            let result = match value {
                Some(value) => {
                    self.walk(*value)?;
                    self.state.result(*value)
                }
                None => ExpressionResult::single(self.unset.clone()),
            };
            for (index, &target) in targets.iter().enumerate() {
                let target_result = if *multi {
                    ExpressionResult::single(result.nth(index, &self.unset))
                } else {
                    result.clone()
                };
                self.define(modifier, target, target_result)?;
            }
            last = result;
        }
        self.state.set_result(node, last);
        Ok(())
    }

    /// Record the value a `_local`, `_constant`, `_global`, `_dynamic` or
    /// `_import` target starts out with.
    fn define(
        &mut self,
        modifier: DefinitionModifier,
        target: NodeId,
        result: ExpressionResult,
    ) -> Result<(), ReasonerError> {
        let Some(binding) = self.scopes.binding_for_node(target) else {
            return Err(self.invariant(target, "definition target without a binding"));
        };
        match modifier {
            DefinitionModifier::Local | DefinitionModifier::Constant => {
                self.bind(binding, target, result);
            }
            DefinitionModifier::Import => {
                let imported = self.binding_result(binding);
                self.state.set_result(target, imported);
                self.state.set_active_node(binding, target);
                self.narrowing.invalidate(binding);
            }
            DefinitionModifier::Global | DefinitionModifier::Dynamic => {
                self.state.set_result(target, result);
            }
        }
        Ok(())
    }

    /// Make `target` the node a later read of `binding` sees.
    fn bind(&mut self, binding: BindingId, target: NodeId, result: ExpressionResult) {
        self.state.set_result(target, result);
        self.state.set_active_node(binding, target);
        self.narrowing.invalidate(binding);
    }

    pub(super) fn walk_assignment(
        &mut self,
        node: NodeId,
        target: NodeId,
        op: AssignOp,
        value: NodeId,
    ) -> Result<(), ReasonerError> {
        self.walk(value)?;
        let mut result = self.state.result(value);
        if let AssignOp::Augmented(binary) = op {
            self.walk(target)?;
            let left = self.state.result(target).nth(0, &self.unset);
            let right = result.nth(0, &self.unset);
            result = ExpressionResult::single(self.binary_result(binary, &left, &right));
        }
        let result = self.assign(target, op, result)?;
        self.state.set_result(node, result);
        Ok(())
    }

    /// Store `result` on an assignment target. Answers the assignment's own
    /// value, which differs from `result` only for setter calls.
    fn assign(
        &mut self,
        target: NodeId,
        op: AssignOp,
        result: ExpressionResult,
    ) -> Result<ExpressionResult, ReasonerError> {
        let ast = self.ast;
        match ast.kind(target) {
            NodeKind::Identifier { .. } => {
                let Some(binding) = self.scopes.binding_for_node(target) else {
                    return Err(self.invariant(target, "assignment target without a binding"));
                };
                match self.scopes.binding(binding).kind {
                    BindingKind::Global | BindingKind::Dynamic => {
                        self.state.set_result(target, result.clone());
                    }
                    _ => self.bind(binding, target, result.clone()),
                }
                Ok(result)
            }
            NodeKind::Slot { .. } => {
                self.state.set_result(target, result.clone());
                Ok(result)
            }
            NodeKind::MethodInvocation {
                receiver,
                name,
                arguments,
            } => {
                // An augmented assignment has already read the target.
                if !self.state.has_result(*receiver) {
                    self.walk(*receiver)?;
                    for &argument in arguments {
                        self.walk(argument)?;
                    }
                }
                let setter = match op {
                    AssignOp::BootAssign => format!("{name}^<<"),
                    _ => format!("{name}<<"),
                };
                let mut argument_results: Vec<ExpressionResult> =
                    arguments.iter().map(|&a| self.state.result(a)).collect();
                argument_results.push(result);
                let receiver_result = self.state.result(*receiver);
                let (value, _) = self.invoke_method(
                    &receiver_result,
                    &setter,
                    &argument_results,
                    Some(target),
                );
                self.state.set_result(target, value.clone());
                Ok(value)
            }
            NodeKind::Tuple { elements } if elements.len() == 1 => {
                let value = self.assign(elements[0], op, result)?;
                self.state.set_result(target, value.clone());
                Ok(value)
            }
            other => Err(self.invariant(
                target,
                format!("cannot assign to {}", other.name()),
            )),
        }
    }

    pub(super) fn walk_multiple_assignment(
        &mut self,
        node: NodeId,
        targets: &[NodeId],
        value: NodeId,
    ) -> Result<(), ReasonerError> {
        self.walk(value)?;
        let result = self.state.result(value);
        for (index, &target) in targets.iter().enumerate() {
            let position = ExpressionResult::single(result.nth(index, &self.unset));
            self.assign(target, AssignOp::Assign, position)?;
        }
        self.state.set_result(node, result);
        Ok(())
    }
}
