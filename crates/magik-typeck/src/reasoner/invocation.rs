//! Method and procedure invocation.
//!
//! A call's result is the declared result of every matching signature,
//! with the self-type replaced by the receiver and each `_parameter(name)`
//! placeholder replaced by the type of the corresponding argument. The
//! results of all matches are unioned.

use magik_parser::ast::{NodeId, ParameterModifier};

use crate::builtins;
use crate::diagnostics::NoteKind;
use crate::error::ReasonerError;
use crate::registry::ParameterSignature;
use crate::result::ExpressionResult;
use crate::ty::{ProcedureParameter, Type};

use super::LocalTypeReasoner;

impl LocalTypeReasoner<'_> {
    pub(super) fn walk_method_invocation(
        &mut self,
        node: NodeId,
        receiver: NodeId,
        name: &str,
        arguments: &[NodeId],
    ) -> Result<(), ReasonerError> {
        self.walk(receiver)?;
        for &argument in arguments {
            self.walk(argument)?;
        }
        let receiver_result = self.state.result(receiver);
        let argument_results: Vec<ExpressionResult> =
            arguments.iter().map(|&a| self.state.result(a)).collect();
        let (result, loop_result) =
            self.invoke_method(&receiver_result, name, &argument_results, Some(node));
        self.state.set_result(node, result);
        self.state.set_loop_result(node, loop_result);
        Ok(())
    }

    /// Value and loop result of sending `name` to `receiver`. An unknown
    /// method on a known receiver is noted at `note_at` when given.
    #[tracing::instrument(level = "trace", skip(self, receiver, arguments, note_at))]
    pub(super) fn invoke_method(
        &mut self,
        receiver: &ExpressionResult,
        name: &str,
        arguments: &[ExpressionResult],
        note_at: Option<NodeId>,
    ) -> (ExpressionResult, ExpressionResult) {
        let original = receiver.nth(0, &self.unset);
        let called = original.substitute(&Type::SelfType, &self.owner());
        let registry = self.registry;
        let methods = registry.methods(&called, name);

        if methods.is_empty() {
            if let Some(node) = note_at.filter(|_| called.is_known()) {
                let type_name = called.display(registry);
                self.note(
                    NoteKind::UnknownMethod {
                        type_name,
                        method: name.to_string(),
                    },
                    self.ast.span(node),
                );
            }
            return (ExpressionResult::Undefined, ExpressionResult::Undefined);
        }

        let mut result = ExpressionResult::Undefined;
        let mut loop_result = ExpressionResult::Undefined;
        for method in methods {
            let bind = |declared: ExpressionResult| {
                let declared = if original == Type::SelfType {
                    declared
                } else {
                    declared.substitute(&Type::SelfType, &called)
                };
                self.bind_signature_parameters(declared, method.all_parameters(), arguments)
            };
            let value = bind(registry.resolve_result(&method.result));
            let iterated = bind(registry.resolve_result(&method.loop_result));
            result = result.combine(&value, &self.unset);
            loop_result = loop_result.combine(&iterated, &self.unset);
        }
        tracing::trace!(method = name, "resolved invocation");
        (result, loop_result)
    }

    pub(super) fn walk_procedure_invocation(
        &mut self,
        node: NodeId,
        callee: NodeId,
        arguments: &[NodeId],
    ) -> Result<(), ReasonerError> {
        self.walk(callee)?;
        for &argument in arguments {
            self.walk(argument)?;
        }
        let argument_results: Vec<ExpressionResult> =
            arguments.iter().map(|&a| self.state.result(a)).collect();
        let callee_type = self.state.result(callee).nth(0, &self.unset);

        let mut result = ExpressionResult::Undefined;
        let mut loop_result = ExpressionResult::Undefined;
        for member in callee_type.members() {
            // Inside a procedure `_self` is the procedure itself, typed as
            // the generic `sw:procedure`, which has no invoke signature.
            let Type::Procedure(instance) = member else {
                continue;
            };
            let value = self.bind_procedure_parameters(
                instance.result.clone(),
                &instance.parameters,
                &argument_results,
            );
            let iterated = self.bind_procedure_parameters(
                instance.loop_result.clone(),
                &instance.parameters,
                &argument_results,
            );
            result = result.combine(&value, &self.unset);
            loop_result = loop_result.combine(&iterated, &self.unset);
        }
        self.state.set_result(node, result);
        self.state.set_loop_result(node, loop_result);
        Ok(())
    }

    // ── Parameter placeholders ─────────────────────────────────────────

    fn bind_signature_parameters<'p>(
        &self,
        declared: ExpressionResult,
        parameters: impl Iterator<Item = &'p ParameterSignature>,
        arguments: &[ExpressionResult],
    ) -> ExpressionResult {
        let names = parameters.map(|p| (p.name.as_str(), p.modifier));
        self.bind_parameters(declared, names, arguments)
    }

    fn bind_procedure_parameters(
        &self,
        declared: ExpressionResult,
        parameters: &[ProcedureParameter],
        arguments: &[ExpressionResult],
    ) -> ExpressionResult {
        let names = parameters.iter().map(|p| (p.name.as_str(), p.modifier));
        self.bind_parameters(declared, names, arguments)
    }

    /// Replace `_parameter(name)` placeholders with the argument types.
    /// Missing arguments are unset; a gathered parameter is a vector.
    fn bind_parameters<'n>(
        &self,
        declared: ExpressionResult,
        parameters: impl Iterator<Item = (&'n str, ParameterModifier)>,
        arguments: &[ExpressionResult],
    ) -> ExpressionResult {
        let mut bound = declared;
        for (index, (name, modifier)) in parameters.enumerate() {
            let placeholder = Type::Parameter(name.to_string());
            let actual = match modifier {
                ParameterModifier::Gather => self.registry.sw_type(builtins::SIMPLE_VECTOR),
                _ => arguments
                    .get(index)
                    .map(|a| a.nth(0, &self.unset))
                    .unwrap_or_else(|| self.unset.clone()),
            };
            bound = bound.substitute(&placeholder, &actual);
        }
        bound
    }
}
