//! Binary and unary operators.

use magik_parser::ast::{BinaryOp, NodeId, UnaryOp};

use crate::builtins;
use crate::error::ReasonerError;
use crate::result::ExpressionResult;
use crate::ty::Type;

use super::LocalTypeReasoner;

impl LocalTypeReasoner<'_> {
    pub(super) fn walk_binary(
        &mut self,
        node: NodeId,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    ) -> Result<(), ReasonerError> {
        self.walk(left)?;
        self.walk(right)?;
        let l = self.state.result(left).nth(0, &self.unset);
        let r = self.state.result(right).nth(0, &self.unset);
        let ty = self.binary_result(op, &l, &r);
        self.state.set_result(node, ExpressionResult::single(ty));
        Ok(())
    }

    /// Result type of `left op right`.
    pub(super) fn binary_result(&self, op: BinaryOp, left: &Type, right: &Type) -> Type {
        let boolean = self.registry.sw_type(builtins::FALSE);
        match op {
            BinaryOp::Is | BinaryOp::Isnt => boolean,
            // `a _andif b` answers false or whatever `b` answers.
            BinaryOp::Andif | BinaryOp::Orif => boolean.combine(right),
            _ => self.registry.binary_operator_type(op.as_str(), left, right),
        }
    }

    pub(super) fn walk_unary(
        &mut self,
        node: NodeId,
        op: UnaryOp,
        operand: NodeId,
    ) -> Result<(), ReasonerError> {
        self.walk(operand)?;
        let method = match op {
            UnaryOp::AllResults => {
                let ty = self.registry.sw_type(builtins::SIMPLE_VECTOR);
                self.state.set_result(node, ExpressionResult::single(ty));
                return Ok(());
            }
            UnaryOp::Not | UnaryOp::Tilde => "not",
            UnaryOp::Negate => "negated",
            UnaryOp::Plus => "unary_plus",
            UnaryOp::Scatter => "for_scatter()",
        };
        let operand_type = self.state.result(operand).nth(0, &self.unset);
        let receiver = ExpressionResult::single(operand_type.clone());
        let (result, _) = self.invoke_method(&receiver, method, &[], None);
        let result = result.substitute(&Type::SelfType, &operand_type);
        self.state.set_result(node, result);
        Ok(())
    }
}
