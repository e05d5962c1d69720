//! Per-run reasoner state.

use magik_parser::ast::NodeId;
use rustc_hash::FxHashMap;

use crate::result::ExpressionResult;
use crate::scope::BindingId;
use crate::ty::Type;

/// Everything one reasoning run learns: the value and loop result of each
/// node, and for every binding the node holding its latest assignment.
///
/// Built from scratch by each run and never shared between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReasonerState {
    node_types: FxHashMap<NodeId, ExpressionResult>,
    loop_types: FxHashMap<NodeId, ExpressionResult>,
    active: FxHashMap<BindingId, NodeId>,
}

impl ReasonerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_result(&self, node: NodeId) -> bool {
        self.node_types.contains_key(&node)
    }

    /// The value result of `node`; undefined if it was never computed.
    pub fn result(&self, node: NodeId) -> ExpressionResult {
        self.node_types
            .get(&node)
            .cloned()
            .unwrap_or(ExpressionResult::Undefined)
    }

    pub fn has_loop_result(&self, node: NodeId) -> bool {
        self.loop_types.contains_key(&node)
    }

    pub fn loop_result(&self, node: NodeId) -> ExpressionResult {
        self.loop_types
            .get(&node)
            .cloned()
            .unwrap_or(ExpressionResult::Undefined)
    }

    pub fn set_result(&mut self, node: NodeId, result: ExpressionResult) {
        self.node_types.insert(node, result);
    }

    /// Union `result` into whatever `node` already holds.
    pub fn add_result(&mut self, node: NodeId, result: ExpressionResult, default: &Type) {
        let combined = match self.node_types.get(&node) {
            Some(existing) => existing.combine(&result, default),
            None => result,
        };
        self.node_types.insert(node, combined);
    }

    pub fn set_loop_result(&mut self, node: NodeId, result: ExpressionResult) {
        self.loop_types.insert(node, result);
    }

    pub fn add_loop_result(&mut self, node: NodeId, result: ExpressionResult, default: &Type) {
        let combined = match self.loop_types.get(&node) {
            Some(existing) => existing.combine(&result, default),
            None => result,
        };
        self.loop_types.insert(node, combined);
    }

    /// The node whose result a read of `binding` sees right now.
    pub fn active_node(&self, binding: BindingId) -> Option<NodeId> {
        self.active.get(&binding).copied()
    }

    pub fn set_active_node(&mut self, binding: BindingId, node: NodeId) {
        self.active.insert(binding, node);
    }

    /// Number of nodes with a value result.
    pub fn len(&self) -> usize {
        self.node_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_types.is_empty()
    }
}
