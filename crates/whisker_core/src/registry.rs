//! Binding registry
//!
//! Maps each declared top-level field to the ordered set of nodes whose
//! rendering depends on it. The kind of directive to re-run is not stored;
//! it is rediscovered from the node when the field changes.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;

use crate::node::NodeId;

#[derive(Debug, Default, Clone)]
pub struct BindingRegistry {
    bindings: FxHashMap<String, IndexSet<NodeId>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty entry for a declared field.
    pub fn declare(&mut self, field: impl Into<String>) {
        self.bindings.entry(field.into()).or_default();
    }

    pub fn is_declared(&self, field: &str) -> bool {
        self.bindings.contains_key(field)
    }

    /// Record that `node` depends on `field`.
    ///
    /// Only declared fields take registrations. Returns `true` when the node
    /// was not registered under the field before.
    pub fn register(&mut self, field: &str, node: NodeId) -> bool {
        match self.bindings.get_mut(field) {
            Some(nodes) => nodes.insert(node),
            None => false,
        }
    }

    /// Nodes registered under `field`, in registration order.
    pub fn dependents(&self, field: &str) -> Vec<NodeId> {
        self.bindings
            .get(field)
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_registered(&self, field: &str, node: NodeId) -> bool {
        self.bindings
            .get(field)
            .is_some_and(|nodes| nodes.contains(&node))
    }

    /// Drop every registration of `node`. Returns how many were removed.
    pub fn release(&mut self, node: NodeId) -> usize {
        self.bindings
            .values_mut()
            .map(|nodes| nodes.shift_remove(&node))
            .filter(|removed| *removed)
            .count()
    }

    /// Drop all registrations, keeping the declared fields.
    pub fn clear(&mut self) {
        for nodes in self.bindings.values_mut() {
            nodes.clear();
        }
    }

    /// Total number of registrations across all fields.
    pub fn len(&self) -> usize {
        self.bindings.values().map(IndexSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn nodes(n: usize) -> Vec<NodeId> {
        let mut arena: SlotMap<NodeId, ()> = SlotMap::with_key();
        (0..n).map(|_| arena.insert(())).collect()
    }

    #[test]
    fn test_register_only_declared_fields() {
        let ids = nodes(1);
        let mut registry = BindingRegistry::new();
        registry.declare("count");
        assert!(registry.register("count", ids[0]));
        assert!(!registry.register("count", ids[0]));
        assert!(!registry.register("undeclared", ids[0]));
        assert_eq!(registry.dependents("count"), vec![ids[0]]);
        assert!(registry.dependents("undeclared").is_empty());
    }

    #[test]
    fn test_order_is_registration_order() {
        let ids = nodes(3);
        let mut registry = BindingRegistry::new();
        registry.declare("a");
        for id in [ids[2], ids[0], ids[1]] {
            registry.register("a", id);
        }
        assert_eq!(registry.dependents("a"), vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn test_release_removes_node_everywhere() {
        let ids = nodes(2);
        let mut registry = BindingRegistry::new();
        registry.declare("a");
        registry.declare("b");
        registry.register("a", ids[0]);
        registry.register("b", ids[0]);
        registry.register("b", ids[1]);
        assert_eq!(registry.release(ids[0]), 2);
        assert_eq!(registry.dependents("b"), vec![ids[1]]);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_declared("a"));
    }
}
