//! Event listeners and bubbling routes

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use whisker_core::NodeId;

use crate::tree::Document;

new_key_type! {
    /// Handle returned when a listener is registered.
    pub struct ListenerId;
}

/// A synthetic DOM event in flight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomEvent {
    pub event_type: String,
    pub target: NodeId,
    /// The node whose listeners are currently running.
    pub current_target: NodeId,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

impl DomEvent {
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

#[derive(Clone, Debug)]
struct Listener<H> {
    node: NodeId,
    event_type: String,
    handler: H,
}

/// Listeners keyed by node and event type.
///
/// Handlers are plain data so a route can be computed up front and run by a
/// caller that needs mutable access to its own state.
#[derive(Clone, Debug)]
pub struct EventDispatcher<H> {
    listeners: SlotMap<ListenerId, Listener<H>>,
    by_target: FxHashMap<(NodeId, String), Vec<ListenerId>>,
}

impl<H: Clone> EventDispatcher<H> {
    pub fn new() -> Self {
        Self {
            listeners: SlotMap::with_key(),
            by_target: FxHashMap::default(),
        }
    }

    /// Register a handler for an event type on a node
    pub fn register(&mut self, node: NodeId, event_type: &str, handler: H) -> ListenerId {
        let id = self.listeners.insert(Listener {
            node,
            event_type: event_type.to_string(),
            handler,
        });
        self.by_target
            .entry((node, event_type.to_string()))
            .or_default()
            .push(id);
        id
    }

    /// Remove one listener. Returns its handler if it was registered.
    pub fn remove(&mut self, id: ListenerId) -> Option<H> {
        let listener = self.listeners.remove(id)?;
        let key = (listener.node, listener.event_type);
        if let Some(ids) = self.by_target.get_mut(&key) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.by_target.remove(&key);
            }
        }
        Some(listener.handler)
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(id)
    }

    /// Remove every listener on `node`, returning how many were dropped.
    pub fn remove_node(&mut self, node: NodeId) -> usize {
        let ids: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|(_, listener)| listener.node == node)
            .map(|(id, _)| id)
            .collect();
        for id in &ids {
            self.remove(*id);
        }
        ids.len()
    }

    /// Handlers for `event_type` on `node`, in registration order.
    pub fn handlers(&self, node: NodeId, event_type: &str) -> Vec<(ListenerId, H)> {
        self.by_target
            .get(&(node, event_type.to_string()))
            .map(|ids| {
                ids.iter()
                    .filter_map(|&id| self.listeners.get(id).map(|l| (id, l.handler.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Bubbling route for an event: every node from `target` up to `until`
    /// that has handlers, paired with those handlers.
    pub fn route(
        &self,
        document: &Document,
        event_type: &str,
        target: NodeId,
        until: NodeId,
    ) -> Vec<(NodeId, Vec<(ListenerId, H)>)> {
        document
            .event_path(target, until)
            .into_iter()
            .map(|node| (node, self.handlers(node, event_type)))
            .filter(|(_, handlers)| !handlers.is_empty())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<H: Clone> Default for EventDispatcher<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_route_bubbles_to_limit() {
        let doc = Document::parse("<div><ul><li><b>x</b></li></ul></div>");
        let div = doc.children(doc.root())[0];
        let ul = doc.children(div)[0];
        let li = doc.children(ul)[0];
        let b = doc.children(li)[0];

        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(li, "click", "li");
        dispatcher.register(div, "click", "div");
        dispatcher.register(ul, "input", "ul");

        let route = dispatcher.route(&doc, "click", b, ul);
        assert_eq!(route.len(), 1);
        assert_eq!(route[0].0, li);

        let route = dispatcher.route(&doc, "click", b, doc.root());
        let names: Vec<_> = route.iter().map(|(_, h)| h[0].1).collect();
        assert_eq!(names, vec!["li", "div"]);
    }

    #[test]
    fn test_remove_node_and_listener() {
        let doc = Document::parse("<p></p><p></p>");
        let first = doc.children(doc.root())[0];
        let second = doc.children(doc.root())[1];
        let mut dispatcher = EventDispatcher::new();
        let a = dispatcher.register(first, "click", 1);
        dispatcher.register(first, "input", 2);
        dispatcher.register(second, "click", 3);

        assert_eq!(dispatcher.remove(a), Some(1));
        assert_eq!(dispatcher.remove(a), None);
        assert_eq!(dispatcher.remove_node(first), 1);
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(dispatcher.handlers(second, "click")[0].1, 3);
    }

    #[test]
    fn test_event_flags() {
        let doc = Document::new();
        let mut event = DomEvent::new("submit", doc.root());
        event.prevent_default();
        event.stop_propagation();
        assert!(event.default_prevented && event.propagation_stopped);
    }
}
