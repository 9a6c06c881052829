//! Directive handlers
//!
//! Each module wires one directive kind under a scope node at mount (or when
//! loop clones are created) and re-runs it when a bound field changes.

pub mod conditional;
pub mod event;
pub mod interpolate;
pub mod loops;
pub mod model;
pub mod refs;
pub mod value;

use whisker_core::NodeId;
use whisker_dom::Document;

/// Whether `node` sits inside a loop template (the template itself included).
///
/// Templates stay in the document hidden; only their clones are wired.
pub(crate) fn in_loop_template(doc: &Document, node: NodeId) -> bool {
    doc.closest_with_attr(node, "data-loop").is_some()
}

/// `scope` itself when it is an element, followed by its descendant elements.
pub(crate) fn elements_in(doc: &Document, scope: NodeId) -> Vec<NodeId> {
    std::iter::once(scope)
        .chain(doc.descendants(scope))
        .filter(|&node| doc.is_element(node))
        .collect()
}
