//! `data-ref` element references

use tracing::debug;
use whisker_core::NodeId;

use crate::directives::elements_in;
use crate::error::Result;
use crate::instance::Instance;

/// Collect `data-ref` names under `scope`. A later duplicate name wins.
pub(crate) fn collect(instance: &mut Instance, scope: NodeId) -> Result<()> {
    let doc = instance.doc()?;
    let found: Vec<(String, NodeId)> = elements_in(doc, scope)
        .into_iter()
        .filter_map(|node| doc.attr(node, "data-ref").map(|name| (name.to_string(), node)))
        .collect();
    debug!(refs = found.len(), "collected refs");
    instance.refs.extend(found);
    Ok(())
}
