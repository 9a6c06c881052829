//! `{{ expression }}` text interpolation

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, trace};
use whisker_core::NodeId;

use crate::directives::in_loop_template;
use crate::error::Result;
use crate::instance::Instance;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{ *(.*?) *\}\}").expect("interpolation pattern is valid"))
}

/// Render every interpolated text node under `scope` outside loop templates.
pub(crate) fn wire_all(instance: &mut Instance, scope: NodeId) -> Result<()> {
    let doc = instance.doc()?;
    let nodes: Vec<NodeId> = doc
        .text_nodes_under(scope)
        .into_iter()
        .filter(|&node| doc.text(node).is_some_and(|text| pattern().is_match(text)))
        .filter(|&node| !in_loop_template(doc, node))
        .collect();
    debug!(nodes = nodes.len(), "wiring interpolations");

    for node in nodes {
        if !instance.templates.contains_key(&node) {
            let text = instance.doc()?.text(node).unwrap_or_default().to_string();
            instance.templates.insert(node, text);
        }
        render(instance, node)?;
    }
    Ok(())
}

/// Re-render one text node from its cached template.
pub(crate) fn render(instance: &mut Instance, node: NodeId) -> Result<()> {
    let Some(template) = instance.templates.get(&node).cloned() else {
        return Ok(());
    };

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for captures in pattern().captures_iter(&template) {
        let (Some(whole), Some(expression)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        let value = instance.eval_in(expression.as_str(), node, Some(node))?;
        out.push_str(&value.to_interpolation());
        last = whole.end();
    }
    out.push_str(&template[last..]);

    trace!(?node, text = %out, "rendered interpolation");
    instance.document_mut()?.set_text(node, out);
    Ok(())
}
