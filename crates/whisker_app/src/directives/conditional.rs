//! `data-if` / `data-elseif` / `data-else` chains

use tracing::{debug, trace};
use whisker_core::NodeId;
use whisker_dom::Document;

use crate::directives::{elements_in, in_loop_template, value};
use crate::error::Result;
use crate::instance::Instance;

/// One chain: the `data-if` anchor followed by its alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalChain {
    /// `(element, condition)`; the trailing `data-else` has no condition.
    pub members: Vec<(NodeId, Option<String>)>,
}

impl ConditionalChain {
    /// Walk the element siblings following `anchor`.
    fn discover(doc: &Document, anchor: NodeId) -> Self {
        let mut members = vec![(anchor, doc.attr(anchor, "data-if").map(str::to_string))];
        let mut next = doc.next_element_sibling(anchor);
        while let Some(sibling) = next {
            let condition = doc
                .attr(sibling, "data-elseif")
                .or_else(|| doc.attr(sibling, "data-else-if"));
            if let Some(condition) = condition {
                members.push((sibling, Some(condition.to_string())));
                next = doc.next_element_sibling(sibling);
            } else if doc.has_attr(sibling, "data-else") {
                members.push((sibling, None));
                break;
            } else {
                break;
            }
        }
        Self { members }
    }
}

/// Discover and evaluate every chain under `scope` outside loop templates.
pub(crate) fn wire_all(instance: &mut Instance, scope: NodeId) -> Result<()> {
    let doc = instance.doc()?;
    let anchors: Vec<NodeId> = elements_in(doc, scope)
        .into_iter()
        .filter(|&node| doc.has_attr(node, "data-if"))
        .filter(|&node| !in_loop_template(doc, node))
        .collect();
    debug!(chains = anchors.len(), "wiring conditionals");

    for anchor in anchors {
        if !instance.chains.contains_key(&anchor) {
            let doc = instance.document_mut()?;
            let chain = ConditionalChain::discover(doc, anchor);
            for (member, _) in &chain.members {
                doc.set_hidden(*member, true);
            }
            instance.chains.insert(anchor, chain);
        }
        evaluate(instance, anchor)?;
    }
    Ok(())
}

/// Evaluate every condition in order and show the first truthy member, or
/// the `data-else`, or nothing.
pub(crate) fn evaluate(instance: &mut Instance, anchor: NodeId) -> Result<()> {
    let Some(chain) = instance.chains.get(&anchor).cloned() else {
        return wire_all(instance, anchor);
    };

    // Every condition runs so all of them register against the anchor.
    let mut chosen = None;
    for (member, condition) in &chain.members {
        let truthy = match condition {
            Some(expression) => instance.eval_in(expression, *member, Some(anchor))?.is_truthy(),
            None => true,
        };
        if truthy && chosen.is_none() {
            chosen = Some(*member);
        }
    }

    let doc = instance.document_mut()?;
    for (member, _) in &chain.members {
        doc.set_hidden(*member, Some(*member) != chosen);
    }
    trace!(?anchor, ?chosen, "evaluated conditional chain");

    if let Some(shown) = chosen {
        value::refresh_all(instance, shown)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use pretty_assertions::assert_eq;

    fn visible(instance: &Instance) -> Vec<String> {
        let doc = instance.document().unwrap();
        doc.query_selector_all(doc.root(), "p")
            .unwrap()
            .into_iter()
            .filter(|&p| !doc.is_hidden(p))
            .map(|p| doc.text_content(p))
            .collect()
    }

    #[test]
    fn test_discover_stops_at_unrelated_sibling() {
        let doc = Document::parse(
            r#"<p data-if="a">1</p><p data-else-if="b">2</p><p data-else>3</p><p data-else>4</p>"#,
        );
        let anchor = doc.children(doc.root())[0];
        let chain = ConditionalChain::discover(&doc, anchor);
        assert_eq!(chain.members.len(), 3);
        assert_eq!(chain.members[1].1.as_deref(), Some("b"));
        assert_eq!(chain.members[2].1, None);
    }

    #[test]
    fn test_exactly_one_member_for_every_combination() {
        let html = r#"<p data-if="a">if</p><p data-elseif="b">elseif</p><p data-else>else</p>"#;
        let mut instance = Instance::new(Options::new().data("a", false).data("b", false)).unwrap();
        instance.mount(Document::parse(html)).unwrap();

        for (a, b, expected) in [
            (false, false, "else"),
            (true, false, "if"),
            (true, true, "if"),
            (false, true, "elseif"),
        ] {
            instance.set("a", a).unwrap();
            instance.set("b", b).unwrap();
            assert_eq!(visible(&instance), vec![expected.to_string()]);
        }
    }

    #[test]
    fn test_no_else_shows_nothing() {
        let mut instance = Instance::new(Options::new().data("a", true)).unwrap();
        instance
            .mount(Document::parse(r#"<p data-if="a">x</p><p>after</p>"#))
            .unwrap();
        assert_eq!(visible(&instance), vec!["x", "after"]);
        instance.set("a", false).unwrap();
        assert_eq!(visible(&instance), vec!["after"]);
    }

    #[test]
    fn test_elseif_fields_register_against_anchor() {
        let mut instance = Instance::new(Options::new().data("a", false).data("b", false)).unwrap();
        instance
            .mount(Document::parse(
                r#"<p data-if="a">1</p><p data-elseif="b">2</p>"#,
            ))
            .unwrap();
        let anchor = instance.document().unwrap().children(instance.root().unwrap())[0];
        assert!(instance.registry.is_registered("b", anchor));
    }
}
