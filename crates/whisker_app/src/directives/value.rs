//! `data-value` one-way bindings on form controls

use tracing::trace;
use whisker_core::NodeId;

use crate::directives::{elements_in, in_loop_template};
use crate::error::Result;
use crate::instance::Instance;

const MEMBER_ATTRS: [&str; 4] = ["data-if", "data-elseif", "data-else-if", "data-else"];

fn is_value_control(tag: &str) -> bool {
    matches!(tag, "input" | "textarea")
}

/// Refresh every `input`/`textarea` carrying `data-value` under `scope`.
pub(crate) fn refresh_all(instance: &mut Instance, scope: NodeId) -> Result<()> {
    let doc = instance.doc()?;
    let nodes: Vec<NodeId> = elements_in(doc, scope)
        .into_iter()
        .filter(|&node| doc.has_attr(node, "data-value"))
        .filter(|&node| doc.tag(node).is_some_and(is_value_control))
        .filter(|&node| !in_loop_template(doc, node))
        .collect();
    for node in nodes {
        refresh(instance, node)?;
    }
    Ok(())
}

/// Assign the value property from the expression, unless a hidden
/// conditional member encloses the element.
pub(crate) fn refresh(instance: &mut Instance, node: NodeId) -> Result<()> {
    let doc = instance.doc()?;
    if in_hidden_member(instance, node)? {
        trace!(?node, "skipping value inside hidden conditional");
        return Ok(());
    }
    let Some(expression) = doc.attr(node, "data-value").map(str::to_string) else {
        return Ok(());
    };
    let value = instance.eval_in(&expression, node, Some(node))?;
    let text = if value.is_nullish() {
        String::new()
    } else {
        value.to_interpolation()
    };
    instance.document_mut()?.set_value(node, text);
    Ok(())
}

fn in_hidden_member(instance: &Instance, node: NodeId) -> Result<bool> {
    let doc = instance.doc()?;
    Ok(std::iter::once(node)
        .chain(doc.ancestors(node))
        .any(|ancestor| {
            doc.is_hidden(ancestor) && MEMBER_ATTRS.iter().any(|attr| doc.has_attr(ancestor, attr))
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use whisker_dom::Document;

    #[test]
    fn test_value_follows_field_but_not_while_hidden() {
        let mut instance = Instance::new(Options::new().data("show", true).data("name", "a")).unwrap();
        instance
            .mount(Document::parse(
                r#"<div data-if="show"><input data-value="name"></div>"#,
            ))
            .unwrap();
        let input = instance
            .document()
            .unwrap()
            .query_selector(instance.root().unwrap(), "input")
            .unwrap()
            .unwrap();
        assert_eq!(instance.document().unwrap().value(input), "a");

        instance.set("show", false).unwrap();
        instance.set("name", "b").unwrap();
        assert_eq!(instance.document().unwrap().value(input), "a");

        instance.set("show", true).unwrap();
        assert_eq!(instance.document().unwrap().value(input), "b");
    }

    #[test]
    fn test_containers_are_written_as_json() {
        let mut instance = Instance::new(
            Options::new().data_json(serde_json::json!({ "tags": [1, 2], "user": { "n": "a" } })),
        )
        .unwrap();
        instance
            .mount(Document::parse(
                r#"<input data-value="tags"><textarea data-value="user"></textarea>"#,
            ))
            .unwrap();
        let doc = instance.document().unwrap();
        let controls = doc.children(doc.root()).to_vec();
        assert_eq!(doc.value(controls[0]), "[1,2]");
        assert_eq!(doc.value(controls[1]), r#"{"n":"a"}"#);
    }
}
