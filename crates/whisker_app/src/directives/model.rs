//! `data-model` two-way bindings

use tracing::{debug, trace};
use whisker_core::{NodeId, Value};
use whisker_dom::{Document, DomEvent};

use crate::directives::{elements_in, event::Listener, in_loop_template};
use crate::error::{EngineError, Result};
use crate::instance::Instance;

/// How a control maps onto its bound place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// `text` and `number` inputs and textareas: the value string.
    Text,
    /// A checkbox without `value`: a boolean.
    Checkbox,
    /// A lone checkbox with `value`: the value or `null`.
    CheckboxValue,
    /// One of several checkboxes sharing a model: an array of values.
    CheckboxGroup,
    /// A radio with `value`.
    Radio,
}

impl ModelKind {
    fn event(self) -> &'static str {
        match self {
            ModelKind::Text => "input",
            _ => "change",
        }
    }
}

/// Classify a bound control. Other controls are left alone.
pub fn kind_of(doc: &Document, node: NodeId, root: NodeId) -> Option<ModelKind> {
    let element = doc.element(node)?;
    if element.tag == "textarea" {
        return Some(ModelKind::Text);
    }
    if element.tag != "input" {
        return None;
    }
    match element.input_type().as_str() {
        "text" | "number" => Some(ModelKind::Text),
        "checkbox" if !element.has_attr("value") => Some(ModelKind::Checkbox),
        "checkbox" if group(doc, node, root, "checkbox").len() > 1 => Some(ModelKind::CheckboxGroup),
        "checkbox" => Some(ModelKind::CheckboxValue),
        "radio" if element.has_attr("value") => Some(ModelKind::Radio),
        _ => None,
    }
}

/// Inputs of `input_type` under `root` bound to the same model expression as `node`.
fn group(doc: &Document, node: NodeId, root: NodeId, input_type: &str) -> Vec<NodeId> {
    let Some(model) = doc.attr(node, "data-model") else {
        return Vec::new();
    };
    doc.elements_with_attr(root, "data-model")
        .into_iter()
        .filter(|&other| doc.attr(other, "data-model") == Some(model))
        .filter(|&other| {
            doc.element(other)
                .is_some_and(|element| element.tag == "input" && element.input_type() == input_type)
        })
        .filter(|&other| !in_loop_template(doc, other))
        .collect()
}

/// Wire every `data-model` control under `scope` outside loop templates.
pub(crate) fn wire_all(instance: &mut Instance, scope: NodeId) -> Result<()> {
    let root = instance.root.ok_or(EngineError::NotMounted)?;
    let doc = instance.doc()?;
    let controls: Vec<(NodeId, ModelKind)> = elements_in(doc, scope)
        .into_iter()
        .filter(|&node| doc.has_attr(node, "data-model"))
        .filter(|&node| !in_loop_template(doc, node))
        .filter_map(|node| kind_of(doc, node, root).map(|kind| (node, kind)))
        .collect();
    debug!(models = controls.len(), "wiring models");

    for (node, kind) in controls {
        wire(instance, node, kind)?;
    }
    Ok(())
}

fn wire(instance: &mut Instance, node: NodeId, kind: ModelKind) -> Result<()> {
    let Some(expression) = instance.doc()?.attr(node, "data-model").map(str::to_string) else {
        return Ok(());
    };
    if kind == ModelKind::CheckboxGroup {
        let current = instance.eval_in(&expression, node, Some(node))?;
        if current.as_array().is_none() {
            let place = instance.resolve_place(&expression, node)?;
            instance.write_place(&place, Value::Array(Vec::new()))?;
        }
    }
    apply(instance, node, kind, &expression)?;
    instance
        .listeners
        .register(node, kind.event(), Listener::Model(kind));
    Ok(())
}

/// Re-apply the bound value to a control after an external write.
pub(crate) fn refresh(instance: &mut Instance, node: NodeId) -> Result<()> {
    let root = instance.root.ok_or(EngineError::NotMounted)?;
    let doc = instance.doc()?;
    let Some(kind) = kind_of(doc, node, root) else {
        return Ok(());
    };
    let Some(expression) = doc.attr(node, "data-model").map(str::to_string) else {
        return Ok(());
    };
    apply(instance, node, kind, &expression)
}

fn apply(instance: &mut Instance, node: NodeId, kind: ModelKind, expression: &str) -> Result<()> {
    let bound = instance.eval_in(expression, node, Some(node))?;
    let doc = instance.document_mut()?;
    let own_value = doc.attr(node, "value").unwrap_or_default().to_string();
    match kind {
        ModelKind::Text => {
            let text = if bound.is_nullish() {
                String::new()
            } else {
                bound.to_display_string()
            };
            doc.set_value(node, text);
        }
        ModelKind::Checkbox => doc.set_checked(node, bound.is_truthy()),
        ModelKind::CheckboxValue | ModelKind::CheckboxGroup => {
            let own = Value::from(own_value);
            let checked = match &bound {
                Value::Array(items) => items.iter().any(|item| item.loose_eq(&own)),
                other => other.loose_eq(&own),
            };
            doc.set_checked(node, checked);
        }
        ModelKind::Radio => {
            let checked = !bound.is_nullish() && bound.to_display_string() == own_value;
            doc.set_checked(node, checked);
        }
    }
    trace!(?node, ?kind, "applied model");
    Ok(())
}

/// Write a control's state back after `input` or `change`.
pub(crate) fn write_back(
    instance: &mut Instance,
    node: NodeId,
    kind: ModelKind,
    event: &DomEvent,
) -> Result<()> {
    let root = instance.root.ok_or(EngineError::NotMounted)?;
    let doc = instance.doc()?;
    let Some(expression) = doc.attr(node, "data-model").map(str::to_string) else {
        return Ok(());
    };
    let target = event.target;
    let checked = doc.is_checked(target);
    let typed = doc.value(target);
    let radios = match kind {
        ModelKind::Radio => group(doc, node, root, "radio"),
        _ => Vec::new(),
    };

    let place = instance.resolve_place(&expression, node)?;
    let value = match kind {
        ModelKind::Text => Value::from(typed),
        ModelKind::Checkbox => Value::Bool(checked),
        ModelKind::CheckboxValue | ModelKind::Radio if checked => Value::from(typed),
        ModelKind::CheckboxValue | ModelKind::Radio => Value::Null,
        ModelKind::CheckboxGroup => {
            let own = Value::from(typed);
            let mut items = instance
                .eval_in(&expression, node, None)?
                .as_array()
                .map(<[Value]>::to_vec)
                .unwrap_or_default();
            if checked {
                items.push(own);
            } else {
                items.retain(|item| !item.loose_eq(&own));
            }
            Value::Array(items)
        }
    };
    instance.write_place(&place, value)?;

    if kind == ModelKind::Radio && checked {
        let doc = instance.document_mut()?;
        for other in radios.into_iter().filter(|&other| other != node) {
            doc.set_checked(other, false);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kinds() {
        let doc = Document::parse(
            r#"<input data-model="a"><textarea data-model="b"></textarea><input type="checkbox" data-model="c"><input type="checkbox" value="x" data-model="d"><input type="checkbox" value="x" data-model="e"><input type="checkbox" value="y" data-model="e"><input type="radio" value="r" data-model="f"><input type="range" data-model="g">"#,
        );
        let root = doc.root();
        let kinds: Vec<_> = doc
            .children(root)
            .iter()
            .map(|&node| kind_of(&doc, node, root))
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(ModelKind::Text),
                Some(ModelKind::Text),
                Some(ModelKind::Checkbox),
                Some(ModelKind::CheckboxValue),
                Some(ModelKind::CheckboxGroup),
                Some(ModelKind::CheckboxGroup),
                Some(ModelKind::Radio),
                None,
            ]
        );
    }

    #[test]
    fn test_text_input_round_trip() {
        let mut instance = Instance::new(Options::new().data("name", "Ada")).unwrap();
        instance
            .mount(Document::parse(r#"<input data-model="name"><p>{{ name }}</p>"#))
            .unwrap();
        let input = instance.document().unwrap().children(instance.root().unwrap())[0];
        assert_eq!(instance.document().unwrap().value(input), "Ada");

        instance.input(input, "Grace").unwrap();
        assert_eq!(instance.get("name"), Value::from("Grace"));
        assert!(instance.to_html().contains("<p>Grace</p>"));

        instance.set("name", "Linus").unwrap();
        assert_eq!(instance.document().unwrap().value(input), "Linus");
    }

    #[test]
    fn test_lone_checkbox_with_value() {
        let mut instance = Instance::new(Options::new().data("agree", Value::Null)).unwrap();
        instance
            .mount(Document::parse(
                r#"<input type="checkbox" value="yes" data-model="agree">"#,
            ))
            .unwrap();
        let input = instance.document().unwrap().children(instance.root().unwrap())[0];
        instance.set_checked(input, true).unwrap();
        assert_eq!(instance.get("agree"), Value::from("yes"));
        instance.set_checked(input, false).unwrap();
        assert_eq!(instance.get("agree"), Value::Null);
    }

    #[test]
    fn test_radio_group() {
        let mut instance = Instance::new(Options::new().data("size", "m")).unwrap();
        instance
            .mount(Document::parse(
                r#"<input type="radio" value="s" data-model="size"><input type="radio" value="m" data-model="size">"#,
            ))
            .unwrap();
        let radios = instance.document().unwrap().children(instance.root().unwrap()).to_vec();
        let checked = |instance: &Instance| {
            radios
                .iter()
                .map(|&r| instance.document().unwrap().is_checked(r))
                .collect::<Vec<_>>()
        };
        assert_eq!(checked(&instance), vec![false, true]);

        instance.set_checked(radios[0], true).unwrap();
        assert_eq!(instance.get("size"), Value::from("s"));
        assert_eq!(checked(&instance), vec![true, false]);

        instance.set("size", "m").unwrap();
        assert_eq!(checked(&instance), vec![false, true]);
    }
}
