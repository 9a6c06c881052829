//! `data-loop` list rendering
//!
//! The element carrying `data-loop` stays in the document as a hidden
//! template. Each materialization throws away the previous clones and stamps
//! out one clone per collection entry right after the template, attaching a
//! [`LoopItemScope`] to every clone root.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};
use whisker_core::{evaluate_with_place, DataPath, NodeId, PathKey, Place, Value};

use crate::directives::{conditional, elements_in, event, interpolate, model, value};
use crate::error::{EngineError, Result};
use crate::instance::Instance;
use crate::scope::{Env, LoopItemScope};

/// A parsed `item in collection` or `(item, index) in collection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSpec {
    pub item: String,
    pub index: Option<String>,
    pub collection: String,
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(.*?)\s+in\s+(.*?)\s*$").expect("loop pattern is valid"))
}

pub fn parse_loop(source: &str) -> Result<LoopSpec> {
    let syntax_error = || EngineError::LoopSyntax(source.to_string());
    let captures = pattern().captures(source).ok_or_else(syntax_error)?;
    let (Some(head), Some(collection)) = (captures.get(1), captures.get(2)) else {
        return Err(syntax_error());
    };
    let head = head.as_str().trim();
    let collection = collection.as_str().to_string();

    let (item, index) = match head.strip_prefix('(').and_then(|h| h.strip_suffix(')')) {
        Some(pair) => {
            let mut names = pair.split(',').map(str::trim);
            let item = names.next().unwrap_or_default().to_string();
            let index = names.next().map(str::to_string);
            if names.next().is_some() || index.as_deref() == Some("") {
                return Err(syntax_error());
            }
            (item, index)
        }
        None => (head.to_string(), None),
    };
    let is_name = |name: &str| {
        name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
            && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    };
    if !is_name(&item) || !index.as_deref().map_or(true, is_name) || collection.is_empty() {
        return Err(syntax_error());
    }
    Ok(LoopSpec {
        item,
        index,
        collection,
    })
}

/// One rendered clone.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopItem {
    pub root: NodeId,
    pub entry: Value,
}

/// The clones currently rendered for one anchor, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopRecord {
    pub items: Vec<LoopItem>,
}

/// Materialize every outermost loop under `scope`.
pub(crate) fn wire_all(instance: &mut Instance, scope: NodeId) -> Result<()> {
    for anchor in outermost_anchors(instance, scope)? {
        materialize(instance, anchor)?;
    }
    Ok(())
}

/// Anchors under `scope` that are not inside another loop template.
fn outermost_anchors(instance: &Instance, scope: NodeId) -> Result<Vec<NodeId>> {
    let doc = instance.doc()?;
    Ok(elements_in(doc, scope)
        .into_iter()
        .filter(|&node| doc.has_attr(node, "data-loop"))
        .filter(|&node| {
            doc.parent(node)
                .map_or(true, |parent| doc.closest_with_attr(parent, "data-loop").is_none())
        })
        .collect())
}

/// Re-render a loop after its collection changed and wire the new clones.
pub(crate) fn rematerialize(instance: &mut Instance, anchor: NodeId) -> Result<()> {
    for clone in materialize(instance, anchor)? {
        interpolate::wire_all(instance, clone)?;
        conditional::wire_all(instance, clone)?;
        event::wire_all(instance, clone)?;
        value::refresh_all(instance, clone)?;
        model::wire_all(instance, clone)?;
        crate::component::connect_all(instance, clone)?;
    }
    Ok(())
}

/// Replace the clones of `anchor`, returning the new clone roots.
fn materialize(instance: &mut Instance, anchor: NodeId) -> Result<Vec<NodeId>> {
    let Some(source) = instance.doc()?.attr(anchor, "data-loop").map(str::to_string) else {
        return Ok(Vec::new());
    };
    let spec = parse_loop(&source)?;

    if let Some(previous) = instance.loops.remove(&anchor) {
        for item in previous.items {
            let removed = instance.document_mut()?.remove(item.root);
            instance.dispose_nodes(&removed);
        }
    }
    instance.document_mut()?.set_hidden(anchor, false);

    let entries = entries(instance, anchor, &spec)?;
    let mut items = Vec::with_capacity(entries.len());
    let mut previous = anchor;
    for (position, (entry, place)) in entries.into_iter().enumerate() {
        let doc = instance.document_mut()?;
        let Some(clone) = doc.clone_subtree(anchor) else {
            continue;
        };
        doc.remove_attr(clone, "data-loop");
        doc.set_hidden(clone, false);
        doc.insert_after(previous, clone)?;
        previous = clone;

        instance.scopes.insert(
            clone,
            LoopItemScope {
                item: spec.item.clone(),
                place,
                index: spec.index.clone(),
                position,
            },
        );
        items.push(LoopItem { root: clone, entry });
    }
    instance.document_mut()?.set_hidden(anchor, true);
    debug!(loop = %source, clones = items.len(), "materialized loop");

    let clones: Vec<NodeId> = items.iter().map(|item| item.root).collect();
    instance.loops.insert(anchor, LoopRecord { items });

    for &clone in &clones {
        wire_all(instance, clone)?;
    }
    Ok(clones)
}

/// Collection entries paired with the place each item is read from.
fn entries(instance: &mut Instance, anchor: NodeId, spec: &LoopSpec) -> Result<Vec<(Value, Place)>> {
    if let Ok(count) = spec.collection.parse::<usize>() {
        return Ok((1..=count)
            .map(|n| (Value::from(n), Place::Detached(Value::from(n), DataPath::new())))
            .collect());
    }

    let program = instance.compile(&spec.collection, anchor, Some(anchor))?;
    let (collection, place) = evaluate_with_place(&program, &mut Env::new(instance, anchor, None))?;
    let Value::Array(values) = collection else {
        warn!(collection = %spec.collection, "loop collection is not an array");
        return Ok(Vec::new());
    };
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let item_place = match &place {
                Some(place) => place.child(PathKey::Index(i)),
                None => Place::Detached(entry.clone(), DataPath::new()),
            };
            (entry, item_place)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use whisker_dom::Document;

    fn spec(item: &str, index: Option<&str>, collection: &str) -> LoopSpec {
        LoopSpec {
            item: item.to_string(),
            index: index.map(str::to_string),
            collection: collection.to_string(),
        }
    }

    #[test]
    fn test_parse_loop() {
        assert_eq!(parse_loop("todo in todos").unwrap(), spec("todo", None, "todos"));
        assert_eq!(
            parse_loop(" (row, i) in table.rows ").unwrap(),
            spec("row", Some("i"), "table.rows")
        );
        assert_eq!(parse_loop("n in 3").unwrap(), spec("n", None, "3"));
        assert!(matches!(parse_loop("todos"), Err(EngineError::LoopSyntax(_))));
        assert!(parse_loop("(a, b, c) in xs").is_err());
        assert!(parse_loop("a.b in xs").is_err());
    }

    #[test]
    fn test_numeric_range() {
        let mut instance = Instance::new(Options::new()).unwrap();
        instance
            .mount(Document::parse(r#"<ul><li data-loop="(n, i) in 3">{{ n }}:{{ i }}</li></ul>"#))
            .unwrap();
        assert_eq!(
            instance.to_html(),
            r#"<ul><li data-loop="(n, i) in 3" hidden>{{ n }}:{{ i }}</li><li>1:0</li><li>2:1</li><li>3:2</li></ul>"#
        );
    }

    #[test]
    fn test_item_writes_reach_the_store() {
        let mut instance = Instance::new(
            Options::new().data_json(json!({ "todos": [{ "done": false }, { "done": false }] })),
        )
        .unwrap();
        instance
            .mount(Document::parse(
                r#"<p data-loop="todo in todos"><button data-on-click="todo.done = true">x</button></p>"#,
            ))
            .unwrap();
        let doc = instance.document().unwrap();
        let buttons = doc.query_selector_all(doc.root(), "p > button").unwrap();
        assert_eq!(buttons.len(), 3);

        // buttons[0] belongs to the hidden template.
        instance.click(buttons[2]).unwrap();
        assert_eq!(instance.get("todos.1.done"), Value::Bool(true));
        assert_eq!(instance.get("todos.0.done"), Value::Bool(false));
    }

    #[test]
    fn test_non_array_renders_nothing() {
        let mut instance = Instance::new(Options::new().data("items", 5)).unwrap();
        instance
            .mount(Document::parse(r#"<i data-loop="x in items">{{ x }}</i>"#))
            .unwrap();
        assert_eq!(instance.to_html(), r#"<i data-loop="x in items" hidden>{{ x }}</i>"#);
    }
}
