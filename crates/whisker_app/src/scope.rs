//! Expression scopes
//!
//! Loop clones carry a [`LoopItemScope`]; a node sees the scopes attached to
//! itself and its ancestors, nearest first. [`Env`] is the evaluation
//! environment for one node: `$this` reads and writes the instance store,
//! `$loop` goes through the scope chain and `$event` exposes the event being
//! dispatched.

use std::rc::Rc;

use tracing::error;
use whisker_core::{
    evaluate, eval::descend, place_of, rewrite, DataPath, Environment, EvalError, NameResolver,
    NodeId, Object, PathKey, Place, Program, Value,
};
use whisker_dom::DomEvent;

use crate::error::{EngineError, Result};
use crate::instance::Instance;

/// Loop variables bound on one clone root.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopItemScope {
    pub item: String,
    /// Where the item lives: a store path for instance collections, a detached
    /// value otherwise.
    pub place: Place,
    pub index: Option<String>,
    pub position: usize,
}

impl LoopItemScope {
    fn binding(&self, name: &str) -> Option<Place> {
        if name == self.item {
            Some(self.place.clone())
        } else if self.index.as_deref() == Some(name) {
            Some(Place::Detached(
                Value::from(self.position),
                DataPath::new(),
            ))
        } else {
            None
        }
    }
}

impl Instance {
    /// Resolve a loop-local name for `node` through the nearest scopes.
    pub(crate) fn loop_binding(&self, node: NodeId, name: &str) -> Option<Place> {
        let doc = self.document.as_ref()?;
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .filter_map(|ancestor| self.scopes.get(&ancestor))
            .find_map(|scope| scope.binding(name))
    }

    /// Rewrite and parse `source` in the context of `node`.
    ///
    /// Instance fields the expression reads are registered against
    /// `register_as`. Unknown names mark the enclosing element but do not fail.
    pub(crate) fn compile(
        &mut self,
        source: &str,
        node: NodeId,
        register_as: Option<NodeId>,
    ) -> Result<Rc<Program>> {
        let rewritten = rewrite(source, &Resolver { instance: self, node });
        if let Some(dependent) = register_as {
            for root in rewritten.instance_roots() {
                self.registry.register(root, dependent);
            }
        }
        let unresolved: Vec<&str> = rewritten.unresolved().collect();
        if !unresolved.is_empty() {
            self.mark_error(node, &unresolved, source)?;
        }
        Ok(self.cache.get_or_parse(&rewritten.text)?)
    }

    /// Compile and evaluate `source` for `node`.
    pub(crate) fn eval_in(
        &mut self,
        source: &str,
        node: NodeId,
        register_as: Option<NodeId>,
    ) -> Result<Value> {
        let program = self.compile(source, node, register_as)?;
        evaluate(&program, &mut Env::new(self, node, None))
    }

    /// The storage place a model expression names.
    pub(crate) fn resolve_place(&mut self, source: &str, node: NodeId) -> Result<Place> {
        let program = self.compile(source, node, None)?;
        let Some(expr) = program.single_expression() else {
            return Err(EngineError::NotAssignable(source.to_string()));
        };
        place_of(expr, &mut Env::new(self, node, None))?
            .ok_or_else(|| EngineError::NotAssignable(source.to_string()))
    }

    /// Write through a place produced by an expression.
    pub(crate) fn write_place(&mut self, place: &Place, value: Value) -> Result<()> {
        match place {
            Place::Data(path) => self.set_path(path, value),
            other => Err(EvalError::ReadOnly(other.describe()).into()),
        }
    }

    /// Outline the element enclosing `node` and prepend an error marker, once.
    fn mark_error(&mut self, node: NodeId, names: &[&str], source: &str) -> Result<()> {
        for name in names {
            error!(name, expression = source, "name is not defined on the instance");
        }
        let doc = self.doc()?;
        let Some(element) = doc
            .parent(node)
            .and_then(|parent| doc.closest_element(parent))
            .or_else(|| doc.closest_element(node))
        else {
            return Ok(());
        };
        if !self.marked.insert(element) {
            return Ok(());
        }
        let doc = self.document_mut()?;
        doc.set_style(element, "border", "2px solid red");
        doc.set_style(element, "color", "red");
        doc.prepend_html(element, "<b>Error: </b>")?;
        Ok(())
    }
}

struct Resolver<'a> {
    instance: &'a Instance,
    node: NodeId,
}

impl NameResolver for Resolver<'_> {
    fn is_loop_local(&self, name: &str) -> bool {
        self.instance.loop_binding(self.node, name).is_some()
    }

    fn is_instance_member(&self, name: &str) -> bool {
        self.instance.store.contains(name) || self.instance.methods.contains_key(name)
    }
}

/// Evaluation environment for expressions attached to one node.
pub(crate) struct Env<'a> {
    instance: &'a mut Instance,
    node: NodeId,
    event: Option<DomEvent>,
}

impl<'a> Env<'a> {
    pub(crate) fn new(instance: &'a mut Instance, node: NodeId, event: Option<DomEvent>) -> Self {
        Self {
            instance,
            node,
            event,
        }
    }

    fn event_value(&self) -> Value {
        let Some(event) = &self.event else {
            return Value::Undefined;
        };
        let mut object = Object::new();
        object.insert("type".to_string(), Value::from(event.event_type.as_str()));
        object.insert("target".to_string(), Value::Node(event.target));
        object.insert("currentTarget".to_string(), Value::Node(event.current_target));
        object.insert(
            "defaultPrevented".to_string(),
            Value::Bool(event.default_prevented),
        );
        Value::Object(object)
    }
}

impl Environment for Env<'_> {
    type Error = EngineError;

    fn loop_binding(&self, name: &str) -> Option<Place> {
        self.instance.loop_binding(self.node, name)
    }

    fn read(&self, place: &Place) -> Value {
        match place {
            Place::Data(path) => match path.split_first() {
                Some((PathKey::Field(field), rest)) => {
                    let value = self.instance.store.field(field).cloned().unwrap_or_default();
                    descend(self, value, rest)
                }
                _ => Value::Undefined,
            },
            Place::Event(path) => descend(self, self.event_value(), path.keys()),
            Place::Detached(value, path) => descend(self, value.clone(), path.keys()),
        }
    }

    fn write(&mut self, place: &Place, value: Value) -> Result<()> {
        self.instance.write_place(place, value)
    }

    fn has_method(&self, name: &str) -> bool {
        self.instance.methods.contains_key(name)
    }

    fn call_method(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.instance.call(name, &args)
    }

    fn node_property(&self, node: NodeId, key: &str) -> Value {
        let Some(doc) = self.instance.document.as_ref() else {
            return Value::Undefined;
        };
        let Some(element) = doc.element(node) else {
            return match key {
                "textContent" => Value::from(doc.text_content(node)),
                _ => Value::Undefined,
            };
        };
        match key {
            "value" => Value::from(doc.value(node)),
            "checked" => Value::Bool(element.checked),
            "id" => Value::from(element.id().unwrap_or_default()),
            "tagName" => Value::from(element.tag.to_ascii_uppercase()),
            "type" => Value::from(element.input_type()),
            "textContent" => Value::from(doc.text_content(node)),
            "hidden" => Value::Bool(doc.is_hidden(node)),
            "parentElement" => doc
                .parent(node)
                .filter(|&parent| doc.is_element(parent))
                .map_or(Value::Null, Value::Node),
            other => element.attr(other).map_or(Value::Undefined, Value::from),
        }
    }

    fn alert(&mut self, message: &str) {
        tracing::info!(target: "whisker::alert", "{message}");
        self.instance.alerts.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use whisker_dom::Document;

    fn mounted(html: &str, options: Options) -> Instance {
        let mut instance = Instance::new(options).unwrap();
        instance.mount(Document::parse(html)).unwrap();
        instance
    }

    #[test]
    fn test_nearest_scope_wins() {
        let mut instance = mounted("<ul><li><b>x</b></li></ul>", Options::new());
        let doc = instance.document().unwrap();
        let ul = doc.children(doc.root())[0];
        let li = doc.children(ul)[0];
        let b = doc.children(li)[0];

        let outer = LoopItemScope {
            item: "x".to_string(),
            place: Place::Detached(Value::from("outer"), DataPath::new()),
            index: Some("i".to_string()),
            position: 3,
        };
        let inner = LoopItemScope {
            item: "x".to_string(),
            place: Place::Detached(Value::from("inner"), DataPath::new()),
            index: None,
            position: 0,
        };
        instance.scopes.insert(ul, outer);
        instance.scopes.insert(li, inner);

        assert_eq!(
            instance.loop_binding(b, "x"),
            Some(Place::Detached(Value::from("inner"), DataPath::new()))
        );
        assert_eq!(
            instance.loop_binding(b, "i"),
            Some(Place::Detached(Value::from(3usize), DataPath::new()))
        );
        assert_eq!(instance.loop_binding(b, "y"), None);
    }

    #[test]
    fn test_unknown_name_marks_enclosing_element_once() {
        let instance = mounted(
            "<p>{{ missing }} and {{ alsoMissing }}</p>",
            Options::new(),
        );
        let html = instance.to_html();
        assert_eq!(html.matches("<b>Error: </b>").count(), 1);
        assert!(html.contains("border: 2px solid red;"));
    }

    #[test]
    fn test_event_properties() {
        let mut instance = mounted(
            r#"<input id="name" value="Ada" data-on-input="seen = $event.target.value + $event.type">"#,
            Options::new().data("seen", ""),
        );
        let input = instance.document().unwrap().children(instance.root().unwrap())[0];
        instance.dispatch(input, "input").unwrap();
        assert_eq!(instance.get("seen"), Value::from("Adainput"));
    }

    #[test]
    fn test_unknown_name_marks_top_level_element_itself() {
        let instance = mounted(r#"<p data-if="missing">x</p>"#, Options::new());
        let html = instance.to_html();
        assert!(html.contains("<b>Error: </b>x</p>"));
        assert!(html.contains("border: 2px solid red;"));
    }
}
