//! `data-on-<event>[.modifier]` listeners

use std::rc::Rc;

use tracing::debug;
use whisker_core::{evaluate, NodeId, Program};
use whisker_dom::DomEvent;

use crate::directives::{elements_in, in_loop_template, model::ModelKind};
use crate::error::Result;
use crate::instance::Instance;
use crate::scope::Env;

const EVENT_PREFIX: &str = "data-on-";

/// What runs when a listener fires.
#[derive(Debug, Clone)]
pub enum Listener {
    /// A handler expression from a `data-on-*` attribute.
    Handler {
        program: Rc<Program>,
        prevent: bool,
        stop: bool,
    },
    /// Writes a form control's state back through its `data-model`.
    Model(ModelKind),
}

/// Parse an attribute name such as `data-on-click.prevent.stop` into the
/// event type and its modifiers.
pub fn parse_event_attr(name: &str) -> Option<(String, Vec<String>)> {
    let rest = name.strip_prefix(EVENT_PREFIX)?;
    let mut parts = rest.split('.');
    let event = parts.next().filter(|event| !event.is_empty())?.to_ascii_lowercase();
    Some((event, parts.map(str::to_string).collect()))
}

/// Register one listener per `data-on-*` attribute under `scope`.
pub(crate) fn wire_all(instance: &mut Instance, scope: NodeId) -> Result<()> {
    let doc = instance.doc()?;
    let mut pending = Vec::new();
    for node in elements_in(doc, scope) {
        let Some(element) = doc.element(node) else {
            continue;
        };
        if !element.attrs.keys().any(|name| name.starts_with(EVENT_PREFIX))
            || in_loop_template(doc, node)
        {
            continue;
        }
        for (name, expression) in &element.attrs {
            if let Some((event, modifiers)) = parse_event_attr(name) {
                pending.push((node, event, modifiers, expression.clone()));
            }
        }
    }
    debug!(listeners = pending.len(), "wiring event listeners");

    for (node, event, modifiers, expression) in pending {
        let program = instance.compile(&expression, node, None)?;
        let listener = Listener::Handler {
            program,
            prevent: modifiers.iter().any(|m| m == "prevent"),
            stop: modifiers.iter().any(|m| m == "stop"),
        };
        instance.listeners.register(node, &event, listener);
    }
    Ok(())
}

/// Run one listener registered on `node`.
pub(crate) fn run(
    instance: &mut Instance,
    node: NodeId,
    listener: &Listener,
    event: &mut DomEvent,
) -> Result<()> {
    if !instance.doc()?.contains(node) {
        return Ok(());
    }
    match listener {
        Listener::Handler {
            program,
            prevent,
            stop,
        } => {
            if *prevent {
                event.prevent_default();
            }
            if *stop {
                event.stop_propagation();
            }
            let mut env = Env::new(instance, node, Some(event.clone()));
            evaluate(program, &mut env)?;
            Ok(())
        }
        Listener::Model(kind) => crate::directives::model::write_back(instance, node, *kind, event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use pretty_assertions::assert_eq;
    use whisker_core::Value;
    use whisker_dom::Document;

    #[test]
    fn test_parse_event_attr() {
        assert_eq!(
            parse_event_attr("data-on-submit.prevent.stop"),
            Some(("submit".to_string(), vec!["prevent".to_string(), "stop".to_string()]))
        );
        assert_eq!(parse_event_attr("data-on-"), None);
        assert_eq!(parse_event_attr("data-model"), None);
    }

    #[test]
    fn test_modifiers_and_bubbling() {
        let html = r#"<form data-on-submit="outer++"><div data-on-submit.prevent.stop="inner++"><button>go</button></div></form>"#;
        let mut instance =
            Instance::new(Options::new().data("outer", 0).data("inner", 0)).unwrap();
        instance.mount(Document::parse(html)).unwrap();
        let doc = instance.document().unwrap();
        let button = doc.query_selector(doc.root(), "button").unwrap().unwrap();
        let form = doc.query_selector(doc.root(), "form").unwrap().unwrap();

        let event = instance.dispatch(button, "submit").unwrap();
        assert!(event.default_prevented);
        assert_eq!(instance.get("inner"), Value::from(1));
        assert_eq!(instance.get("outer"), Value::from(0));

        let event = instance.dispatch(form, "submit").unwrap();
        assert!(!event.default_prevented);
        assert_eq!(instance.get("outer"), Value::from(1));
    }

    #[test]
    fn test_removed_listener_does_not_fire() {
        let mut instance = Instance::new(Options::new().data("n", 0)).unwrap();
        instance
            .mount(Document::parse(r#"<button data-on-click="n++">+</button>"#))
            .unwrap();
        let button = instance.document().unwrap().children(instance.root().unwrap())[0];
        let id = instance.listeners.handlers(button, "click")[0].0;

        instance.click(button).unwrap();
        assert!(instance.remove_listener(id));
        instance.click(button).unwrap();
        assert_eq!(instance.get("n"), Value::from(1));
    }
}
