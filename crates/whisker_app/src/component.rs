//! Custom-element components
//!
//! A component definition is an [`Options`] with a `name` and a `template`.
//! Every element whose tag matches a registered name gets its own [`Instance`]
//! mounted on a fresh shadow [`Document`] parsed from the template.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};
use whisker_core::NodeId;
use whisker_dom::Document;

use crate::directives::{elements_in, in_loop_template};
use crate::error::{EngineError, Result};
use crate::instance::Instance;
use crate::options::Options;

#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    pub name: String,
    pub template: String,
    pub options: Options,
}

/// Component definitions by lowercase tag name.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    definitions: IndexMap<String, ComponentDefinition>,
}

impl ComponentRegistry {
    /// Register a definition. A later definition with the same name replaces
    /// the earlier one.
    pub fn register(&mut self, options: Options) -> Result<String> {
        let name = options
            .name
            .clone()
            .ok_or(EngineError::InvalidComponent("name"))?
            .to_ascii_lowercase();
        let template = options
            .template
            .clone()
            .ok_or(EngineError::InvalidComponent("template"))?;
        if template.trim().is_empty() {
            warn!(component = %name, "component template is empty");
        }
        debug!(component = %name, "registered component");
        self.definitions.insert(
            name.clone(),
            ComponentDefinition {
                name: name.clone(),
                template,
                options,
            },
        );
        Ok(name)
    }

    pub fn get(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// What [`Runtime::construct`] produced.
#[derive(Debug)]
pub enum Constructed {
    /// A component definition was registered under this name.
    Registered(String),
    Instance(Box<Instance>),
}

/// Entry point that shares one component registry between instances.
#[derive(Debug, Default, Clone)]
pub struct Runtime {
    registry: Rc<RefCell<ComponentRegistry>>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component definition.
    pub fn component(&self, options: Options) -> Result<String> {
        self.registry.borrow_mut().register(options)
    }

    /// Register `options` if it names a component, otherwise create an instance.
    pub fn construct(&self, options: Options) -> Result<Constructed> {
        if options.is_component() {
            self.component(options).map(Constructed::Registered)
        } else {
            self.instance(options).map(|instance| Constructed::Instance(Box::new(instance)))
        }
    }

    /// Create an instance that connects this runtime's components.
    pub fn instance(&self, options: Options) -> Result<Instance> {
        Instance::with_components(options, self.registry.clone())
    }

    pub fn registry(&self) -> std::cell::Ref<'_, ComponentRegistry> {
        self.registry.borrow()
    }
}

/// Connect a component instance to every matching host at or under `scope`.
pub(crate) fn connect_all(instance: &mut Instance, scope: NodeId) -> Result<()> {
    let registry = instance.components.clone();
    let hosts: Vec<(NodeId, ComponentDefinition)> = {
        let definitions = registry.borrow();
        if definitions.is_empty() {
            return Ok(());
        }
        let doc = instance.doc()?;
        elements_in(doc, scope)
            .into_iter()
            .filter(|host| !instance.children.contains_key(host))
            .filter(|&host| !in_loop_template(doc, host))
            .filter_map(|host| {
                let definition = definitions.get(doc.tag(host)?)?;
                Some((host, definition.clone()))
            })
            .collect()
    };

    for (host, definition) in hosts {
        let mut child = Instance::with_components(definition.options.el_root(), registry.clone())?;
        child.mount(Document::parse(&definition.template))?;
        debug!(component = %definition.name, ?host, "connected component");
        instance.children.insert(host, child);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use whisker_core::Value;

    fn counter() -> Options {
        Options::new()
            .name("My-Counter")
            .template("<button data-on-click=\"count++\">{{ count }}</button>")
            .data("count", 0)
    }

    #[test]
    fn test_register_requires_name_and_template() {
        let mut registry = ComponentRegistry::default();
        assert_eq!(
            registry.register(Options::new().template("<p></p>")).unwrap_err(),
            EngineError::InvalidComponent("name")
        );
        assert_eq!(
            registry.register(Options::new().name("x-a")).unwrap_err(),
            EngineError::InvalidComponent("template")
        );
        assert_eq!(registry.register(counter()).unwrap(), "my-counter");
        assert!(registry.contains("MY-COUNTER"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["my-counter"]);
    }

    #[test]
    fn test_construct() {
        let runtime = Runtime::new();
        assert!(matches!(
            runtime.construct(counter()).unwrap(),
            Constructed::Registered(name) if name == "my-counter"
        ));
        assert!(matches!(
            runtime.construct(Options::new()).unwrap(),
            Constructed::Instance(_)
        ));
        assert_eq!(runtime.registry().len(), 1);
    }

    #[test]
    fn test_connects_hosts_with_shadow_content() {
        let runtime = Runtime::new();
        runtime.component(counter()).unwrap();
        let mut page = runtime.instance(Options::new()).unwrap();
        page.mount(Document::parse("<my-counter></my-counter>")).unwrap();

        let host = page.document().unwrap().children(page.root().unwrap())[0];
        assert_eq!(
            page.to_html(),
            r#"<my-counter><template shadowrootmode="open"><button data-on-click="count++">0</button></template></my-counter>"#
        );

        let child = page.component_mut(host).unwrap();
        let button = child.document().unwrap().children(child.root().unwrap())[0];
        child.click(button).unwrap();
        assert_eq!(child.get("count"), Value::from(1));
    }
}
