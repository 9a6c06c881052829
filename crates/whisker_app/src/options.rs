//! Instance construction options

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use whisker_core::{NodeId, Value};

use crate::error::Result;
use crate::instance::Instance;

/// An instance method, called as `name(args)` from expressions.
pub type Method = Rc<dyn Fn(&mut Instance, &[Value]) -> Result<Value>>;

/// Runs after a write to a watched path.
pub type Watcher = Rc<dyn Fn(&mut Instance) -> Result<()>>;

/// `created` and `mounted` lifecycle hooks.
pub type Hook = Rc<dyn Fn(&mut Instance) -> Result<()>>;

/// Where an instance mounts in its document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MountTarget {
    /// The document root fragment.
    #[default]
    Root,
    Selector(String),
    Node(NodeId),
}

/// Builder for [`Instance`] and component definitions.
///
/// `Options` is cheap to clone: callbacks are shared and data is copied, so a
/// component definition can stamp out independent instances.
#[derive(Clone, Default)]
pub struct Options {
    pub(crate) el: MountTarget,
    pub(crate) data: IndexMap<String, Value>,
    pub(crate) methods: IndexMap<String, Method>,
    pub(crate) watchers: Vec<(String, Watcher)>,
    pub(crate) created: Option<Hook>,
    pub(crate) mounted: Option<Hook>,
    pub(crate) name: Option<String>,
    pub(crate) template: Option<String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount at the first element matching `selector`.
    pub fn el(mut self, selector: impl Into<String>) -> Self {
        self.el = MountTarget::Selector(selector.into());
        self
    }

    pub fn el_node(mut self, node: NodeId) -> Self {
        self.el = MountTarget::Node(node);
        self
    }

    pub(crate) fn el_root(mut self) -> Self {
        self.el = MountTarget::Root;
        self
    }

    /// Declare a data field.
    pub fn data(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    /// Declare every member of a JSON object as a data field.
    pub fn data_json(mut self, data: serde_json::Value) -> Self {
        if let Value::Object(fields) = Value::from(data) {
            self.data.extend(fields);
        }
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut Instance, &[Value]) -> Result<Value> + 'static,
    {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Watch a dotted path. The watcher also fires for writes below it, and
    /// `*` matches any single segment.
    pub fn watch<F>(mut self, pattern: impl Into<String>, watcher: F) -> Self
    where
        F: Fn(&mut Instance) -> Result<()> + 'static,
    {
        self.watchers.push((pattern.into(), Rc::new(watcher)));
        self
    }

    pub fn created<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Instance) -> Result<()> + 'static,
    {
        self.created = Some(Rc::new(hook));
        self
    }

    pub fn mounted<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Instance) -> Result<()> + 'static,
    {
        self.mounted = Some(Rc::new(hook));
        self
    }

    /// Custom element name; makes these options a component definition.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Shadow markup for a component definition.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn is_component(&self) -> bool {
        self.name.is_some()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("el", &self.el)
            .field("data", &self.data)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field(
                "watchers",
                &self.watchers.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            )
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
