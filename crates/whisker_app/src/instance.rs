//! Mounted instances
//!
//! An [`Instance`] owns its data fields and everything that ties them to the
//! document: the binding registry, loop records, conditional chains,
//! interpolation templates, listeners and connected components. Writes go
//! through [`Instance::set`] (or an expression assignment), which fires the
//! matching watchers and re-runs the directive of every dependent node
//! before returning.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};
use whisker_core::{
    store::root_field, BindingRegistry, DataPath, ExpressionCache, NodeId, Store, Value, Watchers,
};
use whisker_dom::{Document, DomEvent, EventDispatcher, ListenerId};

use crate::component::ComponentRegistry;
use crate::directives::{self, conditional::ConditionalChain, event::Listener, loops::LoopRecord};
use crate::error::{EngineError, Result};
use crate::options::{Hook, Method, MountTarget, Options, Watcher};
use crate::scope::LoopItemScope;

pub struct Instance {
    pub(crate) store: Store,
    pub(crate) methods: IndexMap<String, Method>,
    pub(crate) watchers: Watchers<Watcher>,
    mounted_hook: Option<Hook>,
    target: MountTarget,

    pub(crate) cache: ExpressionCache,
    pub(crate) registry: BindingRegistry,
    pub(crate) components: Rc<RefCell<ComponentRegistry>>,

    pub(crate) document: Option<Document>,
    pub(crate) root: Option<NodeId>,
    pub(crate) refs: IndexMap<String, NodeId>,
    pub(crate) scopes: FxHashMap<NodeId, LoopItemScope>,
    pub(crate) loops: FxHashMap<NodeId, LoopRecord>,
    pub(crate) chains: FxHashMap<NodeId, ConditionalChain>,
    pub(crate) templates: FxHashMap<NodeId, String>,
    pub(crate) marked: FxHashSet<NodeId>,
    pub(crate) listeners: EventDispatcher<Listener>,
    pub(crate) children: IndexMap<NodeId, Instance>,
    pub(crate) alerts: Vec<String>,
}

impl Instance {
    /// Create an instance and run its `created` hook.
    ///
    /// Nothing is rendered until [`Instance::mount`].
    pub fn new(options: Options) -> Result<Self> {
        Self::with_components(options, Rc::default())
    }

    pub(crate) fn with_components(
        options: Options,
        components: Rc<RefCell<ComponentRegistry>>,
    ) -> Result<Self> {
        let Options {
            el,
            data,
            methods,
            watchers,
            created,
            mounted,
            ..
        } = options;

        let mut registry = BindingRegistry::new();
        let mut store = Store::new();
        for (field, value) in data {
            registry.declare(field.clone());
            store.declare(field, value);
        }

        let mut watch = Watchers::new();
        for (pattern, watcher) in watchers {
            watch.add(&pattern, watcher);
        }

        let mut instance = Self {
            store,
            methods,
            watchers: watch,
            mounted_hook: mounted,
            target: el,
            cache: ExpressionCache::new(),
            registry,
            components,
            document: None,
            root: None,
            refs: IndexMap::new(),
            scopes: FxHashMap::default(),
            loops: FxHashMap::default(),
            chains: FxHashMap::default(),
            templates: FxHashMap::default(),
            marked: FxHashSet::default(),
            listeners: EventDispatcher::new(),
            children: IndexMap::new(),
            alerts: Vec::new(),
        };

        if let Some(created) = created {
            created(&mut instance)?;
        }
        Ok(instance)
    }

    /// Take ownership of `document` and wire every directive under the mount root.
    pub fn mount(&mut self, document: Document) -> Result<()> {
        let root = match &self.target {
            MountTarget::Root => document.root(),
            MountTarget::Selector(selector) => document
                .query_selector(document.root(), selector)?
                .ok_or_else(|| EngineError::MountTargetNotFound(selector.clone()))?,
            MountTarget::Node(node) if document.contains(*node) => *node,
            MountTarget::Node(node) => {
                return Err(EngineError::MountTargetNotFound(format!("{node:?}")))
            }
        };
        self.document = Some(document);
        self.root = Some(root);
        debug!(fields = self.store.len(), "mounting instance");

        directives::refs::collect(self, root)?;
        directives::loops::wire_all(self, root)?;
        directives::interpolate::wire_all(self, root)?;
        directives::conditional::wire_all(self, root)?;
        directives::event::wire_all(self, root)?;
        directives::value::refresh_all(self, root)?;
        directives::model::wire_all(self, root)?;
        crate::component::connect_all(self, root)?;

        self.document_mut()?.set_hidden(root, false);

        if let Some(mounted) = self.mounted_hook.clone() {
            mounted(self)?;
        }
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub(crate) fn doc(&self) -> Result<&Document> {
        self.document.as_ref().ok_or(EngineError::NotMounted)
    }

    pub(crate) fn document_mut(&mut self) -> Result<&mut Document> {
        self.document.as_mut().ok_or(EngineError::NotMounted)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Read a dotted data path such as `todos.0.title`.
    pub fn get(&self, path: &str) -> Value {
        self.store.get(&DataPath::parse(path))
    }

    pub fn data(&self) -> &Store {
        &self.store
    }

    /// Write a dotted data path and re-render its dependents.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.set_path(&DataPath::parse(path), value.into())
    }

    pub fn set_path(&mut self, path: &DataPath, value: Value) -> Result<()> {
        self.store.set(path, value)?;
        self.notify(path)
    }

    /// Append to the array at `path`, writing the whole array back.
    pub fn push(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let path = DataPath::parse(path);
        let Value::Array(mut items) = self.store.get(&path) else {
            return Err(EngineError::NotAnArray(path.to_string()));
        };
        items.push(value.into());
        self.set_path(&path, Value::Array(items))
    }

    /// Call an instance method by name.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let method = self
            .methods
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownMethod(name.to_string()))?;
        method(self, args)
    }

    /// Fire watchers for `path`, then refresh every node bound to its field.
    pub(crate) fn notify(&mut self, path: &DataPath) -> Result<()> {
        let dotted = path.to_string();
        for watcher in self.watchers.matching(&dotted) {
            watcher(self)?;
        }

        let Some(field) = root_field(path) else {
            return Ok(());
        };
        if !self.is_mounted() {
            return Ok(());
        }
        for node in self.registry.dependents(&field) {
            if !self.doc()?.contains(node) {
                continue;
            }
            trace!(path = %dotted, ?node, "refreshing dependent");
            self.refresh(node)?;
        }
        Ok(())
    }

    fn refresh(&mut self, node: NodeId) -> Result<()> {
        let doc = self.doc()?;
        if doc.is_text(node) {
            return directives::interpolate::render(self, node);
        }
        if doc.has_attr(node, "data-value") {
            directives::value::refresh(self, node)
        } else if doc.has_attr(node, "data-model") {
            directives::model::refresh(self, node)
        } else if doc.has_attr(node, "data-loop") {
            directives::loops::rematerialize(self, node)
        } else if doc.has_attr(node, "data-if") {
            directives::conditional::evaluate(self, node)
        } else {
            Ok(())
        }
    }

    /// Fire an event at `target`, bubbling up to the mount root.
    pub fn dispatch(&mut self, target: NodeId, event_type: &str) -> Result<DomEvent> {
        let root = self.root.ok_or(EngineError::NotMounted)?;
        let route = self
            .listeners
            .route(self.doc()?, event_type, target, root);
        let mut event = DomEvent::new(event_type, target);
        debug!(event = event_type, ?target, listeners = route.len(), "dispatching event");

        for (node, handlers) in route {
            event.current_target = node;
            for (id, listener) in handlers {
                if !self.listeners.contains(id) {
                    continue;
                }
                directives::event::run(self, node, &listener, &mut event)?;
            }
            if event.propagation_stopped {
                break;
            }
        }
        Ok(event)
    }

    /// Type into a form control: set its value, then fire `input`.
    pub fn input(&mut self, node: NodeId, text: &str) -> Result<DomEvent> {
        self.document_mut()?.set_value(node, text);
        self.dispatch(node, "input")
    }

    /// Check or uncheck a checkbox or radio, then fire `change`.
    pub fn set_checked(&mut self, node: NodeId, checked: bool) -> Result<DomEvent> {
        self.document_mut()?.set_checked(node, checked);
        self.dispatch(node, "change")
    }

    pub fn click(&mut self, node: NodeId) -> Result<DomEvent> {
        self.dispatch(node, "click")
    }

    /// Messages passed to `alert` since the last call.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    /// Elements collected from `data-ref` at mount.
    pub fn refs(&self) -> &IndexMap<String, NodeId> {
        &self.refs
    }

    pub fn ref_node(&self, name: &str) -> Option<NodeId> {
        self.refs.get(name).copied()
    }

    /// The component instance connected at `host`.
    pub fn component(&self, host: NodeId) -> Option<&Instance> {
        self.children.get(&host)
    }

    pub fn component_mut(&mut self, host: NodeId) -> Option<&mut Instance> {
        self.children.get_mut(&host)
    }

    /// Number of live dependency registrations.
    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }

    pub fn expression_cache(&self) -> &ExpressionCache {
        &self.cache
    }

    /// Serialize the document, components' shadow trees included.
    pub fn to_html(&self) -> String {
        let Some(doc) = &self.document else {
            return String::new();
        };
        doc.to_html_with(&|host| self.children.get(&host).map(Instance::to_html))
    }

    /// Release every piece of state keyed by `nodes`.
    pub(crate) fn dispose_nodes(&mut self, nodes: &[NodeId]) {
        let mut released = 0;
        for &node in nodes {
            released += self.registry.release(node);
            self.listeners.remove_node(node);
            self.scopes.remove(&node);
            self.loops.remove(&node);
            self.chains.remove(&node);
            self.templates.remove(&node);
            self.marked.remove(&node);
            if let Some(mut child) = self.children.shift_remove(&node) {
                child.unmount();
            }
        }
        self.refs.retain(|_, node| !nodes.contains(node));
        trace!(nodes = nodes.len(), released, "disposed nodes");
    }

    /// Remove one event listener. Returns whether it was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id).is_some()
    }

    /// Tear down all rendering state and return the document.
    ///
    /// Data and watchers survive: later writes update the store and fire
    /// watchers but render nothing.
    pub fn unmount(&mut self) -> Option<Document> {
        for (_, mut child) in self.children.drain(..) {
            child.unmount();
        }
        self.registry.clear();
        self.listeners = EventDispatcher::new();
        self.refs.clear();
        self.scopes.clear();
        self.loops.clear();
        self.chains.clear();
        self.templates.clear();
        self.marked.clear();
        self.root = None;
        self.document.take()
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("data", &self.store)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("mounted", &self.is_mounted())
            .field("bindings", &self.registry.len())
            .field("components", &self.children.len())
            .finish_non_exhaustive()
    }
}
