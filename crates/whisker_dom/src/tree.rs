//! Document tree
//!
//! An arena of nodes keyed by [`NodeId`]. Nodes are created detached and
//! linked in with the insertion methods; removal drops a whole subtree from
//! the arena and reports every id it released so callers can dispose state
//! keyed by those ids.

use slotmap::SlotMap;
use whisker_core::NodeId;

use crate::element::{Element, Node, NodeData};
use crate::error::DomError;

#[derive(Debug, Clone)]
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeData::Root));
        Self { nodes, root }
    }

    /// Parse an HTML document or fragment. Parsing is tolerant and never fails.
    pub fn parse(html: &str) -> Self {
        crate::parser::parse_document(html)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Whether `id` refers to a live node (attached or not).
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Whether `id` is live and reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(id) && (id == self.root || self.ancestors(id).any(|a| a == self.root))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id).map(|node| &mut node.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|element| element.has_attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.attrs.insert(name.to_ascii_lowercase(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)
            .and_then(|element| element.attrs.shift_remove(name))
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.has_attr(id, "hidden")
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        if hidden {
            self.set_attr(id, "hidden", "");
        } else {
            self.remove_attr(id, "hidden");
        }
    }

    /// The `value` property: the set value, else textarea content, else the attribute.
    pub fn value(&self, id: NodeId) -> String {
        let Some(element) = self.element(id) else {
            return String::new();
        };
        if let Some(value) = &element.value {
            return value.clone();
        }
        if element.tag == "textarea" {
            return self.text_content(id);
        }
        element.attr("value").unwrap_or_default().to_string()
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.value = Some(value.into());
        }
    }

    pub fn is_checked(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|element| element.checked)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(element) = self.element_mut(id) {
            element.checked = checked;
        }
    }

    /// One property from the inline `style` attribute.
    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        parse_style(style)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Set one property of the inline `style` attribute, keeping the others in order.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        let mut declarations = parse_style(self.attr(id, "style").unwrap_or_default());
        match declarations.iter_mut().find(|(name, _)| name == property) {
            Some(declaration) => declaration.1 = value.to_string(),
            None => declarations.push((property.to_string(), value.to_string())),
        }
        let style = declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "style", style);
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).and_then(Node::as_text)
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(NodeData::Text(current)) = self.nodes.get_mut(id).map(|node| &mut node.data) {
            *current = text.into();
        }
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.text_nodes_under(id)
            .into_iter()
            .filter_map(|text| self.text(text))
            .collect()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes
            .insert(Node::new(NodeData::Element(Element::new(tag))))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(Node::new(NodeData::Text(text.into())))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(Node::new(NodeData::Comment(text.into())))
    }

    pub(crate) fn create(&mut self, data: NodeData) -> NodeId {
        self.nodes.insert(Node::new(data))
    }

    /// Link a freshly created node as the last child of `parent`.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let at = self.children(parent).len();
        self.insert_at(parent, at, child)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_at(parent, 0, child)
    }

    /// Insert `node` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        let position = self.position(parent, reference);
        self.insert_at(parent, position + 1, node)
    }

    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        let position = self.position(parent, reference);
        self.insert_at(parent, position, node)
    }

    fn position(&self, parent: NodeId, child: NodeId) -> usize {
        self.children(parent)
            .iter()
            .position(|&c| c == child)
            .unwrap_or_default()
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
        if !self.contains(parent) {
            return Err(DomError::MissingNode(parent));
        }
        if !self.contains(child) {
            return Err(DomError::MissingNode(child));
        }
        if child == self.root {
            return Err(DomError::RootMove);
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Cycle(child));
        }

        // Moving within the same parent shifts the target index.
        let mut index = index;
        if self.parent(child) == Some(parent) && self.position(parent, child) < index {
            index -= 1;
        }
        self.detach(child);

        let node = &mut self.nodes[parent];
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Unlink a node from its parent, keeping it (and its subtree) alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|&c| c != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    /// Remove a subtree from the document and the arena.
    ///
    /// Returns every removed id in document order, `id` first.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        if id == self.root || !self.contains(id) {
            return Vec::new();
        }
        self.detach(id);
        let mut removed = vec![id];
        removed.extend(self.descendants(id));
        for node in &removed {
            self.nodes.remove(*node);
        }
        removed
    }

    /// Deep copy of a subtree, returned detached. Form properties are copied too.
    pub fn clone_subtree(&mut self, id: NodeId) -> Option<NodeId> {
        let data = self.nodes.get(id)?.data.clone();
        let copy = self.create(data);
        for child in self.children(id).to_vec() {
            if let Some(child_copy) = self.clone_subtree(child) {
                self.attach(copy, child_copy);
            }
        }
        Some(copy)
    }

    /// Deep copy of a subtree from another document, returned detached.
    pub fn import(&mut self, other: &Document, id: NodeId) -> Option<NodeId> {
        let data = match &other.node(id)?.data {
            NodeData::Root => NodeData::Element(Element::new("template")),
            data => data.clone(),
        };
        let copy = self.create(data);
        for &child in other.children(id) {
            if let Some(child_copy) = self.import(other, child) {
                self.attach(copy, child_copy);
            }
        }
        Some(copy)
    }

    /// Parse `html` and insert the resulting nodes at the start of `parent`.
    pub fn prepend_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, DomError> {
        let fragment = Document::parse(html);
        let mut inserted = Vec::new();
        for &top in fragment.children(fragment.root()) {
            if let Some(copy) = self.import(&fragment, top) {
                self.insert_at(parent, inserted.len(), copy)?;
                inserted.push(copy);
            }
        }
        Ok(inserted)
    }

    /// Preorder descendants of `id`, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn text_nodes_under(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| self.is_text(node))
            .collect()
    }

    /// Descendant elements carrying `name`.
    pub fn elements_with_attr(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| self.has_attr(node, name))
            .collect()
    }

    /// Descendant elements with any attribute starting with `prefix`.
    pub fn elements_with_attr_prefix(&self, id: NodeId, prefix: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| {
                self.element(node)
                    .is_some_and(|element| element.attrs.keys().any(|name| name.starts_with(prefix)))
            })
            .collect()
    }

    /// Parent, grandparent and so on up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&node| self.parent(node))
    }

    /// Nearest inclusive ancestor satisfying `predicate`.
    pub fn closest(&self, id: NodeId, predicate: impl Fn(NodeId) -> bool) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&node| predicate(node))
    }

    pub fn closest_with_attr(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.closest(id, |node| self.has_attr(node, name))
    }

    /// Nearest inclusive ancestor that is an element.
    pub fn closest_element(&self, id: NodeId) -> Option<NodeId> {
        self.closest(id, |node| self.is_element(node))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|&c| c == id)?;
        siblings[position + 1..]
            .iter()
            .copied()
            .find(|&sibling| self.is_element(sibling))
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// `target` and its ancestors up to and including `until`.
    pub fn event_path(&self, target: NodeId, until: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        for node in std::iter::once(target).chain(self.ancestors(target)) {
            path.push(node);
            if node == until {
                break;
            }
        }
        path
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Split an inline style attribute into `(property, value)` pairs.
fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}
