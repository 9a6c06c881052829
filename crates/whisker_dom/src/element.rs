//! Node payloads stored in the document arena

use indexmap::IndexMap;
use whisker_core::NodeId;

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is taken verbatim up to the matching end tag.
pub const RAW_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "textarea"];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// The document fragment every parsed tree hangs off.
    Root,
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// An element with ordered attributes and the live form properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    pub attrs: IndexMap<String, String>,
    /// The `value` property once it has been set. Until then reads fall back
    /// to the content (textarea) or the `value` attribute.
    pub value: Option<String>,
    pub checked: bool,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Build an element from parsed attributes; `checked` starts from the attribute.
    pub fn with_attrs(tag: impl Into<String>, attrs: impl IntoIterator<Item = (String, String)>) -> Self {
        let attrs: IndexMap<String, String> = attrs.into_iter().collect();
        let checked = attrs.contains_key("checked");
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs,
            value: None,
            checked,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Lowercase `type` of an input, `text` when absent.
    pub fn input_type(&self) -> String {
        self.attr("type")
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is_void(&self) -> bool {
        is_void(&self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_starts_from_attribute() {
        let element = Element::with_attrs(
            "INPUT",
            [("type".to_string(), "checkbox".to_string()), ("checked".to_string(), String::new())],
        );
        assert_eq!(element.tag, "input");
        assert!(element.checked);
        assert_eq!(element.input_type(), "checkbox");
        assert!(element.is_void());
    }

    #[test]
    fn test_classes() {
        let element = Element::with_attrs("div", [("class".to_string(), " a  b ".to_string())]);
        assert_eq!(element.classes().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(Element::new("p").classes().count(), 0);
    }
}
