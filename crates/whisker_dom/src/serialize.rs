//! HTML serialization
//!
//! Attribute values and text are escaped; `script` and `style` content is
//! written verbatim. A shadow hook lets a caller emit a declarative shadow
//! root (`<template shadowrootmode="open">`) as the first child of a host.

use html_escape::{encode_double_quoted_attribute, encode_text};
use whisker_core::NodeId;

use crate::element::{Element, NodeData};
use crate::tree::Document;

/// Markup for a host's shadow tree, if it has one.
pub type ShadowHook<'a> = &'a dyn Fn(NodeId) -> Option<String>;

impl Document {
    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    pub fn to_html_with(&self, shadow: ShadowHook<'_>) -> String {
        self.inner_html_with(self.root(), shadow)
    }

    /// Markup of the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        self.inner_html_with(id, &|_| None)
    }

    pub fn inner_html_with(&self, id: NodeId, shadow: ShadowHook<'_>) -> String {
        let mut out = String::new();
        let raw = self.tag(id).is_some_and(is_verbatim);
        for &child in self.children(id) {
            self.write_node(child, raw, shadow, &mut out);
        }
        out
    }

    /// Markup of `id` itself.
    pub fn outer_html(&self, id: NodeId) -> String {
        self.outer_html_with(id, &|_| None)
    }

    pub fn outer_html_with(&self, id: NodeId, shadow: ShadowHook<'_>) -> String {
        let raw = self
            .parent(id)
            .and_then(|parent| self.tag(parent))
            .is_some_and(is_verbatim);
        let mut out = String::new();
        self.write_node(id, raw, shadow, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw: bool, shadow: ShadowHook<'_>, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Root => {
                for &child in self.children(id) {
                    self.write_node(child, false, shadow, out);
                }
            }
            NodeData::Text(text) if raw => out.push_str(text),
            NodeData::Text(text) => out.push_str(&encode_text(text)),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(element) => {
                write_start_tag(element, out);
                if element.is_void() {
                    return;
                }
                if let Some(shadow_html) = shadow(id) {
                    out.push_str("<template shadowrootmode=\"open\">");
                    out.push_str(&shadow_html);
                    out.push_str("</template>");
                }
                let raw = is_verbatim(&element.tag);
                for &child in self.children(id) {
                    self.write_node(child, raw, shadow, out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

fn is_verbatim(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

fn write_start_tag(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&encode_double_quoted_attribute(value));
            out.push('"');
        }
    }
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserializes_parsed_markup() {
        let html = r#"<div id="app" hidden><p class="a b">x &amp; y</p><input type="text"><!--c--></div>"#;
        assert_eq!(Document::parse(html).to_html(), html);
    }

    #[test]
    fn test_attribute_quotes_are_escaped() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.append_child(doc.root(), p).unwrap();
        doc.set_attr(p, "title", r#"say "hi""#);
        assert_eq!(doc.outer_html(p), r#"<p title="say &quot;hi&quot;"></p>"#);
    }

    #[test]
    fn test_script_is_verbatim() {
        let html = "<script>a < b && c</script>";
        assert_eq!(Document::parse(html).to_html(), html);
    }

    #[test]
    fn test_shadow_hook() {
        let doc = Document::parse("<my-card><span>light</span></my-card>");
        let host = doc.children(doc.root())[0];
        let html = doc.to_html_with(&|id| (id == host).then(|| "<b>shadow</b>".to_string()));
        assert_eq!(
            html,
            r#"<my-card><template shadowrootmode="open"><b>shadow</b></template><span>light</span></my-card>"#
        );
    }
}
