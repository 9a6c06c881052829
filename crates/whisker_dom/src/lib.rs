//! Whisker DOM
//!
//! A small in-memory document the Whisker runtime mounts onto:
//!
//! - **Tree**: an arena of element, text and comment nodes addressed by
//!   [`NodeId`], with the insertion, removal and cloning operations directives
//!   need
//! - **Parsing**: a tolerant HTML parser built on nom
//! - **Serialization**: escaped HTML output with optional declarative shadow roots
//! - **Selectors**: `query_selector` over type, id, class and attribute selectors
//! - **Events**: listeners keyed by node and event type, with bubbling routes
//!
//! # Example
//!
//! ```rust
//! use whisker_dom::Document;
//!
//! let mut doc = Document::parse(r#"<div id="app"><p>Hello</p></div>"#);
//! let p = doc.query_selector(doc.root(), "#app p").unwrap().unwrap();
//! let text = doc.children(p)[0];
//! doc.set_text(text, "Bye & go");
//! assert_eq!(doc.to_html(), r#"<div id="app"><p>Bye &amp; go</p></div>"#);
//! ```

pub mod element;
pub mod error;
pub mod events;
pub mod parser;
pub mod selector;
pub mod serialize;
pub mod tree;

pub use element::{is_raw_text, is_void, Element, Node, NodeData};
pub use error::DomError;
pub use events::{DomEvent, EventDispatcher, ListenerId};
pub use selector::Selector;
pub use serialize::ShadowHook;
pub use tree::Document;
pub use whisker_core::NodeId;
