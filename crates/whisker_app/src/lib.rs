//! Whisker Application Runtime
//!
//! Mounts reactive instances onto a [`Document`] by interpreting `data-*`
//! directives: `{{ }}` interpolation, `data-loop`, `data-if` chains,
//! `data-on-*` listeners, `data-value`, `data-model` and `data-ref`.
//! Writing a field re-renders exactly the nodes that read it.
//!
//! # Example
//!
//! ```rust
//! use whisker_app::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut counter = Instance::new(Options::new().data("count", 0))?;
//!     counter.mount(Document::parse(
//!         r#"<button data-ref="inc" data-on-click="count++">Clicked {{ count }}</button>"#,
//!     ))?;
//!
//!     let button = counter.ref_node("inc").unwrap();
//!     counter.click(button)?;
//!     counter.click(button)?;
//!     assert_eq!(counter.get("count"), Value::from(2));
//!     assert!(counter.to_html().contains("Clicked 2"));
//!     Ok(())
//! }
//! ```

pub mod component;
pub mod directives;
mod error;
mod instance;
mod options;
mod scope;

pub use component::{ComponentDefinition, ComponentRegistry, Constructed, Runtime};
pub use directives::event::Listener;
pub use directives::loops::{parse_loop, LoopSpec};
pub use directives::model::ModelKind;
pub use error::{EngineError, Result};
pub use instance::Instance;
pub use options::{Hook, Method, MountTarget, Options, Watcher};
pub use scope::LoopItemScope;

// Re-export the document and value types for convenience
pub use whisker_core::{DataPath, NodeId, PathKey, Value};
pub use whisker_dom::{Document, DomEvent, ListenerId};

/// Prelude module - import everything commonly needed
pub mod prelude {
    pub use crate::component::{Constructed, Runtime};
    pub use crate::error::{EngineError, Result};
    pub use crate::instance::Instance;
    pub use crate::options::Options;

    pub use whisker_core::{NodeId, Value};
    pub use whisker_dom::Document;
}
