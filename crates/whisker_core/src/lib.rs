//! Whisker Core
//!
//! The document-independent half of the Whisker runtime:
//!
//! - **Tokenizer and rewriter**: split directive text into tokens and qualify
//!   every name as an instance field (`$this.x`) or loop variable (`$loop.x`)
//! - **Expressions**: a small parser and tree-walking interpreter for the
//!   rewritten text, with a per-instance parse cache
//! - **Reactive data**: the field store, the binding registry that tracks which
//!   nodes depend on which field, and path watchers
//!
//! # Example
//!
//! ```rust
//! use whisker_core::{rewrite, NameResolver, ExpressionCache};
//!
//! struct Fields;
//!
//! impl NameResolver for Fields {
//!     fn is_loop_local(&self, _name: &str) -> bool {
//!         false
//!     }
//!     fn is_instance_member(&self, name: &str) -> bool {
//!         name == "count"
//!     }
//! }
//!
//! let rewritten = rewrite("count + 1", &Fields);
//! assert_eq!(rewritten.text, "$this.count + 1");
//!
//! let mut cache = ExpressionCache::new();
//! let program = cache.get_or_parse(&rewritten.text).unwrap();
//! assert_eq!(program.body.len(), 1);
//! ```

pub mod ast;
pub mod cache;
pub mod error;
pub mod eval;
pub mod node;
pub mod parser;
pub mod path;
pub mod registry;
pub mod rewrite;
pub mod store;
pub mod token;
pub mod value;
pub mod watch;

pub use ast::{Expr, Program, Stmt};
pub use cache::{CacheStats, ExpressionCache};
pub use error::{EvalError, ParseError, StoreError};
pub use eval::{evaluate, evaluate_with_place, place_of, Environment, Place};
pub use node::NodeId;
pub use parser::parse;
pub use path::{DataPath, PathKey};
pub use registry::BindingRegistry;
pub use rewrite::{rewrite, NameResolver, Resolution, Rewritten, INSTANCE_ROOT, LOOP_ROOT};
pub use store::Store;
pub use token::{tokenize, Token, TokenKind, EVENT_ROOT};
pub use value::{Object, Value};
pub use watch::{WatchPattern, Watchers};
