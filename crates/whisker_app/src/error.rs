//! Engine errors

use thiserror::Error;
use whisker_core::{EvalError, ParseError, StoreError};
use whisker_dom::DomError;

/// Errors raised while mounting, rendering or handling events
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Document edit or selector failure
    #[error(transparent)]
    Dom(#[from] DomError),

    /// Expression text could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Expression evaluation failed
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Write to a path the store cannot hold
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Mount selector or node is not in the document
    #[error("mount target `{0}` was not found in the document")]
    MountTargetNotFound(String),

    /// Operation needs a mounted document
    #[error("the instance is not mounted")]
    NotMounted,

    /// `data-loop` is not `item in collection` or `(item, index) in collection`
    #[error("invalid data-loop expression `{0}`, expected `item in collection`")]
    LoopSyntax(String),

    /// Model or assignment target is not a writable place
    #[error("`{0}` cannot be assigned to")]
    NotAssignable(String),

    /// `push` on a path that does not hold an array
    #[error("`{0}` is not an array")]
    NotAnArray(String),

    /// Call to a method the instance does not define
    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    /// Component options lack a name or template
    #[error("component definition is missing a {0}")]
    InvalidComponent(&'static str),

    /// Failure reported by a user method, watcher or hook.
    #[error("{0}")]
    Method(String),
}

impl EngineError {
    pub fn method(message: impl Into<String>) -> Self {
        EngineError::Method(message.into())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
