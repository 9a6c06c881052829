//! Error types for expression parsing, evaluation and store access.

use thiserror::Error;

/// An expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected `{found}` in expression `{expression}`")]
    Unexpected { found: String, expression: String },

    #[error("expression `{0}` ended unexpectedly")]
    UnexpectedEnd(String),

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("cannot assign to `{target}` in expression `{expression}`")]
    InvalidAssignmentTarget { target: String, expression: String },
}

/// A parsed expression failed while running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("loop variable `{0}` is not in scope")]
    UnknownLoopVariable(String),

    #[error("`{0}` is not defined")]
    NotDefined(String),

    #[error("`{0}` is not a function")]
    NotCallable(String),

    #[error("`{0}` cannot be assigned to")]
    ReadOnly(String),

    #[error("{0}")]
    Type(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A store path could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("empty data path")]
    EmptyPath,

    #[error("`{0}` does not exist")]
    MissingPath(String),

    #[error("`{path}` is a {kind}, not an object or array")]
    NotAContainer { path: String, kind: &'static str },
}
