//! Document errors

use thiserror::Error;
use whisker_core::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    MissingNode(NodeId),

    #[error("node {0:?} has no parent")]
    Detached(NodeId),

    #[error("cannot insert node {0:?} into its own subtree")]
    Cycle(NodeId),

    #[error("the document root cannot be moved")]
    RootMove,

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}
