//! Node handles shared between the store and the host document.

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a node in a host document.
    ///
    /// Defined here rather than in the document crate so that values and the
    /// binding registry can refer to nodes without depending on it.
    pub struct NodeId;
}
