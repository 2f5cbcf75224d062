//! Host Document
//!
//! A minimal tree-structured document the runtime renders into: element,
//! text, comment and fragment nodes, attributes, inline style, event
//! listeners, and the three structural edits the reconciler needs
//! (`replace_with`, `insert_after`, `remove`).
//!
//! Every structural edit is counted in the document's [`StatsSnapshot`],
//! which is how tests observe that an update touched exactly the nodes it
//! should have.

mod document;
mod node;

pub use document::{Document, DocumentStats, StatsSnapshot};
pub use node::{Event, EventHandler, Node, NodeId, NodeKind, NodeSnapshot};
