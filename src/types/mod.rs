//! Core types for the schema kernel.

pub mod node;
pub mod link;

pub use node::{Node, NodeId, NodeKind, NodespaceId};
pub use link::{Link, LinkKey, Port, RelationPair, UnknownPort};
