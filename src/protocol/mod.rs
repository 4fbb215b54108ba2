//! Protocol recording and abstraction curation.
//!
//! The protocol is a `por/ret` chain of register nodes. Each protocol node
//! holds scene snapshots (register nodes) whose children are the schema
//! instances that were active, or were imported, during that tick:
//!
//! ```text
//! Protocol-1 ──por──> Protocol-2 ──por──> Protocol-3   (chain head)
//!     │                   │                   │
//!    sub                 sub                 sub
//!     ▼                   ▼                   ▼
//!  Scene-1             Scene-2             Scene-3
//!   ├─ s1 ─por─> s2     ├─ s4               └─ ...
//! ```
//!
//! Recording appends to this chain ([`record_scene`]); curation walks back
//! along it, prunes redundant imports and abstracts the remaining ones
//! ([`curate`]). [`ProtocolDriver`] runs both against a shared store under
//! one lock.

pub mod context;
pub mod recorder;
pub mod curator;
pub mod driver;

pub use context::ProtocolContext;
pub use recorder::{record_scene, RecordOutcome};
pub use curator::{curate, CurationReport};
pub use driver::{ProtocolDriver, SharedGraph};

use crate::schema::SchemaError;

/// Name prefix of protocol chain nodes.
pub const PROTOCOL_PREFIX: &str = "Protocol-";

/// Name prefix of scene snapshot nodes.
pub const SCENE_PREFIX: &str = "Scene-";

/// Name prefix of abstraction heads.
pub const ABSTRACTION_PREFIX: &str = "Common-";

/// Error type for protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A schema operation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The store rejected a mutation.
    #[error("Store error: {0}")]
    StoreError(String),

    /// Links were left without their reciprocal after an operation.
    #[error("Invariant violation after {operation}: {count} unpaired links, first: {first}")]
    InvariantViolation {
        /// Operation that ran before the check.
        operation: &'static str,
        /// Number of unpaired links.
        count: usize,
        /// The first unpaired link.
        first: String,
    },
}

impl DriverError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::StoreError(e.to_string())
    }
}
