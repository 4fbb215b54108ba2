//! # schema-kernel
//!
//! Schema graph engine for spreading-activation node nets.
//!
//! A schema is a node (its head) plus everything reachable from it through
//! hierarchical `sub` links. The kernel answers structural questions about
//! such schemas and rewrites them:
//!
//! > Which nodes belong to this schema, and what do two schemas have in common?
//!
//! ## Core Contract
//!
//! 1. Compute the relational closure of a head ([`schema::closure`])
//! 2. Copy, merge and delete whole schemas, keeping every relation paired with
//!    its reciprocal ([`schema`])
//! 3. Classify schema parts into named features ([`features`]) and move shared
//!    features into a new abstraction ([`abstraction`])
//! 4. Record active schemas on a protocol chain and curate abstractions over
//!    recent history ([`protocol`])
//!
//! ## Architecture
//!
//! ```text
//! GraphStore ← Closure ← Copier ← Merger
//!     ↑          ↑         ↑
//!     │       Deleter   Features ← Abstraction ← Protocol driver
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Node ids are allocated monotonically and never reused
//! - Store queries return links ordered by `(source, port, target, port)`
//! - Same graph + same policy + same calls → identical resulting graph
//!   (see [`store::InMemoryGraphStore::fingerprint`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod policy;
pub mod store;
pub mod schema;
pub mod features;
pub mod abstraction;
pub mod protocol;
pub mod canonical;

// Re-exports
pub use types::{Link, LinkKey, Node, NodeId, NodeKind, NodespaceId, Port, RelationPair, UnknownPort};
pub use policy::{required_shared, similar_enough, AbstractionPolicyV1};
pub use store::{GraphStore, InMemoryGraphStore};
pub use store::memory::InMemoryError;
pub use schema::{
    closure, copy_schema, delete_schema, is_pure_classifier, merge_copy, merge_schemas,
    predecessor_most, Closure, ClosureScope, CopyOptions, SchemaError,
};
pub use features::{collect_features, Feature, FeatureKind, FeatureOverlap, FeatureSet};
pub use abstraction::{create_abstraction, AbstractedFeature, Abstraction};
pub use protocol::{
    curate, record_scene, CurationReport, DriverError, ProtocolContext, ProtocolDriver,
    RecordOutcome, SharedGraph,
};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};

/// Schema version for all kernel types.
/// Increment on breaking changes to any serialized type.
pub const SCHEMA_KERNEL_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "abstraction_policy_v1";
