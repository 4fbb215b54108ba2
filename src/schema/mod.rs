//! Structural schema operations.
//!
//! A schema is not stored anywhere: it is the set of nodes reachable from a
//! head through `sub` links ([`closure`]). The operations here copy, merge
//! and delete such sets while keeping every hierarchical, sequential and
//! categorical relation paired with its reciprocal.
//!
//! ## Outcomes
//!
//! - Structural preconditions that do not hold (unknown head, empty input,
//!   nothing to merge) yield `Ok(None)` or a zero count; callers treat that as
//!   "nothing to do".
//! - Store failures and broken invariants yield [`SchemaError`] and nothing
//!   further should be attempted on the graph during that tick.
//!
//! Every operation plans against the current graph first and only then
//! mutates, so a rejected precondition leaves the store untouched.

pub mod closure;
pub mod copier;
pub mod merger;
pub mod deleter;

pub use closure::{closure, Closure, ClosureScope};
pub use copier::{copy_schema, CopyOptions};
pub use merger::{is_pure_classifier, merge_copy, merge_schemas, predecessor_most};
pub use deleter::delete_schema;

/// Error type for schema operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The store rejected a mutation.
    #[error("Store error: {0}")]
    StoreError(String),
    /// The graph is not in the shape the engine guarantees.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl SchemaError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::StoreError(e.to_string())
    }
}
