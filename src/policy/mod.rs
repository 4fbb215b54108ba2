//! Abstraction policy definitions.

pub mod v1;
pub mod similarity;

pub use v1::AbstractionPolicyV1;
pub use similarity::{required_shared, similar_enough};
