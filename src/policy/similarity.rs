//! Similarity judgement between two feature sets.

use super::v1::AbstractionPolicyV1;

/// Minimum number of shared feature names for two schemas with
/// `count_a` and `count_b` features to be abstracted.
///
/// Formula:
/// ```text
/// required = (count_a + count_b) / similarity_divisor
/// ```
/// With the default divisor of 6 this asks for a third of the average
/// schema size.
pub fn required_shared(count_a: usize, count_b: usize, policy: &AbstractionPolicyV1) -> f64 {
    (count_a + count_b) as f64 / policy.similarity_divisor.max(1) as f64
}

/// Whether `shared` common features are enough to abstract.
///
/// Zero shared features never qualify, whatever the set sizes.
pub fn similar_enough(shared: usize, count_a: usize, count_b: usize, policy: &AbstractionPolicyV1) -> bool {
    shared > 0 && shared as f64 >= required_shared(count_a, count_b, policy)
}
