//! AbstractionPolicy v1: fixed constants of schema comparison and the
//! protocol driver.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Floats are quantized to integers before hashing (×1e6, rounded to i64),
//! so `params_hash` is stable across platforms and serializer settings.

use serde::{Deserialize, Serialize};
use crate::canonical::{canonical_hash_hex, quantize_float};
use crate::DEFAULT_POLICY_VERSION;

/// Abstraction policy version 1.
///
/// ## Parameters
///
/// - `similarity_divisor`: two schemas are similar enough to abstract when
///   they share at least `(|A| + |B|) / similarity_divisor` feature names
/// - `proxy_suffix`: name suffix marking visual sensor proxies in script signatures
/// - `activation_threshold`: schema instances above this activation are protocolled
/// - `protocol_lookback`: how many protocol heads a curation pass walks back
/// - `carry_state_on_copy`: whether copies duplicate state and parameter maps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractionPolicyV1 {
    /// Policy version identifier.
    pub version: String,
    /// Divisor of the similarity threshold.
    pub similarity_divisor: u32,
    /// Suffix of sensor proxy names.
    pub proxy_suffix: String,
    /// Activation above which a schema instance counts as recognized.
    pub activation_threshold: f64,
    /// Maximum protocol heads visited per curation pass.
    pub protocol_lookback: usize,
    /// Copy state and parameters along with nodes.
    pub carry_state_on_copy: bool,
}

impl AbstractionPolicyV1 {
    /// Create a new policy with custom parameters.
    pub fn new(
        similarity_divisor: u32,
        proxy_suffix: impl Into<String>,
        activation_threshold: f64,
        protocol_lookback: usize,
        carry_state_on_copy: bool,
    ) -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            similarity_divisor: similarity_divisor.max(1),
            proxy_suffix: proxy_suffix.into(),
            activation_threshold,
            protocol_lookback,
            carry_state_on_copy,
        }
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Compute a hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&self.to_quantized())
    }

    fn to_quantized(&self) -> QuantizedPolicyParams {
        QuantizedPolicyParams {
            version: self.version.clone(),
            similarity_divisor: self.similarity_divisor,
            proxy_suffix: self.proxy_suffix.clone(),
            activation_threshold: quantize_float(self.activation_threshold),
            protocol_lookback: self.protocol_lookback,
            carry_state_on_copy: self.carry_state_on_copy,
        }
    }

    /// Create a small policy for tests: short lookback, low activation threshold.
    pub fn minimal() -> Self {
        Self {
            protocol_lookback: 5,
            activation_threshold: 0.5,
            ..Self::default()
        }
    }
}

impl Default for AbstractionPolicyV1 {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            similarity_divisor: 6,
            proxy_suffix: ".Prx".to_string(),
            activation_threshold: 0.8,
            protocol_lookback: 50,
            carry_state_on_copy: false,
        }
    }
}

/// Quantized policy parameters for deterministic hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuantizedPolicyParams {
    version: String,
    similarity_divisor: u32,
    proxy_suffix: String,
    activation_threshold: i64,
    protocol_lookback: usize,
    carry_state_on_copy: bool,
}
