//! Feature classification of schema nodes.
//!
//! A feature is a named sub-part of a schema used to compare schemas. Nodes
//! are classified in priority order, first match wins:
//!
//! 1. **Category reference**: no children and exactly one `cat` link:
//!    "inherit everything of that category" → `exp-<category id>`
//! 2. **Sensor proxy**: exactly one child and it is a sensor → `sns-<datasource>`
//! 3. **Script**: several children with a unique predecessor-most child →
//!    `scp-<sorted proxy names below it>`
//!
//! Nodes matching none of these are searched recursively; features are
//! opaque and never searched themselves. The names are equality keys only.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::canonical::canonical_hash_hex;
use crate::policy::AbstractionPolicyV1;
use crate::store::GraphStore;
use crate::types::{NodeId, Port};

/// Kind of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Exemplar of a single category.
    CategoryReference,
    /// Direct stand-in for a sensor.
    SensorProxy,
    /// Ordered procedure.
    Script,
}

impl FeatureKind {
    /// Prefix of feature names of this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::CategoryReference => "exp-",
            Self::SensorProxy => "sns-",
            Self::Script => "scp-",
        }
    }
}

/// A classified schema node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name (equality key).
    pub name: String,
    /// Feature kind.
    pub kind: FeatureKind,
    /// Representative node.
    pub node: NodeId,
}

impl Feature {
    fn new(kind: FeatureKind, signature: &str, node: NodeId) -> Self {
        Self {
            name: format!("{}{}", kind.prefix(), signature),
            kind,
            node,
        }
    }
}

/// Overlap between two feature sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureOverlap {
    /// Number of shared feature names.
    pub shared: usize,
    /// Jaccard similarity: |A ∩ B| / |A ∪ B|.
    pub jaccard: f64,
}

/// Feature names of a schema with one representative node per name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    features: BTreeMap<String, Feature>,
}

impl FeatureSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature; the first representative of a name is kept.
    pub fn insert(&mut self, feature: Feature) {
        self.features.entry(feature.name.clone()).or_insert(feature);
    }

    /// Feature names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.features.keys().map(String::as_str)
    }

    /// Features in name order.
    pub fn features(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.features.values()
    }

    /// Whether a feature with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Representative node of a feature name.
    pub fn representative(&self, name: &str) -> Option<NodeId> {
        self.features.get(name).map(|f| f.node)
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether there are no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Names present in both sets, sorted.
    pub fn common_names(&self, other: &FeatureSet) -> Vec<String> {
        self.features
            .keys()
            .filter(|name| other.features.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Overlap with another set.
    pub fn overlap(&self, other: &FeatureSet) -> FeatureOverlap {
        let shared = self.common_names(other).len();
        let union = self.len() + other.len() - shared;
        let jaccard = if union == 0 { 0.0 } else { shared as f64 / union as f64 };
        FeatureOverlap { shared, jaccard }
    }

    /// Whether every name of `other` is here and this set has more.
    pub fn is_strict_superset_of(&self, other: &FeatureSet) -> bool {
        self.len() > other.len() && other.names().all(|name| self.contains(name))
    }

    /// Canonical hash of the name set.
    pub fn fingerprint(&self) -> String {
        let names: Vec<&str> = self.names().collect();
        canonical_hash_hex(&names)
    }
}

/// Names of sensor proxies (nodes named with `suffix`) at or below `node`.
pub fn collect_proxy_names<S: GraphStore + ?Sized>(store: &S, node: NodeId, suffix: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut visited = BTreeSet::new();
    let mut stack = vec![node];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        if let Some(n) = store.node(current) {
            if n.name.ends_with(suffix) {
                names.insert(n.name.clone());
            }
        }
        stack.extend(store.children(current).into_iter().filter(|c| *c != current));
    }

    names
}

/// Classify a single node, without looking further down.
pub fn classify_node<S: GraphStore + ?Sized>(
    store: &S,
    node: NodeId,
    policy: &AbstractionPolicyV1,
) -> Option<Feature> {
    let children: Vec<NodeId> = store.children(node).into_iter().filter(|c| *c != node).collect();

    match children.len() {
        0 => {
            let categories = store.category_targets(node);
            if categories.len() == 1 {
                return Some(Feature::new(
                    FeatureKind::CategoryReference,
                    &categories[0].as_u64().to_string(),
                    node,
                ));
            }
            None
        }
        1 => {
            let datasource = store.node(children[0])?.kind.datasource()?;
            Some(Feature::new(FeatureKind::SensorProxy, datasource, node))
        }
        _ => {
            let leftmost = children
                .iter()
                .filter(|c| store.outgoing(**c, Port::Ret).is_empty())
                .count();
            if leftmost != 1 {
                return None;
            }
            // Sorted, so the signature does not depend on link order.
            let signature: String = collect_proxy_names(store, node, &policy.proxy_suffix)
                .into_iter()
                .collect();
            Some(Feature::new(FeatureKind::Script, &signature, node))
        }
    }
}

/// Pre-order walk from `head`, stopping below every classified node.
fn collect_into<S: GraphStore + ?Sized>(
    store: &S,
    head: NodeId,
    policy: &AbstractionPolicyV1,
    out: &mut FeatureSet,
) {
    let mut visited = BTreeSet::new();
    let mut stack = vec![head];

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        if let Some(feature) = classify_node(store, node, policy) {
            tracing::trace!(node = %node, feature = %feature.name, "feature classified");
            out.insert(feature);
            continue;
        }
        // Reversed so the first child is expanded first.
        stack.extend(store.children(node).into_iter().rev().filter(|c| *c != node));
    }
}

/// Collect all features of the schema headed by `head`.
pub fn collect_features<S: GraphStore + ?Sized>(
    store: &S,
    head: NodeId,
    policy: &AbstractionPolicyV1,
) -> FeatureSet {
    let mut out = FeatureSet::new();
    if !store.contains(head) {
        return out;
    }
    collect_into(store, head, policy, &mut out);
    out
}
