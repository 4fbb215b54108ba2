//! Abstraction synthesis from two schemas.
//!
//! When two schemas share enough features, the shared features move into a
//! new abstraction schema. Both originals lose their direct links to the
//! shared features and gain a "nature" child that is an exemplar (`cat`) of
//! the abstraction:
//!
//! ```text
//!   A ──sub──> f1, f2            A ──sub──> f2, Nature ──cat──> Common
//!   B ──sub──> f1', f3    ==>    B ──sub──> f3, Nature ──cat──> Common
//!                                Common ──sub──> copy(f1)
//! ```

use serde::{Deserialize, Serialize};

use crate::features::{collect_features, FeatureOverlap, FeatureSet};
use crate::policy::{similar_enough, AbstractionPolicyV1};
use crate::schema::{copy_schema, CopyOptions, SchemaError};
use crate::store::GraphStore;
use crate::types::{Node, NodeId, RelationPair};

/// A feature moved into an abstraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractedFeature {
    /// Shared feature name.
    pub name: String,
    /// Copy of the representative, now a child of the abstraction.
    pub copy: NodeId,
}

/// Result of a successful abstraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abstraction {
    /// Head of the new abstraction schema.
    pub head: NodeId,
    /// Shared features in name order.
    pub features: Vec<AbstractedFeature>,
    /// Nature nodes installed under the first and second schema.
    pub natures: [NodeId; 2],
    /// Overlap of the two feature sets that led to the abstraction.
    pub overlap: FeatureOverlap,
}

/// Detach the shared features from `schema` and hang a nature node under it
/// that is an exemplar of `abstraction`.
fn install_nature<S: GraphStore + ?Sized>(
    store: &mut S,
    schema: &Node,
    features: &FeatureSet,
    common: &[String],
    abstraction: NodeId,
    abstraction_name: &str,
) -> Result<NodeId, SchemaError> {
    for name in common {
        if let Some(rep) = features.representative(name) {
            store
                .unlink_reciprocal(schema.id, rep, RelationPair::Hierarchical)
                .map_err(SchemaError::from_store)?;
        }
    }

    let nature = store
        .create_node(
            schema.kind.clone(),
            schema.nodespace,
            Some(&format!("Nature-{abstraction_name}")),
        )
        .map_err(SchemaError::from_store)?;
    store
        .link_reciprocal(schema.id, nature, RelationPair::Hierarchical)
        .map_err(SchemaError::from_store)?;
    store
        .link_reciprocal(nature, abstraction, RelationPair::Categorical)
        .map_err(SchemaError::from_store)?;
    Ok(nature)
}

/// Build the common-feature abstraction of schemas `a` and `b`.
///
/// Returns `None` without touching the graph when either head is unknown,
/// both are the same node, or they share fewer than
/// `(|features(a)| + |features(b)|) / policy.similarity_divisor` feature names.
/// Representatives of shared features are taken from `a`.
pub fn create_abstraction<S: GraphStore + ?Sized>(
    store: &mut S,
    a: NodeId,
    b: NodeId,
    policy: &AbstractionPolicyV1,
) -> Result<Option<Abstraction>, SchemaError> {
    if a == b {
        return Ok(None);
    }
    let (schema_a, schema_b) = match (store.node(a), store.node(b)) {
        (Some(na), Some(nb)) => (na.clone(), nb.clone()),
        _ => {
            tracing::warn!(a = %a, b = %b, "abstraction requested for unknown schema");
            return Ok(None);
        }
    };

    let features_a = collect_features(store, a, policy);
    let features_b = collect_features(store, b, policy);
    let common = features_a.common_names(&features_b);
    let overlap = features_a.overlap(&features_b);

    if !similar_enough(common.len(), features_a.len(), features_b.len(), policy) {
        tracing::debug!(
            a = %a,
            b = %b,
            shared = common.len(),
            features_a = features_a.len(),
            features_b = features_b.len(),
            "schemas not similar enough to abstract"
        );
        return Ok(None);
    }

    let name = format!("Common-{}-and-{}", schema_a.name, schema_b.name);
    let head = store
        .create_node(schema_a.kind.clone(), schema_a.nodespace, Some(&name))
        .map_err(SchemaError::from_store)?;

    let options = CopyOptions::from_policy(policy);
    let mut features = Vec::with_capacity(common.len());
    for feature_name in &common {
        let rep = features_a.representative(feature_name).ok_or_else(|| {
            SchemaError::InvariantViolation(format!("feature {feature_name} lost its representative"))
        })?;
        let copy = copy_schema(store, rep, options)?.ok_or_else(|| {
            SchemaError::InvariantViolation(format!("representative {rep} of {feature_name} vanished"))
        })?;
        store
            .link_reciprocal(head, copy, RelationPair::Hierarchical)
            .map_err(SchemaError::from_store)?;
        features.push(AbstractedFeature {
            name: feature_name.clone(),
            copy,
        });
    }
    let copies: Vec<NodeId> = features.iter().map(|f| f.copy).collect();
    store
        .link_chain(&copies, RelationPair::Sequential)
        .map_err(SchemaError::from_store)?;

    let nature_a = install_nature(store, &schema_a, &features_a, &common, head, &name)?;
    let nature_b = install_nature(store, &schema_b, &features_b, &common, head, &name)?;

    tracing::debug!(
        abstraction = %head,
        a = %a,
        b = %b,
        shared = features.len(),
        jaccard = overlap.jaccard,
        "abstraction created"
    );

    Ok(Some(Abstraction {
        head,
        features,
        natures: [nature_a, nature_b],
        overlap,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryGraphStore;
    use crate::types::{NodeKind, NodespaceId, Port};

    fn pipe(store: &mut InMemoryGraphStore, name: &str) -> NodeId {
        store.create_node(NodeKind::Pipe, NodespaceId::root(), Some(name)).unwrap()
    }

    fn proxy(store: &mut InMemoryGraphStore, datasource: &str) -> NodeId {
        let p = pipe(store, &format!("{datasource}.Prx"));
        let s = store
            .create_node(NodeKind::sensor(datasource), NodespaceId::root(), Some(datasource))
            .unwrap();
        store.link_reciprocal(p, s, RelationPair::Hierarchical).unwrap();
        p
    }

    fn schema(store: &mut InMemoryGraphStore, name: &str, sources: &[&str]) -> NodeId {
        let head = pipe(store, name);
        for source in sources {
            let p = proxy(store, source);
            store.link_reciprocal(head, p, RelationPair::Hierarchical).unwrap();
        }
        head
    }

    #[test]
    fn test_abstraction_names() {
        let mut store = InMemoryGraphStore::new();
        let a = schema(&mut store, "A", &["foo", "bar"]);
        let b = schema(&mut store, "B", &["foo", "baz"]);

        let abstraction = create_abstraction(&mut store, a, b, &AbstractionPolicyV1::default())
            .unwrap()
            .unwrap();

        assert_eq!(store.node(abstraction.head).unwrap().name, "Common-A-and-B");
        let nature = store.node(abstraction.natures[0]).unwrap();
        assert_eq!(nature.name, "Nature-Common-A-and-B");
        assert_eq!(store.category_targets(abstraction.natures[1]), vec![abstraction.head]);
        assert_eq!(abstraction.overlap.shared, 1);
    }

    #[test]
    fn test_below_threshold_is_noop() {
        let mut store = InMemoryGraphStore::new();
        let a = schema(&mut store, "A", &["s1", "s2", "s3", "s4", "s5", "s6", "x"]);
        let b = schema(&mut store, "B", &["t1", "t2", "t3", "t4", "t5", "t6", "x"]);
        let before = store.fingerprint();

        // 1 shared < (7 + 7) / 6
        let result = create_abstraction(&mut store, a, b, &AbstractionPolicyV1::default()).unwrap();
        assert!(result.is_none());
        assert_eq!(before, store.fingerprint());
    }

    #[test]
    fn test_same_schema_rejected() {
        let mut store = InMemoryGraphStore::new();
        let a = schema(&mut store, "A", &["foo"]);
        assert!(create_abstraction(&mut store, a, a, &AbstractionPolicyV1::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_shared_features_chained() {
        let mut store = InMemoryGraphStore::new();
        let a = schema(&mut store, "A", &["foo", "bar", "qux"]);
        let b = schema(&mut store, "B", &["foo", "bar"]);

        let abstraction = create_abstraction(&mut store, a, b, &AbstractionPolicyV1::default())
            .unwrap()
            .unwrap();

        let names: Vec<&str> = abstraction.features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["sns-bar", "sns-foo"]);
        let first = abstraction.features[0].copy;
        let second = abstraction.features[1].copy;
        assert_eq!(store.outgoing(first, Port::Por)[0].target, second);
        assert!(store.reciprocity_violations().is_empty());
    }
}
