//! Abstraction curation over recent protocol history.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::abstraction::{create_abstraction, Abstraction};
use crate::features::{collect_features, FeatureSet};
use crate::policy::AbstractionPolicyV1;
use crate::schema::delete_schema;
use crate::store::GraphStore;
use crate::types::{NodeId, Port};
use super::{DriverError, ProtocolContext};

/// What one curation pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurationReport {
    /// Protocol nodes visited, newest first.
    pub visited: Vec<NodeId>,
    /// Imported schemas deleted as redundant.
    pub pruned: Vec<NodeId>,
    /// Imported schemas considered for abstraction, in discovery order.
    pub candidates: Vec<NodeId>,
    /// Abstractions created.
    pub abstractions: Vec<Abstraction>,
}

/// Protocol nodes from `head` backwards along `ret`, at most `limit` of them.
fn walk_back<S: GraphStore + ?Sized>(store: &S, head: NodeId, limit: usize) -> Vec<NodeId> {
    let mut visited = Vec::new();
    let mut seen = BTreeSet::new();
    let mut current = Some(head);

    while let Some(node) = current {
        if visited.len() >= limit || !seen.insert(node) {
            break;
        }
        visited.push(node);
        current = store.outgoing(node, Port::Ret).first().map(|l| l.target);
    }
    visited
}

/// A schema is recognized once it or one of its direct children is an
/// exemplar of a known abstraction. Ordinary categories do not count.
fn is_recognized<S: GraphStore + ?Sized>(store: &S, ctx: &ProtocolContext, schema: NodeId) -> bool {
    let exemplifies = |node: NodeId| {
        store
            .category_targets(node)
            .into_iter()
            .any(|c| ctx.is_abstraction(c))
    };
    exemplifies(schema)
        || store
            .children(schema)
            .into_iter()
            .any(|c| c != schema && exemplifies(c))
}

/// Features of a recognized schema, including those of the known
/// abstractions it refers to.
fn effective_features<S: GraphStore + ?Sized>(
    store: &S,
    ctx: &ProtocolContext,
    schema: NodeId,
    policy: &AbstractionPolicyV1,
) -> FeatureSet {
    let mut features = collect_features(store, schema, policy);
    let inherited: Vec<NodeId> = features
        .features()
        .flat_map(|f| store.category_targets(f.node))
        .filter(|c| ctx.is_abstraction(*c))
        .collect();
    for category in inherited {
        for feature in collect_features(store, category, policy).features() {
            features.insert(feature.clone());
        }
    }
    features
}

/// Curate the last `policy.protocol_lookback` protocol nodes.
///
/// Every schema referenced by a visited snapshot is either recognized (a
/// `cat` exemplar of a known abstraction) or freshly imported. An imported schema whose features are a strict subset of a
/// recognized schema's features is deleted. The remaining imports are
/// abstracted pairwise.
pub fn curate<S: GraphStore + ?Sized>(
    store: &mut S,
    ctx: &mut ProtocolContext,
    policy: &AbstractionPolicyV1,
) -> Result<CurationReport, DriverError> {
    let mut report = CurationReport::default();
    let Some(head) = ctx.chain_head().filter(|h| store.contains(*h)) else {
        tracing::debug!("no protocol chain to curate");
        return Ok(report);
    };

    report.visited = walk_back(store, head, policy.protocol_lookback);

    let mut pruned: BTreeSet<NodeId> = BTreeSet::new();
    let mut seen: BTreeSet<NodeId> = BTreeSet::new();
    let mut recognized_features: BTreeMap<NodeId, FeatureSet> = BTreeMap::new();

    for protocol in report.visited.clone() {
        for snapshot in store.children(protocol) {
            let entries: Vec<NodeId> = store
                .children(snapshot)
                .into_iter()
                .filter(|e| store.contains(*e) && !pruned.contains(e))
                .collect();
            let (recognized, imported): (Vec<NodeId>, Vec<NodeId>) =
                entries.into_iter().partition(|e| is_recognized(store, ctx, *e));

            for id in &recognized {
                if !recognized_features.contains_key(id) {
                    let features = effective_features(store, ctx, *id, policy);
                    recognized_features.insert(*id, features);
                }
            }

            for id in imported {
                if !seen.insert(id) {
                    continue;
                }
                let features = collect_features(store, id, policy);
                let redundant = recognized.iter().any(|r| {
                    recognized_features
                        .get(r)
                        .map_or(false, |known| known.is_strict_superset_of(&features))
                });
                if redundant {
                    let deleted = delete_schema(store, id)?;
                    tracing::debug!(schema = %id, deleted, "redundant import pruned");
                    pruned.insert(id);
                    report.pruned.push(id);
                } else {
                    report.candidates.push(id);
                }
            }
        }
    }

    let candidates = report.candidates.clone();
    for (i, &a) in candidates.iter().enumerate() {
        for &b in &candidates[i + 1..] {
            if !store.contains(a) || !store.contains(b) {
                continue;
            }
            if let Some(abstraction) = create_abstraction(store, a, b, policy)? {
                ctx.add_abstraction(abstraction.head);
                report.abstractions.push(abstraction);
            }
        }
    }

    tracing::debug!(
        visited = report.visited.len(),
        pruned = report.pruned.len(),
        candidates = report.candidates.len(),
        abstractions = report.abstractions.len(),
        "curation finished"
    );
    Ok(report)
}
