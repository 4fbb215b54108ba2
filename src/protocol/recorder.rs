//! Scene recording.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::AbstractionPolicyV1;
use crate::store::GraphStore;
use crate::types::{NodeId, NodeKind, RelationPair};
use super::{DriverError, ProtocolContext, PROTOCOL_PREFIX, SCENE_PREFIX};

/// State key holding the snapshot time in milliseconds since the epoch.
pub const RECORDED_AT_KEY: &str = "recorded_at";

/// What one recording step did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// Protocol node holding the new snapshot.
    pub protocol_head: NodeId,
    /// The new snapshot.
    pub snapshot: NodeId,
    /// Whether a new protocol node was appended to the chain.
    pub advanced: bool,
    /// Schema instances recorded in the snapshot, in chain order. Includes
    /// imports when there was no earlier snapshot to append them to.
    pub recorded: Vec<NodeId>,
    /// Imported schemas appended to the previous snapshot.
    pub appended: Vec<NodeId>,
    /// Snapshot time.
    pub recorded_at: DateTime<Utc>,
}

/// Add `entries` to `snapshot` as children, chained after its current last entry.
fn append_entries<S: GraphStore + ?Sized>(
    store: &mut S,
    snapshot: NodeId,
    entries: &[NodeId],
) -> Result<Vec<NodeId>, DriverError> {
    let existing = store.children(snapshot);
    let mut chain: Vec<NodeId> = existing.last().copied().into_iter().collect();
    let mut appended = Vec::new();

    for &entry in entries {
        if existing.contains(&entry) || appended.contains(&entry) || !store.contains(entry) {
            continue;
        }
        store
            .link_reciprocal(snapshot, entry, RelationPair::Hierarchical)
            .map_err(DriverError::from_store)?;
        chain.push(entry);
        appended.push(entry);
    }
    store
        .link_chain(&chain, RelationPair::Sequential)
        .map_err(DriverError::from_store)?;
    Ok(appended)
}

fn create_protocol_node<S: GraphStore + ?Sized>(
    store: &mut S,
    ctx: &mut ProtocolContext,
) -> Result<NodeId, DriverError> {
    let name = format!("{PROTOCOL_PREFIX}{}", ctx.next_protocol_number());
    store
        .create_node(NodeKind::Register, ctx.nodespace, Some(&name))
        .map_err(DriverError::from_store)
}

/// Record one scene on the protocol chain.
///
/// If the current chain head already holds a snapshot, the `imported`
/// schemas are appended to that snapshot and the chain advances to a new
/// protocol node. A fresh snapshot is then hung under the head, holding
/// every candidate whose activation exceeds `policy.activation_threshold`,
/// chained `por/ret` in id order. When there is no earlier snapshot the
/// imports are recorded in the fresh one instead.
pub fn record_scene<S: GraphStore + ?Sized>(
    store: &mut S,
    ctx: &mut ProtocolContext,
    candidates: &[NodeId],
    imported: &[NodeId],
    policy: &AbstractionPolicyV1,
) -> Result<RecordOutcome, DriverError> {
    let current = ctx.chain_head().filter(|h| store.contains(*h));
    let mut advanced = false;
    let mut appended = Vec::new();
    let mut carried: &[NodeId] = imported;
    let head = match current {
        Some(head) => match store.children(head).last().copied() {
            Some(previous) => {
                appended = append_entries(store, previous, imported)?;
                carried = &[];
                let next = create_protocol_node(store, ctx)?;
                store
                    .link_reciprocal(head, next, RelationPair::Sequential)
                    .map_err(DriverError::from_store)?;
                advanced = true;
                next
            }
            None => head,
        },
        None => create_protocol_node(store, ctx)?,
    };
    ctx.set_chain_head(head);

    // Imports with no earlier snapshot to land in go into this one.
    let entries: BTreeSet<NodeId> = candidates
        .iter()
        .copied()
        .filter(|id| store.contains(*id) && store.activation(*id) > policy.activation_threshold)
        .chain(carried.iter().copied().filter(|id| store.contains(*id)))
        .collect();
    let recorded: Vec<NodeId> = entries.into_iter().collect();

    let recorded_at = Utc::now();
    let scene_name = format!("{SCENE_PREFIX}{}", ctx.protocol_count());
    let snapshot = store
        .create_node(NodeKind::Register, ctx.nodespace, Some(&scene_name))
        .map_err(DriverError::from_store)?;
    store
        .set_state(snapshot, RECORDED_AT_KEY, recorded_at.timestamp_millis() as f64)
        .map_err(DriverError::from_store)?;
    store
        .link_reciprocal(head, snapshot, RelationPair::Hierarchical)
        .map_err(DriverError::from_store)?;
    for &entry in &recorded {
        store
            .link_reciprocal(snapshot, entry, RelationPair::Hierarchical)
            .map_err(DriverError::from_store)?;
    }
    store
        .link_chain(&recorded, RelationPair::Sequential)
        .map_err(DriverError::from_store)?;

    tracing::debug!(
        protocol_head = %head,
        snapshot = %snapshot,
        advanced,
        recorded = recorded.len(),
        appended = appended.len(),
        "scene recorded"
    );

    Ok(RecordOutcome {
        protocol_head: head,
        snapshot,
        advanced,
        recorded,
        appended,
        recorded_at,
    })
}
