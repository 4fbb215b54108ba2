//! Deep copy of a schema.

use std::collections::BTreeMap;

use crate::policy::AbstractionPolicyV1;
use crate::store::GraphStore;
use crate::types::{Link, LinkKey, Node, NodeId, Port};
use super::closure::{closure, ClosureScope};
use super::SchemaError;

/// Options for [`copy_schema`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Duplicate state and parameter maps into the copies.
    pub carry_state: bool,
}

impl CopyOptions {
    /// Options as configured by a policy.
    pub fn from_policy(policy: &AbstractionPolicyV1) -> Self {
        Self {
            carry_state: policy.carry_state_on_copy,
        }
    }
}

/// Whether a link touching the closure is replayed onto the copy.
///
/// The copy of the head only takes part in the hierarchy below it: its
/// outgoing `sub` links and the `sur` links arriving from its children.
/// Sequence, category, `gen` and upward links of the head stay with the
/// original.
fn replicated(link: &Link, head: NodeId) -> bool {
    if link.source != head && link.target != head {
        return true;
    }
    (link.source == head && link.source_port == Port::Sub)
        || (link.target == head && link.target_port == Port::Sur)
}

/// Copy the schema headed by `head`.
///
/// Every member of the same-kind closure gets a fresh node with the same
/// kind, name and nodespace. Links between members are recreated between the
/// copies; links to nodes outside the closure are recreated towards the
/// original outside node. Weights and certainties are preserved.
///
/// Returns the copy of `head`, or `None` if `head` does not exist.
pub fn copy_schema<S: GraphStore + ?Sized>(
    store: &mut S,
    head: NodeId,
    options: CopyOptions,
) -> Result<Option<NodeId>, SchemaError> {
    let members = closure(store, head, ClosureScope::SameKind);
    if members.is_empty() {
        tracing::warn!(head = %head, "copy requested for unknown schema head");
        return Ok(None);
    }

    // Plan: snapshot member nodes and the distinct links touching them.
    let mut originals: Vec<Node> = Vec::with_capacity(members.len());
    let mut links: BTreeMap<LinkKey, Link> = BTreeMap::new();
    for id in members.iter() {
        let node = store.node(id).ok_or_else(|| {
            SchemaError::InvariantViolation(format!("closure member {id} vanished during copy"))
        })?;
        originals.push(node.clone());
        for link in store.links_of(id) {
            if replicated(&link, head) {
                links.insert(link.key(), link);
            }
        }
    }

    // Mutate: nodes first, then links with endpoint mapping.
    let mut mapping: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    for original in &originals {
        let copy = store
            .create_node(original.kind.clone(), original.nodespace, Some(&original.name))
            .map_err(SchemaError::from_store)?;
        if options.carry_state {
            for (key, value) in &original.state {
                store.set_state(copy, key, *value).map_err(SchemaError::from_store)?;
            }
            for (key, value) in &original.parameters {
                store
                    .set_parameter(copy, key, value.clone())
                    .map_err(SchemaError::from_store)?;
            }
        }
        mapping.insert(original.id, copy);
    }

    let map = |id: NodeId| mapping.get(&id).copied().unwrap_or(id);
    for link in links.values() {
        store
            .create_link(
                map(link.source),
                link.source_port,
                map(link.target),
                link.target_port,
                link.weight,
                link.certainty,
            )
            .map_err(SchemaError::from_store)?;
    }

    let copy_head = mapping.get(&head).copied();
    tracing::debug!(
        head = %head,
        copy = ?copy_head,
        nodes = mapping.len(),
        links = links.len(),
        "schema copied"
    );
    Ok(copy_head)
}
