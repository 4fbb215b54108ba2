//! Merging schemas into one alternative / classifier schema.

use std::collections::BTreeSet;

use crate::store::GraphStore;
use crate::types::{NodeId, Port, RelationPair};
use super::copier::{copy_schema, CopyOptions};
use super::deleter::delete_schema;
use super::SchemaError;

/// Ports stripped from a schema head before it becomes a merge slot.
const DETACHED_ON_MERGE: [Port; 5] = [Port::Gen, Port::Por, Port::Ret, Port::Cat, Port::Exp];

/// Ports stripped from spliced classifier children before chaining.
const DETACHED_ON_SPLICE: [Port; 2] = [Port::Por, Port::Ret];

/// Direct children of `head`, without a `sub` self-loop.
fn sub_field<S: GraphStore + ?Sized>(store: &S, head: NodeId) -> Vec<NodeId> {
    store.children(head).into_iter().filter(|c| *c != head).collect()
}

/// The predecessor-most node of a sub field.
///
/// That is the first child without an outgoing `ret` link. In a fully linked
/// classifier every child has one; the first child is used then.
pub fn predecessor_most<S: GraphStore + ?Sized>(store: &S, children: &[NodeId]) -> Option<NodeId> {
    children
        .iter()
        .copied()
        .find(|c| store.outgoing(*c, Port::Ret).is_empty())
        .or_else(|| children.first().copied())
}

/// Whether the children of `head` form a pure classifier: the
/// predecessor-most child has exactly as many `por` links as there are
/// children, i.e. the children are a set of alternatives rather than an
/// ordered procedure.
pub fn is_pure_classifier<S: GraphStore + ?Sized>(store: &S, head: NodeId) -> bool {
    let children = sub_field(store, head);
    match predecessor_most(store, &children) {
        Some(first) => store.outgoing(first, Port::Por).len() == children.len(),
        None => false,
    }
}

/// What happens to one input of a merge.
enum MergeRole {
    /// Children are spliced into the slot list, the head is deleted.
    Classifier(Vec<NodeId>),
    /// The head itself becomes one slot.
    Procedure,
    /// No children: contributes nothing and is left alone.
    Empty,
}

/// Merge `heads` into one combined classifier schema, modifying them.
///
/// For each input: a pure classifier contributes its children, which lose
/// their old `por/ret` mesh, and its head node is deleted; any other schema is kept whole as a single slot after
/// losing its `gen`, `por`, `ret`, `cat` and `exp` links; an input without
/// children is skipped. A new head (kind, nodespace and name of the first
/// input) is linked `sub` to every slot and the slots are chained `por/ret`
/// in order.
///
/// Returns `None` (and changes nothing) for an empty list, an unknown head,
/// or when no input contributes a slot.
pub fn merge_schemas<S: GraphStore + ?Sized>(
    store: &mut S,
    heads: &[NodeId],
) -> Result<Option<NodeId>, SchemaError> {
    let Some(&first) = heads.first() else {
        tracing::warn!("merge requested for an empty schema list");
        return Ok(None);
    };
    if let Some(missing) = heads.iter().find(|h| !store.contains(**h)) {
        tracing::warn!(head = %missing, "merge requested with unknown schema head");
        return Ok(None);
    }
    let template = match store.node(first) {
        Some(node) => node.clone(),
        None => return Ok(None),
    };

    // Plan
    let mut roles = Vec::with_capacity(heads.len());
    for &head in heads {
        let children = sub_field(store, head);
        let role = if children.is_empty() {
            MergeRole::Empty
        } else if is_pure_classifier(store, head) {
            MergeRole::Classifier(children)
        } else {
            MergeRole::Procedure
        };
        roles.push((head, role));
    }

    let mut slots: Vec<NodeId> = Vec::new();
    let mut seen: BTreeSet<NodeId> = BTreeSet::new();
    for (head, role) in &roles {
        match role {
            MergeRole::Classifier(children) => {
                for child in children {
                    if seen.insert(*child) {
                        slots.push(*child);
                    }
                }
            }
            MergeRole::Procedure => {
                if seen.insert(*head) {
                    slots.push(*head);
                }
            }
            MergeRole::Empty => {
                tracing::debug!(head = %head, "childless schema skipped in merge");
            }
        }
    }
    if slots.is_empty() {
        return Ok(None);
    }

    // Mutate
    for (head, role) in &roles {
        match role {
            MergeRole::Classifier(children) => {
                for child in children {
                    for port in DETACHED_ON_SPLICE {
                        store.detach_port(*child, port).map_err(SchemaError::from_store)?;
                    }
                }
                store.delete_node(*head).map_err(SchemaError::from_store)?;
            }
            MergeRole::Procedure => {
                for port in DETACHED_ON_MERGE {
                    store.detach_port(*head, port).map_err(SchemaError::from_store)?;
                }
            }
            MergeRole::Empty => {}
        }
    }

    let merged = store
        .create_node(template.kind, template.nodespace, Some(&template.name))
        .map_err(SchemaError::from_store)?;
    for slot in &slots {
        store
            .link_reciprocal(merged, *slot, RelationPair::Hierarchical)
            .map_err(SchemaError::from_store)?;
    }
    store
        .link_chain(&slots, RelationPair::Sequential)
        .map_err(SchemaError::from_store)?;

    tracing::debug!(merged = %merged, inputs = heads.len(), slots = slots.len(), "schemas merged");
    Ok(Some(merged))
}

/// Merge copies of `heads`, leaving the originals untouched.
///
/// Copies of childless inputs are removed again so nothing is left behind.
pub fn merge_copy<S: GraphStore + ?Sized>(
    store: &mut S,
    heads: &[NodeId],
    options: CopyOptions,
) -> Result<Option<NodeId>, SchemaError> {
    if heads.is_empty() || heads.iter().any(|h| !store.contains(*h)) {
        tracing::warn!(inputs = heads.len(), "merge_copy precondition failed");
        return Ok(None);
    }

    let mut copies = Vec::with_capacity(heads.len());
    for &head in heads {
        let copy = copy_schema(store, head, options)?.ok_or_else(|| {
            SchemaError::InvariantViolation(format!("existing head {head} produced no copy"))
        })?;
        if sub_field(store, copy).is_empty() {
            delete_schema(store, copy)?;
        } else {
            copies.push(copy);
        }
    }

    merge_schemas(store, &copies)
}
