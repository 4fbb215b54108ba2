//! Relational closure: the node set of a schema.

use std::collections::BTreeSet;

use crate::store::GraphStore;
use crate::types::NodeId;

/// Which `sub` targets a closure walks into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureScope {
    /// Only nodes of the head's kind; sensors and other leaves stop the walk.
    SameKind,
    /// Every `sub` target.
    Any,
}

/// Nodes reachable from a head via `sub` links.
///
/// Keeps discovery order (depth-first, pre-order, head first) next to the
/// membership set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    head: NodeId,
    order: Vec<NodeId>,
    members: BTreeSet<NodeId>,
}

impl Closure {
    /// The head this closure was computed from.
    pub fn head(&self) -> NodeId {
        self.head
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.members.contains(id)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the closure is empty (unknown head).
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Members in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Membership set.
    pub fn members(&self) -> &BTreeSet<NodeId> {
        &self.members
    }
}

/// Compute the closure of `head`.
///
/// Each node is added at most once; a `sub` link from a node to itself is
/// never followed. An unknown head yields an empty closure.
pub fn closure<S: GraphStore + ?Sized>(store: &S, head: NodeId, scope: ClosureScope) -> Closure {
    let mut order = Vec::new();
    let mut members = BTreeSet::new();

    let head_kind = match store.node(head) {
        Some(node) => node.kind.clone(),
        None => {
            return Closure {
                head,
                order,
                members,
            }
        }
    };

    let mut stack = vec![head];
    while let Some(current) = stack.pop() {
        if !members.insert(current) {
            continue;
        }
        order.push(current);

        // Reverse so the first child is expanded first.
        for child in store.children(current).into_iter().rev() {
            if child == current || members.contains(&child) {
                continue;
            }
            if scope == ClosureScope::SameKind {
                match store.node(child) {
                    Some(node) if node.kind.same_kind(&head_kind) => {}
                    _ => continue,
                }
            }
            stack.push(child);
        }
    }

    tracing::trace!(head = %head, members = order.len(), "closure computed");

    Closure {
        head,
        order,
        members,
    }
}
