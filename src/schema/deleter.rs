//! Recursive schema teardown.

use std::collections::BTreeSet;

use crate::store::GraphStore;
use crate::types::{NodeId, NodeKind};
use super::SchemaError;

/// Same-kind closure of `head` in post-order, each node once.
fn collect_post_order<S: GraphStore + ?Sized>(store: &S, head: NodeId, head_kind: &NodeKind) -> Vec<NodeId> {
    let mut visited = BTreeSet::new();
    let mut out = Vec::new();
    let mut stack = vec![(head, false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            out.push(node);
            continue;
        }
        if !visited.insert(node) {
            continue;
        }
        stack.push((node, true));
        let children = store.children(node);
        for &child in children.iter().rev() {
            if child == node {
                continue; // looping proxy
            }
            let same_kind = store
                .node(child)
                .map_or(false, |n| n.kind.same_kind(head_kind));
            if same_kind && !visited.contains(&child) {
                stack.push((child, false));
            }
        }
    }
    out
}

/// Delete the schema headed by `head`, children before parents, head last.
///
/// Walks the same-kind closure, so sensors and other leaves referenced by the
/// schema survive. Each node is deleted once. Returns the number of deleted
/// nodes; an unknown head deletes nothing.
pub fn delete_schema<S: GraphStore + ?Sized>(store: &mut S, head: NodeId) -> Result<usize, SchemaError> {
    let head_kind = match store.node(head) {
        Some(node) => node.kind.clone(),
        None => return Ok(0),
    };

    let doomed = collect_post_order(store, head, &head_kind);

    let mut deleted = 0;
    for id in &doomed {
        if store.delete_node(*id).map_err(SchemaError::from_store)? {
            deleted += 1;
        }
    }

    tracing::debug!(head = %head, deleted, "schema deleted");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryGraphStore;
    use crate::types::{NodespaceId, Port, RelationPair};

    fn pipe(store: &mut InMemoryGraphStore, name: &str) -> NodeId {
        store.create_node(NodeKind::Pipe, NodespaceId::root(), Some(name)).unwrap()
    }

    #[test]
    fn test_delete_whole_schema() {
        let mut store = InMemoryGraphStore::new();
        let h = pipe(&mut store, "h");
        let a = pipe(&mut store, "a");
        let b = pipe(&mut store, "b");
        let shared = pipe(&mut store, "shared");
        store.link_reciprocal(h, a, RelationPair::Hierarchical).unwrap();
        store.link_reciprocal(h, b, RelationPair::Hierarchical).unwrap();
        store.link_reciprocal(a, shared, RelationPair::Hierarchical).unwrap();
        store.link_reciprocal(b, shared, RelationPair::Hierarchical).unwrap();
        store.create_link(shared, Port::Sub, shared, Port::Sub, 1.0, 1.0).unwrap();

        assert_eq!(delete_schema(&mut store, h).unwrap(), 4);
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.link_count(), 0);
    }

    #[test]
    fn test_delete_keeps_sensors() {
        let mut store = InMemoryGraphStore::new();
        let h = pipe(&mut store, "h");
        let sensor = store
            .create_node(NodeKind::sensor("red"), NodespaceId::root(), None)
            .unwrap();
        store.link_reciprocal(h, sensor, RelationPair::Hierarchical).unwrap();

        assert_eq!(delete_schema(&mut store, h).unwrap(), 1);
        assert!(store.contains(sensor));
        assert!(store.links_of(sensor).is_empty());
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let mut store = InMemoryGraphStore::new();
        assert_eq!(delete_schema(&mut store, NodeId(3)).unwrap(), 0);
    }

    #[test]
    fn test_delete_deep_chain() {
        let mut store = InMemoryGraphStore::new();
        let head = pipe(&mut store, "head");
        let mut parent = head;
        for i in 0..20_000 {
            let child = pipe(&mut store, &format!("n{i}"));
            store.link_reciprocal(parent, child, RelationPair::Hierarchical).unwrap();
            parent = child;
        }

        assert_eq!(delete_schema(&mut store, head).unwrap(), 20_001);
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn test_post_order_puts_children_first() {
        let mut store = InMemoryGraphStore::new();
        let h = pipe(&mut store, "h");
        let a = pipe(&mut store, "a");
        let b = pipe(&mut store, "b");
        let leaf = pipe(&mut store, "leaf");
        store.link_reciprocal(h, a, RelationPair::Hierarchical).unwrap();
        store.link_reciprocal(h, b, RelationPair::Hierarchical).unwrap();
        store.link_reciprocal(a, leaf, RelationPair::Hierarchical).unwrap();
        store.link_reciprocal(b, leaf, RelationPair::Hierarchical).unwrap();

        assert_eq!(collect_post_order(&store, h, &NodeKind::Pipe), vec![leaf, a, b, h]);
    }
}
