//! Integration tests for the schema engine.
//!
//! These tests validate the structural operations end to end:
//! 1. Closure termination on cyclic structures
//! 2. Copy isolation and the head exception
//! 3. Delete completeness
//! 4. Merge slot accounting
//! 5. Feature classification
//! 6. Abstraction threshold and rewrite

use std::collections::BTreeSet;

use proptest::prelude::*;
use schema_kernel::{
    closure, collect_features, copy_schema, create_abstraction, delete_schema, merge_copy,
    merge_schemas, AbstractionPolicyV1, ClosureScope, CopyOptions, GraphStore,
    InMemoryGraphStore, NodeId, NodeKind, NodespaceId, Port, RelationPair,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn pipe(store: &mut InMemoryGraphStore, name: &str) -> NodeId {
    store.create_node(NodeKind::Pipe, NodespaceId::root(), Some(name)).unwrap()
}

/// A `<datasource>.Prx` proxy with its sensor below it.
fn sensor_proxy(store: &mut InMemoryGraphStore, datasource: &str) -> NodeId {
    let proxy = pipe(store, &format!("{datasource}.Prx"));
    let sensor = store
        .create_node(NodeKind::sensor(datasource), NodespaceId::root(), Some(datasource))
        .unwrap();
    store.link_reciprocal(proxy, sensor, RelationPair::Hierarchical).unwrap();
    proxy
}

/// Schema `name` with one sensor proxy child per datasource.
fn feature_schema(store: &mut InMemoryGraphStore, name: &str, sources: &[&str]) -> (NodeId, Vec<NodeId>) {
    let head = pipe(store, name);
    let proxies: Vec<NodeId> = sources.iter().map(|s| sensor_proxy(store, s)).collect();
    for proxy in &proxies {
        store.link_reciprocal(head, *proxy, RelationPair::Hierarchical).unwrap();
    }
    (head, proxies)
}

fn with_children(store: &mut InMemoryGraphStore, name: &str, n: usize) -> (NodeId, Vec<NodeId>) {
    let head = pipe(store, name);
    let children: Vec<NodeId> = (0..n).map(|i| pipe(store, &format!("{name}.{i}"))).collect();
    for child in &children {
        store.link_reciprocal(head, *child, RelationPair::Hierarchical).unwrap();
    }
    (head, children)
}

// ─────────────────────────────────────────────────────────────────────────────
// Closure
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_closure_terminates_on_self_loop_and_cycle() {
    let mut store = InMemoryGraphStore::new();
    let (head, children) = with_children(&mut store, "h", 2);
    store.create_link(children[0], Port::Sub, children[0], Port::Sub, 1.0, 1.0).unwrap();
    store.link_reciprocal(children[1], head, RelationPair::Hierarchical).unwrap();

    let members = closure(&store, head, ClosureScope::SameKind);

    assert_eq!(members.len(), 3);
    let ids: Vec<NodeId> = members.iter().collect();
    let unique: BTreeSet<NodeId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(unique, BTreeSet::from([head, children[0], children[1]]));
}

proptest! {
    #[test]
    fn prop_delete_leaves_no_dangling_links(
        edges in proptest::collection::vec((0usize..12, 0usize..12), 0..40),
        head in 0usize..12,
    ) {
        let mut store = InMemoryGraphStore::new();
        let nodes: Vec<NodeId> = (0..12).map(|i| pipe(&mut store, &format!("n{i}"))).collect();
        for (a, b) in edges {
            if a == b {
                store.create_link(nodes[a], Port::Sub, nodes[a], Port::Sub, 1.0, 1.0).unwrap();
            } else {
                store.link_reciprocal(nodes[a], nodes[b], RelationPair::Hierarchical).unwrap();
            }
        }

        let members = closure(&store, nodes[head], ClosureScope::SameKind);
        let deleted = delete_schema(&mut store, nodes[head]).unwrap();

        prop_assert_eq!(deleted, members.len());
        for id in members.iter() {
            prop_assert!(!store.contains(id));
        }
        for link in store.all_links() {
            prop_assert!(store.contains(link.source) && store.contains(link.target));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Copier
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_copy_isolation() {
    let mut store = InMemoryGraphStore::new();
    let head = pipe(&mut store, "h");
    let x = pipe(&mut store, "x");
    let y = pipe(&mut store, "y");
    let sensor = store.create_node(NodeKind::sensor("red"), NodespaceId::root(), None).unwrap();
    store
        .link_reciprocal_weighted(head, x, RelationPair::Hierarchical, 0.5, 0.7)
        .unwrap();
    store.link_reciprocal(head, y, RelationPair::Hierarchical).unwrap();
    store
        .link_reciprocal_weighted(x, y, RelationPair::Sequential, 0.25, 0.9)
        .unwrap();
    store.link_reciprocal(y, sensor, RelationPair::Hierarchical).unwrap();
    let nodes_before = store.node_count();

    let copy = copy_schema(&mut store, head, CopyOptions::default()).unwrap().unwrap();

    assert_eq!(store.node_count(), nodes_before + 3);
    let copy_children = store.children(copy);
    assert_eq!(copy_children.len(), 2);
    assert!(!copy_children.contains(&x) && !copy_children.contains(&y));

    let to_x = &store.outgoing(copy, Port::Sub)[0];
    assert_eq!((to_x.weight, to_x.certainty), (0.5, 0.7));
    let copy_x = to_x.target;
    let por = &store.outgoing(copy_x, Port::Por)[0];
    assert_eq!((por.weight, por.certainty), (0.25, 0.9));

    // external endpoint stays the original sensor
    let copy_y = por.target;
    assert_eq!(store.children(copy_y), vec![sensor]);
    assert_eq!(store.incoming(sensor, Port::Sub).len(), 2);
    assert!(store.reciprocity_violations().is_empty());
}

#[test]
fn test_copy_head_exception() {
    let mut store = InMemoryGraphStore::new();
    let (head, _) = with_children(&mut store, "h", 2);
    let category = pipe(&mut store, "category");
    let previous = pipe(&mut store, "previous");
    store.link_reciprocal(head, category, RelationPair::Categorical).unwrap();
    store.link_reciprocal(previous, head, RelationPair::Sequential).unwrap();

    let copy = copy_schema(&mut store, head, CopyOptions::default()).unwrap().unwrap();

    assert!(store.category_targets(copy).is_empty());
    assert!(store.outgoing(copy, Port::Ret).is_empty());
    assert_eq!(store.incoming(category, Port::Cat).len(), 1);
    assert_eq!(store.outgoing(previous, Port::Por).len(), 1);
    assert_eq!(store.children(copy).len(), 2);
}

#[test]
fn test_copy_twice_creates_no_duplicate_links() {
    let mut store = InMemoryGraphStore::new();
    let (head, children) = with_children(&mut store, "h", 3);
    store.link_chain(&children, RelationPair::Sequential).unwrap();
    let links_before = store.link_count();

    copy_schema(&mut store, head, CopyOptions::default()).unwrap();
    let links_after_one = store.link_count();
    copy_schema(&mut store, head, CopyOptions::default()).unwrap();

    assert_eq!(links_after_one - links_before, links_before);
    assert_eq!(store.link_count() - links_after_one, links_before);
}

// ─────────────────────────────────────────────────────────────────────────────
// Deleter
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_delete_completeness() {
    let mut store = InMemoryGraphStore::new();
    let (head, children) = with_children(&mut store, "h", 3);
    store.link_chain(&children, RelationPair::Sequential).unwrap();
    let sensor_proxy_child = sensor_proxy(&mut store, "green");
    store
        .link_reciprocal(children[2], sensor_proxy_child, RelationPair::Hierarchical)
        .unwrap();
    let members = closure(&store, head, ClosureScope::SameKind);

    let deleted = delete_schema(&mut store, head).unwrap();

    assert_eq!(deleted, members.len());
    for id in members.iter() {
        assert!(store.node(id).is_none());
    }
    for link in store.all_links() {
        assert!(!members.contains(&link.source));
        assert!(!members.contains(&link.target));
    }
    // the sensor survives
    assert_eq!(store.node_count(), 1);
    assert_eq!(delete_schema(&mut store, head).unwrap(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Merger
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_merge_slot_count() {
    let mut store = InMemoryGraphStore::new();
    let (classifier, alternatives) = with_children(&mut store, "A", 3);
    store.link_full(&alternatives, RelationPair::Sequential).unwrap();
    let (procedure, steps) = with_children(&mut store, "B", 2);
    store.link_chain(&steps, RelationPair::Sequential).unwrap();

    let merged = merge_schemas(&mut store, &[classifier, procedure]).unwrap().unwrap();

    let slots = store.children(merged);
    assert_eq!(slots.len(), 4);
    assert_eq!(&slots[..3], &alternatives[..]);
    assert_eq!(slots[3], procedure);
    assert!(!store.contains(classifier));
    assert_eq!(store.children(procedure), steps);
    assert!(store.reciprocity_violations().is_empty());
}

#[test]
fn test_merge_empty_list_is_noop() {
    let mut store = InMemoryGraphStore::new();
    pipe(&mut store, "bystander");
    let before = store.fingerprint();

    assert!(merge_schemas(&mut store, &[]).unwrap().is_none());
    assert!(merge_copy(&mut store, &[], CopyOptions::default()).unwrap().is_none());
    assert_eq!(before, store.fingerprint());
}

#[test]
fn test_merge_copy_keeps_originals() {
    let mut store = InMemoryGraphStore::new();
    let (classifier, alternatives) = with_children(&mut store, "A", 3);
    store.link_full(&alternatives, RelationPair::Sequential).unwrap();
    let (procedure, _) = with_children(&mut store, "B", 2);
    let before = store.fingerprint();
    let nodes_before = store.node_count();

    let merged = merge_copy(&mut store, &[classifier, procedure], CopyOptions::default())
        .unwrap()
        .unwrap();

    assert_eq!(store.children(merged).len(), 4);
    assert!(store.contains(classifier));
    assert_eq!(store.children(classifier), alternatives);
    assert_ne!(before, store.fingerprint());
    // 3 copied alternatives, the copied procedure with its 2 children, the new head
    assert_eq!(store.node_count(), nodes_before + 3 + 3 + 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Features
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_category_reference_feature() {
    let mut store = InMemoryGraphStore::new();
    let head = pipe(&mut store, "exemplar");
    let category = pipe(&mut store, "C");
    store.link_reciprocal(head, category, RelationPair::Categorical).unwrap();

    let features = collect_features(&store, head, &AbstractionPolicyV1::default());

    let names: Vec<String> = features.names().map(str::to_string).collect();
    assert_eq!(names, vec![format!("exp-{}", category.as_u64())]);
}

#[test]
fn test_script_feature_ignores_child_order() {
    let mut store = InMemoryGraphStore::new();
    let policy = AbstractionPolicyV1::default();

    let (left, left_steps) = feature_schema(&mut store, "left", &["red", "blue"]);
    store.link_chain(&left_steps, RelationPair::Sequential).unwrap();
    let (right, right_steps) = feature_schema(&mut store, "right", &["blue", "red"]);
    store.link_chain(&right_steps, RelationPair::Sequential).unwrap();
    let outer_a = pipe(&mut store, "outer-a");
    let outer_b = pipe(&mut store, "outer-b");
    store.link_reciprocal(outer_a, left, RelationPair::Hierarchical).unwrap();
    store.link_reciprocal(outer_b, right, RelationPair::Hierarchical).unwrap();

    let a = collect_features(&store, outer_a, &policy);
    let b = collect_features(&store, outer_b, &policy);

    assert_eq!(a.len(), 1);
    assert_eq!(a.names().collect::<Vec<_>>(), b.names().collect::<Vec<_>>());
}

// ─────────────────────────────────────────────────────────────────────────────
// Abstraction
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_abstraction_threshold_leaves_graph_untouched() {
    let mut store = InMemoryGraphStore::new();
    let (a, _) = feature_schema(&mut store, "A", &["x", "a1", "a2", "a3", "a4", "a5", "a6"]);
    let (b, _) = feature_schema(&mut store, "B", &["x", "b1", "b2", "b3", "b4", "b5", "b6"]);
    let before = store.fingerprint();

    let result = create_abstraction(&mut store, a, b, &AbstractionPolicyV1::default()).unwrap();

    assert!(result.is_none());
    assert_eq!(before, store.fingerprint());
}

#[test]
fn test_abstraction_without_features_is_noop() {
    let mut store = InMemoryGraphStore::new();
    let a = pipe(&mut store, "A");
    let b = pipe(&mut store, "B");
    let before = store.fingerprint();

    assert!(create_abstraction(&mut store, a, b, &AbstractionPolicyV1::default())
        .unwrap()
        .is_none());
    assert_eq!(before, store.fingerprint());
}

#[test]
fn test_abstraction_rewrite() {
    let mut store = InMemoryGraphStore::new();
    let policy = AbstractionPolicyV1::default();
    let (a, a_proxies) = feature_schema(&mut store, "A", &["X", "p"]);
    let (b, b_proxies) = feature_schema(&mut store, "B", &["X", "q"]);

    let abstraction = create_abstraction(&mut store, a, b, &policy).unwrap().unwrap();

    assert_eq!(store.children(abstraction.head).len(), 1);
    let names: Vec<String> = collect_features(&store, abstraction.head, &policy)
        .names()
        .map(str::to_string)
        .collect();
    assert_eq!(names, vec!["sns-X".to_string()]);

    assert!(!store.children(a).contains(&a_proxies[0]));
    assert!(!store.children(b).contains(&b_proxies[0]));
    for (schema, nature) in [(a, abstraction.natures[0]), (b, abstraction.natures[1])] {
        assert!(store.children(schema).contains(&nature));
        assert_eq!(store.category_targets(nature), vec![abstraction.head]);
    }
    assert!(store.reciprocity_violations().is_empty());
}

#[test]
fn test_end_to_end_foo_bar_baz() {
    let mut store = InMemoryGraphStore::new();
    let policy = AbstractionPolicyV1::default();
    let (a, a_proxies) = feature_schema(&mut store, "A", &["foo", "bar"]);
    let (b, b_proxies) = feature_schema(&mut store, "B", &["foo", "baz"]);

    let abstraction = create_abstraction(&mut store, a, b, &policy).unwrap().unwrap();

    let abstracted: Vec<&str> = abstraction.features.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(abstracted, vec!["sns-foo"]);
    assert_eq!(store.node(abstraction.head).unwrap().name, "Common-A-and-B");

    assert_eq!(store.children(a), vec![a_proxies[1], abstraction.natures[0]]);
    assert_eq!(store.children(b), vec![b_proxies[1], abstraction.natures[1]]);

    let remaining_a: Vec<String> = collect_features(&store, a, &policy)
        .names()
        .map(str::to_string)
        .collect();
    assert_eq!(
        remaining_a,
        vec![format!("exp-{}", abstraction.head.as_u64()), "sns-bar".to_string()]
    );
}
