//! In-memory graph store.
//!
//! Nodes live in an arena keyed by monotonically allocated [`NodeId`]s;
//! links are kept in one map keyed by [`LinkKey`] plus per-node outgoing and
//! incoming indexes. Everything is a BTreeMap/BTreeSet, so iteration order
//! (and with it every engine result) is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::canonical::canonical_hash_hex;
use crate::types::{Link, LinkKey, Node, NodeId, NodeKind, NodespaceId, Port};
use super::GraphStore;

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Node not found.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}

/// In-memory graph store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphStore {
    /// Nodes by ID.
    nodes: BTreeMap<NodeId, Node>,
    /// All links by key.
    links: BTreeMap<LinkKey, Link>,
    /// Source -> keys of links leaving it.
    outgoing: BTreeMap<NodeId, BTreeSet<LinkKey>>,
    /// Target -> keys of links arriving at it.
    incoming: BTreeMap<NodeId, BTreeSet<LinkKey>>,
    /// Last allocated node id.
    last_id: u64,
    /// Mutation counter.
    revision: u64,
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    nodes: Vec<&'a Node>,
    links: Vec<&'a Link>,
}

impl InMemoryGraphStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// All links, ordered by key.
    pub fn all_links(&self) -> Vec<Link> {
        self.links.values().copied().collect()
    }

    /// Look up one link by its endpoints.
    pub fn link(&self, source: NodeId, source_port: Port, target: NodeId, target_port: Port) -> Option<&Link> {
        self.links.get(&LinkKey {
            source,
            source_port,
            target,
            target_port,
        })
    }

    /// Number of mutations applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Canonical hash of every node and link.
    ///
    /// Two stores with equal fingerprints hold the same graph.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&FingerprintInput {
            nodes: self.nodes.values().collect(),
            links: self.links.values().collect(),
        })
    }

    fn insert_link(&mut self, link: Link) {
        let key = link.key();
        self.outgoing.entry(key.source).or_default().insert(key);
        self.incoming.entry(key.target).or_default().insert(key);
        self.links.insert(key, link);
        self.revision += 1;
    }

    fn remove_key(&mut self, key: &LinkKey) -> bool {
        if self.links.remove(key).is_none() {
            return false;
        }
        if let Some(keys) = self.outgoing.get_mut(&key.source) {
            keys.remove(key);
        }
        if let Some(keys) = self.incoming.get_mut(&key.target) {
            keys.remove(key);
        }
        self.revision += 1;
        true
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, InMemoryError> {
        self.nodes.get_mut(&id).ok_or(InMemoryError::NodeNotFound(id))
    }
}

impl GraphStore for InMemoryGraphStore {
    type Error = InMemoryError;

    fn create_node(
        &mut self,
        kind: NodeKind,
        nodespace: NodespaceId,
        name: Option<&str>,
    ) -> Result<NodeId, Self::Error> {
        self.last_id += 1;
        let id = NodeId(self.last_id);
        self.nodes.insert(id, Node::new(id, kind, nodespace, name));
        self.revision += 1;
        Ok(id)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn delete_node(&mut self, id: NodeId) -> Result<bool, Self::Error> {
        if !self.nodes.contains_key(&id) {
            return Ok(false);
        }

        let mut touching: BTreeSet<LinkKey> = BTreeSet::new();
        if let Some(keys) = self.outgoing.remove(&id) {
            touching.extend(keys);
        }
        if let Some(keys) = self.incoming.remove(&id) {
            touching.extend(keys);
        }
        for key in &touching {
            self.remove_key(key);
        }

        self.nodes.remove(&id);
        self.revision += 1;
        Ok(true)
    }

    fn create_link(
        &mut self,
        source: NodeId,
        source_port: Port,
        target: NodeId,
        target_port: Port,
        weight: f64,
        certainty: f64,
    ) -> Result<(), Self::Error> {
        if !self.nodes.contains_key(&source) {
            return Err(InMemoryError::NodeNotFound(source));
        }
        if !self.nodes.contains_key(&target) {
            return Err(InMemoryError::NodeNotFound(target));
        }
        self.insert_link(Link::new(source, source_port, target, target_port, weight, certainty));
        Ok(())
    }

    fn remove_link(
        &mut self,
        source: NodeId,
        source_port: Port,
        target: NodeId,
        target_port: Option<Port>,
    ) -> Result<usize, Self::Error> {
        let keys: Vec<LinkKey> = self
            .outgoing
            .get(&source)
            .map(|set| {
                set.iter()
                    .filter(|k| k.source_port == source_port && k.target == target)
                    .filter(|k| target_port.map_or(true, |p| k.target_port == p))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        Ok(keys.iter().filter(|k| self.remove_key(k)).count())
    }

    fn outgoing(&self, id: NodeId, port: Port) -> Vec<Link> {
        self.outgoing
            .get(&id)
            .map(|set| {
                set.iter()
                    .filter(|k| k.source_port == port)
                    .filter_map(|k| self.links.get(k).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn incoming(&self, id: NodeId, port: Port) -> Vec<Link> {
        self.incoming
            .get(&id)
            .map(|set| {
                set.iter()
                    .filter(|k| k.target_port == port)
                    .filter_map(|k| self.links.get(k).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn links_of(&self, id: NodeId) -> Vec<Link> {
        let mut keys: BTreeSet<LinkKey> = BTreeSet::new();
        if let Some(set) = self.outgoing.get(&id) {
            keys.extend(set.iter().copied());
        }
        if let Some(set) = self.incoming.get(&id) {
            keys.extend(set.iter().copied());
        }
        keys.iter().filter_map(|k| self.links.get(k).copied()).collect()
    }

    fn nodes_with_name_prefix(&self, nodespace: NodespaceId, prefix: &str) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.nodespace == nodespace && n.name.starts_with(prefix))
            .map(|n| n.id)
            .collect()
    }

    fn set_activation(&mut self, id: NodeId, value: f64) -> Result<(), Self::Error> {
        self.node_mut(id)?.activation = value;
        self.revision += 1;
        Ok(())
    }

    fn set_state(&mut self, id: NodeId, key: &str, value: f64) -> Result<(), Self::Error> {
        self.node_mut(id)?.state.insert(key.to_string(), value);
        self.revision += 1;
        Ok(())
    }

    fn set_parameter(
        &mut self,
        id: NodeId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), Self::Error> {
        self.node_mut(id)?.parameters.insert(key.to_string(), value);
        self.revision += 1;
        Ok(())
    }

    fn reciprocity_violations(&self) -> Vec<Link> {
        self.links
            .values()
            .filter(|link| match link.reciprocal_key() {
                Some(key) => !self.links.contains_key(&key),
                None => false,
            })
            .copied()
            .collect()
    }
}
