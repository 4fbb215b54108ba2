//! Graph storage backends.
//!
//! The store owns every node and link and is the only mutator of topology.
//! Engine operations in [`crate::schema`], [`crate::features`] and
//! [`crate::abstraction`] are written against the [`GraphStore`] trait.

pub mod memory;

use crate::types::{Link, Node, NodeId, NodeKind, NodespaceId, Port, RelationPair};

/// Trait for graph storage backends.
///
/// Implementations must guarantee deterministic ordering of results and
/// must treat link creation as an upsert keyed by
/// `(source, source_port, target, target_port)`.
///
/// The trait is synchronous: engine operations run to completion against
/// the store before another one starts.
pub trait GraphStore {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a node and return its id.
    fn create_node(
        &mut self,
        kind: NodeKind,
        nodespace: NodespaceId,
        name: Option<&str>,
    ) -> Result<NodeId, Self::Error>;

    /// Fetch a node by id.
    fn node(&self, id: NodeId) -> Option<&Node>;

    /// Delete a node and every link touching it.
    ///
    /// Returns `Ok(false)` for an unknown id; deletion is idempotent.
    fn delete_node(&mut self, id: NodeId) -> Result<bool, Self::Error>;

    /// Create (or update the weight and certainty of) a link.
    fn create_link(
        &mut self,
        source: NodeId,
        source_port: Port,
        target: NodeId,
        target_port: Port,
        weight: f64,
        certainty: f64,
    ) -> Result<(), Self::Error>;

    /// Remove links from `source.source_port` to `target`, optionally
    /// restricted to one target port. Returns how many were removed.
    fn remove_link(
        &mut self,
        source: NodeId,
        source_port: Port,
        target: NodeId,
        target_port: Option<Port>,
    ) -> Result<usize, Self::Error>;

    /// Links leaving `id` through `port`, ordered by target.
    fn outgoing(&self, id: NodeId, port: Port) -> Vec<Link>;

    /// Links arriving at `id` on `port`, ordered by source.
    fn incoming(&self, id: NodeId, port: Port) -> Vec<Link>;

    /// Every link touching `id`, each self-loop reported once.
    fn links_of(&self, id: NodeId) -> Vec<Link>;

    /// Nodes in `nodespace` whose name starts with `prefix`, ordered by id.
    fn nodes_with_name_prefix(&self, nodespace: NodespaceId, prefix: &str) -> Vec<NodeId>;

    /// Set the activation of a node (host / activation engine use only).
    fn set_activation(&mut self, id: NodeId, value: f64) -> Result<(), Self::Error>;

    /// Set one state entry of a node.
    fn set_state(&mut self, id: NodeId, key: &str, value: f64) -> Result<(), Self::Error>;

    /// Set one parameter of a node.
    fn set_parameter(
        &mut self,
        id: NodeId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), Self::Error>;

    /// Whether the node exists.
    fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Activation of a node, `0.0` for unknown ids.
    fn activation(&self, id: NodeId) -> f64 {
        self.node(id).map(|n| n.activation).unwrap_or(0.0)
    }

    /// Links that are missing their reciprocal.
    ///
    /// Backends that cannot check this cheaply report nothing.
    fn reciprocity_violations(&self) -> Vec<Link> {
        Vec::new()
    }

    /// Direct hierarchical children (sub targets) of a node.
    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.outgoing(id, Port::Sub).iter().map(|l| l.target).collect()
    }

    /// Categories this node is an exemplar of (cat targets).
    fn category_targets(&self, id: NodeId) -> Vec<NodeId> {
        self.outgoing(id, Port::Cat).iter().map(|l| l.target).collect()
    }

    /// Link `a` to `b` and `b` back to `a` with the ports of `pair`.
    fn link_reciprocal(&mut self, a: NodeId, b: NodeId, pair: RelationPair) -> Result<(), Self::Error> {
        self.link_reciprocal_weighted(a, b, pair, 1.0, 1.0)
    }

    /// Weighted variant of [`GraphStore::link_reciprocal`].
    fn link_reciprocal_weighted(
        &mut self,
        a: NodeId,
        b: NodeId,
        pair: RelationPair,
        weight: f64,
        certainty: f64,
    ) -> Result<(), Self::Error> {
        let (fwd, bwd) = (pair.forward(), pair.backward());
        // Both endpoints are checked by the first call; the second cannot fail
        // on a missing node once the first succeeded.
        self.create_link(a, fwd, b, fwd, weight, certainty)?;
        self.create_link(b, bwd, a, bwd, weight, certainty)
    }

    /// Remove both directions of a reciprocal relation between `a` and `b`.
    fn unlink_reciprocal(&mut self, a: NodeId, b: NodeId, pair: RelationPair) -> Result<usize, Self::Error> {
        let (fwd, bwd) = (pair.forward(), pair.backward());
        let removed = self.remove_link(a, fwd, b, Some(fwd))?;
        Ok(removed + self.remove_link(b, bwd, a, Some(bwd))?)
    }

    /// Drop every link leaving `id` through `port` and every link arriving on it.
    fn detach_port(&mut self, id: NodeId, port: Port) -> Result<usize, Self::Error> {
        let mut removed = 0;
        for link in self.outgoing(id, port) {
            removed += self.remove_link(link.source, link.source_port, link.target, Some(link.target_port))?;
        }
        for link in self.incoming(id, port) {
            removed += self.remove_link(link.source, link.source_port, link.target, Some(link.target_port))?;
        }
        Ok(removed)
    }

    /// Chain `nodes` in order: `nodes[i] -fwd-> nodes[i+1]` plus reciprocals.
    fn link_chain(&mut self, nodes: &[NodeId], pair: RelationPair) -> Result<(), Self::Error> {
        for window in nodes.windows(2) {
            self.link_reciprocal(window[0], window[1], pair)?;
        }
        Ok(())
    }

    /// Link every node with every node, itself included.
    ///
    /// A sub field linked this way with [`RelationPair::Sequential`] is a pure
    /// classifier: each member has as many `por` links as there are members.
    fn link_full(&mut self, nodes: &[NodeId], pair: RelationPair) -> Result<(), Self::Error> {
        for &a in nodes {
            for &b in nodes {
                let (fwd, bwd) = (pair.forward(), pair.backward());
                self.create_link(a, fwd, b, fwd, 1.0, 1.0)?;
                self.create_link(a, bwd, b, bwd, 1.0, 1.0)?;
            }
        }
        Ok(())
    }
}

pub use memory::InMemoryGraphStore;
