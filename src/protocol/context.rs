//! Explicit handles the protocol driver threads through its operations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::store::GraphStore;
use crate::types::{NodeId, NodespaceId, Port};
use super::{ABSTRACTION_PREFIX, PROTOCOL_PREFIX};

/// Driver state: where the protocol chain ends and which schemas are known
/// abstractions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolContext {
    /// Nodespace the protocol lives in.
    pub nodespace: NodespaceId,
    chain_head: Option<NodeId>,
    abstractions: BTreeSet<NodeId>,
    protocol_count: u64,
}

impl ProtocolContext {
    /// Fresh context with no chain yet.
    pub fn new(nodespace: NodespaceId) -> Self {
        Self {
            nodespace,
            ..Self::default()
        }
    }

    /// Rebuild the handles from an existing graph, once, by name prefix.
    ///
    /// The chain head is the newest protocol node without a successor.
    pub fn discover<S: GraphStore + ?Sized>(store: &S, nodespace: NodespaceId) -> Self {
        let protocol_heads = store.nodes_with_name_prefix(nodespace, PROTOCOL_PREFIX);
        let chain_head = protocol_heads
            .iter()
            .copied()
            .filter(|id| store.outgoing(*id, Port::Por).is_empty())
            .last();
        let abstractions = store
            .nodes_with_name_prefix(nodespace, ABSTRACTION_PREFIX)
            .into_iter()
            .collect();

        tracing::debug!(nodespace = %nodespace, chain_head = ?chain_head, "protocol context discovered");

        Self {
            nodespace,
            chain_head,
            abstractions,
            protocol_count: protocol_heads.len() as u64,
        }
    }

    /// Current end of the protocol chain.
    pub fn chain_head(&self) -> Option<NodeId> {
        self.chain_head
    }

    pub(crate) fn set_chain_head(&mut self, head: NodeId) {
        self.chain_head = Some(head);
    }

    /// Number of protocol heads created in this nodespace.
    pub fn protocol_count(&self) -> u64 {
        self.protocol_count
    }

    pub(crate) fn next_protocol_number(&mut self) -> u64 {
        self.protocol_count += 1;
        self.protocol_count
    }

    /// Abstraction heads created so far.
    pub fn abstractions(&self) -> &BTreeSet<NodeId> {
        &self.abstractions
    }

    /// Whether `id` is a known abstraction head.
    pub fn is_abstraction(&self, id: NodeId) -> bool {
        self.abstractions.contains(&id)
    }

    pub(crate) fn add_abstraction(&mut self, id: NodeId) {
        self.abstractions.insert(id);
    }
}
