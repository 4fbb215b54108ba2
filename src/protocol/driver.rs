//! Tick-driven protocol driver over a shared store.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::policy::AbstractionPolicyV1;
use crate::store::GraphStore;
use crate::types::{NodeId, NodespaceId};
use super::{curate, record_scene, CurationReport, DriverError, ProtocolContext, RecordOutcome};

/// A store shared between the driver and the host.
///
/// The mutex is the single mutation lock: every engine operation holds it
/// from planning to its last write.
pub type SharedGraph<S> = Arc<Mutex<S>>;

/// Runs recording and curation ticks against a shared store.
pub struct ProtocolDriver<S: GraphStore> {
    graph: SharedGraph<S>,
    context: ProtocolContext,
    policy: AbstractionPolicyV1,
}

impl<S: GraphStore> ProtocolDriver<S> {
    /// Create a driver, discovering an existing protocol chain in `nodespace`.
    pub fn new(graph: SharedGraph<S>, nodespace: NodespaceId, policy: AbstractionPolicyV1) -> Self {
        let context = ProtocolContext::discover(&*graph.lock(), nodespace);
        tracing::info!(
            nodespace = %nodespace,
            policy = %policy.policy_id(),
            chain_head = ?context.chain_head(),
            "protocol driver ready"
        );
        Self {
            graph,
            context,
            policy,
        }
    }

    /// Handle to the shared store.
    pub fn graph(&self) -> SharedGraph<S> {
        Arc::clone(&self.graph)
    }

    /// Current context.
    pub fn context(&self) -> &ProtocolContext {
        &self.context
    }

    /// Active policy.
    pub fn policy(&self) -> &AbstractionPolicyV1 {
        &self.policy
    }

    /// Record one scene.
    pub fn record_tick(&mut self, candidates: &[NodeId], imported: &[NodeId]) -> Result<RecordOutcome, DriverError> {
        let mut store = self.graph.lock();
        let outcome = record_scene(&mut *store, &mut self.context, candidates, imported, &self.policy)?;
        check_reciprocity(&*store, "record")?;
        Ok(outcome)
    }

    /// Run one curation pass.
    pub fn curate_tick(&mut self) -> Result<CurationReport, DriverError> {
        let mut store = self.graph.lock();
        let report = curate(&mut *store, &mut self.context, &self.policy)?;
        check_reciprocity(&*store, "curate")?;
        Ok(report)
    }
}

fn check_reciprocity<S: GraphStore + ?Sized>(store: &S, operation: &'static str) -> Result<(), DriverError> {
    let violations = store.reciprocity_violations();
    match violations.first() {
        None => Ok(()),
        Some(first) => {
            tracing::error!(operation, count = violations.len(), first = %first, "unpaired links after tick");
            Err(DriverError::InvariantViolation {
                operation,
                count: violations.len(),
                first: first.to_string(),
            })
        }
    }
}
