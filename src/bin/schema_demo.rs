//! Schema Kernel Demo Binary
//!
//! Builds a small node net, abstracts two similar schemas, merges copies of
//! them and drives two protocol ticks, then prints a JSON report to stdout.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `SCHEMA_SIMILARITY_DIVISOR`: divisor of the similarity threshold (default: 6)
//! - `SCHEMA_ACTIVATION_THRESHOLD`: protocol activation threshold (default: 0.8)
//! - `SCHEMA_PROTOCOL_LOOKBACK`: protocol heads visited per curation (default: 50)
//! - `RUST_LOG`: Log level filter (default: schema_demo=info,schema_kernel=debug)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! LOG_FORMAT=pretty cargo run --bin schema_demo
//! ```

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use schema_kernel::{
    collect_features, create_abstraction, merge_copy, AbstractionPolicyV1, CopyOptions,
    GraphStore, InMemoryGraphStore, NodeId, NodeKind, NodespaceId, ProtocolDriver,
    RelationPair, SharedGraph,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "schema_demo=info,schema_kernel=debug".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Read one override from the environment, keeping `default` when unset or unparsable.
fn env_override<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparsable override");
            default
        }),
        Err(_) => default,
    }
}

fn load_policy() -> AbstractionPolicyV1 {
    let base = AbstractionPolicyV1::default();
    AbstractionPolicyV1::new(
        env_override("SCHEMA_SIMILARITY_DIVISOR", base.similarity_divisor),
        base.proxy_suffix.clone(),
        env_override("SCHEMA_ACTIVATION_THRESHOLD", base.activation_threshold),
        env_override("SCHEMA_PROTOCOL_LOOKBACK", base.protocol_lookback),
        base.carry_state_on_copy,
    )
}

/// Schema `name` with one sensor proxy child per datasource.
fn build_schema<S: GraphStore>(
    store: &mut S,
    ns: NodespaceId,
    name: &str,
    sources: &[&str],
    suffix: &str,
) -> Result<NodeId, S::Error> {
    let head = store.create_node(NodeKind::Pipe, ns, Some(name))?;
    for source in sources {
        let proxy = store.create_node(NodeKind::Pipe, ns, Some(&format!("{source}{suffix}")))?;
        let sensor = store.create_node(NodeKind::sensor(*source), ns, Some(*source))?;
        store.link_reciprocal(proxy, sensor, RelationPair::Hierarchical)?;
        store.link_reciprocal(head, proxy, RelationPair::Hierarchical)?;
    }
    Ok(head)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let policy = load_policy();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        policy = %policy.policy_id(),
        params_hash = %policy.params_hash(),
        "Starting schema kernel demo"
    );

    let ns = NodespaceId::root();
    let graph: SharedGraph<InMemoryGraphStore> = Arc::new(Mutex::new(InMemoryGraphStore::new()));

    let (a, b, c, merged, abstraction, features_a) = {
        let mut store = graph.lock();
        let a = build_schema(&mut *store, ns, "A", &["foo", "bar"], &policy.proxy_suffix)?;
        let b = build_schema(&mut *store, ns, "B", &["foo", "baz"], &policy.proxy_suffix)?;
        let c = build_schema(&mut *store, ns, "C", &["qux", "baz"], &policy.proxy_suffix)?;

        let merged = merge_copy(&mut *store, &[a, b], CopyOptions::from_policy(&policy))?;
        let abstraction = create_abstraction(&mut *store, a, b, &policy)?;
        let features_a = collect_features(&*store, a, &policy);
        (a, b, c, merged, abstraction, features_a)
    };

    let mut driver = ProtocolDriver::new(graph.clone(), ns, policy.clone());
    {
        let mut store = graph.lock();
        store.set_activation(c, 0.95)?;
    }
    let first = driver.record_tick(&[a, b, c], &[])?;
    let second = driver.record_tick(&[], &[c])?;
    let curation = driver.curate_tick()?;

    let store = graph.lock();
    let report = json!({
        "policy": {
            "id": policy.policy_id(),
            "params_hash": policy.params_hash(),
        },
        "schemas": { "A": a, "B": b, "C": c },
        "merged": merged,
        "abstraction": abstraction,
        "features_of_A": features_a.names().collect::<Vec<_>>(),
        "ticks": [first, second],
        "curation": curation,
        "graph": {
            "nodes": store.node_count(),
            "links": store.link_count(),
            "fingerprint": store.fingerprint(),
        },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!(nodes = store.node_count(), links = store.link_count(), "demo finished");
    Ok(())
}
