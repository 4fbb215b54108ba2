//! Node types for the schema kernel.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a node in the net.
///
/// Allocated monotonically by the store and never reused, so ordering by
/// `NodeId` is ordering by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Get the raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of the nodespace (owning scope) a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodespaceId(Uuid);

impl NodespaceId {
    /// Create a new NodespaceId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The root nodespace (nil UUID).
    pub fn root() -> Self {
        Self(Uuid::nil())
    }

    /// Generate a fresh random nodespace id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NodespaceId {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for NodespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a node, with the structured record each kind carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Structural schema node.
    #[default]
    Pipe,
    /// Sensor proxy reading from a data source.
    Sensor {
        /// Data source identifier (e.g. `"fovea_red"`).
        datasource: String,
    },
    /// Actuator trigger writing to a data target.
    Actuator {
        /// Data target identifier.
        datatarget: String,
    },
    /// Plain register node.
    Register,
}

impl NodeKind {
    /// Create a sensor kind bound to `datasource`.
    pub fn sensor(datasource: impl Into<String>) -> Self {
        Self::Sensor {
            datasource: datasource.into(),
        }
    }

    /// Create an actuator kind bound to `datatarget`.
    pub fn actuator(datatarget: impl Into<String>) -> Self {
        Self::Actuator {
            datatarget: datatarget.into(),
        }
    }

    /// Short tag of the variant, ignoring its payload.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Pipe => "pipe",
            Self::Sensor { .. } => "sensor",
            Self::Actuator { .. } => "actuator",
            Self::Register => "register",
        }
    }

    /// Whether both kinds are the same variant.
    pub fn same_kind(&self, other: &NodeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Data source of a sensor, `None` for other kinds.
    pub fn datasource(&self) -> Option<&str> {
        match self {
            Self::Sensor { datasource } => Some(datasource),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor { datasource } => write!(f, "sensor:{}", datasource),
            Self::Actuator { datatarget } => write!(f, "actuator:{}", datatarget),
            other => write!(f, "{}", other.tag()),
        }
    }
}

/// A node in the net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable id.
    pub id: NodeId,
    /// Kind tag and its record.
    pub kind: NodeKind,
    /// Human readable name, not unique.
    pub name: String,
    /// Owning nodespace.
    pub nodespace: NodespaceId,
    /// Small ordered key → scalar state (stored coordinates and the like).
    pub state: BTreeMap<String, f64>,
    /// Free-form configuration.
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Activation, owned by the activation engine.
    pub activation: f64,
}

impl Node {
    /// Create a node with empty state and zero activation.
    ///
    /// Without a name the node is called `<kind>-<id>`.
    pub fn new(id: NodeId, kind: NodeKind, nodespace: NodespaceId, name: Option<&str>) -> Self {
        let name = match name {
            Some(n) => n.to_string(),
            None => format!("{}-{}", kind.tag(), id.0),
        };
        Self {
            id,
            kind,
            name,
            nodespace,
            state: BTreeMap::new(),
            parameters: BTreeMap::new(),
            activation: 0.0,
        }
    }
}
