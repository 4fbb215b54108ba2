//! Link types for the schema kernel.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::node::NodeId;

/// Relation port of a node.
///
/// Links leave a node through a port and arrive at a port of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Port {
    /// General activation / confirmation loop.
    Gen,
    /// Predecessor → successor.
    Por,
    /// Successor → predecessor.
    Ret,
    /// Parent → child.
    Sub,
    /// Child → parent.
    Sur,
    /// Exemplar → category.
    Cat,
    /// Category → exemplar.
    Exp,
}

impl Port {
    /// All ports, in canonical order.
    pub const ALL: [Port; 7] = [
        Port::Gen,
        Port::Por,
        Port::Ret,
        Port::Sub,
        Port::Sur,
        Port::Cat,
        Port::Exp,
    ];

    /// The port on the opposite side of this port's relation pair.
    ///
    /// `gen` has no counterpart.
    pub fn reciprocal(&self) -> Option<Port> {
        match self {
            Self::Gen => None,
            Self::Por => Some(Self::Ret),
            Self::Ret => Some(Self::Por),
            Self::Sub => Some(Self::Sur),
            Self::Sur => Some(Self::Sub),
            Self::Cat => Some(Self::Exp),
            Self::Exp => Some(Self::Cat),
        }
    }

    /// The relation pair this port belongs to.
    pub fn pair(&self) -> Option<RelationPair> {
        match self {
            Self::Gen => None,
            Self::Por | Self::Ret => Some(RelationPair::Sequential),
            Self::Sub | Self::Sur => Some(RelationPair::Hierarchical),
            Self::Cat | Self::Exp => Some(RelationPair::Categorical),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gen => "gen",
            Self::Por => "por",
            Self::Ret => "ret",
            Self::Sub => "sub",
            Self::Sur => "sur",
            Self::Cat => "cat",
            Self::Exp => "exp",
        };
        write!(f, "{}", s)
    }
}

/// A port name that is none of the seven ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown port: {0}")]
pub struct UnknownPort(pub String);

impl FromStr for Port {
    type Err = UnknownPort;

    /// Parse a port from its name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gen" => Ok(Self::Gen),
            "por" => Ok(Self::Por),
            "ret" => Ok(Self::Ret),
            "sub" => Ok(Self::Sub),
            "sur" => Ok(Self::Sur),
            "cat" => Ok(Self::Cat),
            "exp" => Ok(Self::Exp),
            _ => Err(UnknownPort(s.to_string())),
        }
    }
}

/// A reciprocal pair of ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationPair {
    /// sub / sur
    Hierarchical,
    /// por / ret
    Sequential,
    /// cat / exp
    Categorical,
}

impl RelationPair {
    /// Port used from `a` towards `b` in `link_reciprocal(a, b, pair)`.
    pub fn forward(&self) -> Port {
        match self {
            Self::Hierarchical => Port::Sub,
            Self::Sequential => Port::Por,
            Self::Categorical => Port::Cat,
        }
    }

    /// Port used from `b` back towards `a`.
    pub fn backward(&self) -> Port {
        match self {
            Self::Hierarchical => Port::Sur,
            Self::Sequential => Port::Ret,
            Self::Categorical => Port::Exp,
        }
    }
}

/// Key identifying a link: at most one link exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    /// Source node.
    pub source: NodeId,
    /// Port the link leaves through.
    pub source_port: Port,
    /// Target node.
    pub target: NodeId,
    /// Port the link arrives at.
    pub target_port: Port,
}

/// A directed, weighted link between two node ports.
///
/// Ordered by key (source, source port, target, target port).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Source node.
    pub source: NodeId,
    /// Port the link leaves through.
    pub source_port: Port,
    /// Target node.
    pub target: NodeId,
    /// Port the link arrives at.
    pub target_port: Port,
    /// Link weight.
    pub weight: f64,
    /// Certainty in [0, 1].
    pub certainty: f64,
}

impl Link {
    /// Create a link, clamping certainty into [0, 1].
    pub fn new(
        source: NodeId,
        source_port: Port,
        target: NodeId,
        target_port: Port,
        weight: f64,
        certainty: f64,
    ) -> Self {
        Self {
            source,
            source_port,
            target,
            target_port,
            weight,
            certainty: certainty.clamp(0.0, 1.0),
        }
    }

    /// Key of this link.
    pub fn key(&self) -> LinkKey {
        LinkKey {
            source: self.source,
            source_port: self.source_port,
            target: self.target,
            target_port: self.target_port,
        }
    }

    /// Whether source and target are the same node.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// The link that would pair with this one, if its port has a reciprocal.
    pub fn reciprocal_key(&self) -> Option<LinkKey> {
        Some(LinkKey {
            source: self.target,
            source_port: self.target_port.reciprocal()?,
            target: self.source,
            target_port: self.source_port.reciprocal()?,
        })
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source, self.source_port, self.target, self.target_port
        )
    }
}
