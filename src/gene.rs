//! Gene types for NEAT genomes.
//!
//! - [`Node`]: a vertex of the network, plus its phenotype wiring
//! - [`Innovation`]: a weighted connection gene with a structural identity

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::innovation::structural_hash;

/// Identifier of a node, unique within one genome.
///
/// Input and output nodes are numbered by position at genome construction;
/// hidden node ids are handed out by the innovation registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Id value carried by an innovation that has not been registered yet.
/// The registry never issues it.
pub const UNASSIGNED_ID: u64 = 0;

/// The role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Receives an external value.
    Input,
    /// Produces a network output.
    Output,
    /// Internal node created by splitting a connection.
    Hidden,
    /// Constant 1.0 source.
    Bias,
}

impl NodeKind {
    /// Whether a connection may start at a node of this kind.
    #[inline]
    #[must_use]
    pub const fn can_originate(self) -> bool {
        matches!(self, Self::Input | Self::Bias | Self::Hidden)
    }

    /// Whether a connection may end at a node of this kind.
    #[inline]
    #[must_use]
    pub const fn can_terminate(self) -> bool {
        matches!(self, Self::Output | Self::Hidden)
    }
}

/// A node gene.
///
/// `incoming` and `outgoing` hold indices into the owning genome's innovation
/// sequence. They are empty until [`Genome::generate_phenotype`] runs and are
/// stale after any structural mutation until it runs again.
///
/// [`Genome::generate_phenotype`]: crate::genome::Genome::generate_phenotype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub activation: Activation,
    /// Enabled innovations ending at this node.
    #[serde(skip)]
    pub incoming: Vec<usize>,
    /// Enabled innovations starting at this node.
    #[serde(skip)]
    pub outgoing: Vec<usize>,
}

impl Node {
    fn with_kind(id: NodeId, kind: NodeKind, activation: Activation) -> Self {
        Self {
            id,
            kind,
            activation,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    #[must_use]
    pub fn input(id: NodeId) -> Self {
        Self::with_kind(id, NodeKind::Input, Activation::Identity)
    }

    #[must_use]
    pub fn output(id: NodeId) -> Self {
        Self::with_kind(id, NodeKind::Output, Activation::Sigmoid)
    }

    #[must_use]
    pub fn hidden(id: NodeId, activation: Activation) -> Self {
        Self::with_kind(id, NodeKind::Hidden, activation)
    }

    #[must_use]
    pub fn bias(id: NodeId) -> Self {
        Self::with_kind(id, NodeKind::Bias, Activation::Identity)
    }

    /// Drop any phenotype wiring.
    pub(crate) fn clear_wiring(&mut self) {
        self.incoming.clear();
        self.outgoing.clear();
    }
}

/// A connection gene.
///
/// [`Innovation::hash`] depends on `source` and `destination` only. Weight,
/// enabled state and id must never feed into it: cross-genome id sharing and
/// in-genome duplicate detection both rely on equal edges colliding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Innovation {
    /// Global id issued by the registry, or [`UNASSIGNED_ID`].
    pub id: u64,
    pub source: NodeId,
    pub destination: NodeId,
    pub weight: f32,
    /// Disabled innovations stay in the genome but are left out of the phenotype.
    pub enabled: bool,
}

impl Innovation {
    /// Create an enabled, unregistered innovation.
    #[must_use]
    pub fn new(source: NodeId, destination: NodeId, weight: f32) -> Self {
        Self {
            id: UNASSIGNED_ID,
            source,
            destination,
            weight,
            enabled: true,
        }
    }

    /// Same as [`Innovation::new`] but disabled.
    #[must_use]
    pub fn disabled(source: NodeId, destination: NodeId, weight: f32) -> Self {
        Self {
            enabled: false,
            ..Self::new(source, destination, weight)
        }
    }

    /// Structural hash of (source, destination).
    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        structural_hash(self.source, self.destination)
    }

    #[inline]
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.id != UNASSIGNED_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_constructors() {
        let input = Node::input(NodeId(0));
        assert_eq!(input.kind, NodeKind::Input);
        assert_eq!(input.activation, Activation::Identity);

        let output = Node::output(NodeId(1));
        assert_eq!(output.kind, NodeKind::Output);
        assert_eq!(output.activation, Activation::Sigmoid);

        let hidden = Node::hidden(NodeId(7), Activation::Tanh);
        assert_eq!(hidden.kind, NodeKind::Hidden);
        assert_eq!(hidden.activation, Activation::Tanh);
        assert!(hidden.incoming.is_empty() && hidden.outgoing.is_empty());
    }

    #[test]
    fn test_kind_roles() {
        assert!(NodeKind::Input.can_originate() && !NodeKind::Input.can_terminate());
        assert!(NodeKind::Bias.can_originate() && !NodeKind::Bias.can_terminate());
        assert!(!NodeKind::Output.can_originate() && NodeKind::Output.can_terminate());
        assert!(NodeKind::Hidden.can_originate() && NodeKind::Hidden.can_terminate());
    }

    #[test]
    fn test_hash_ignores_mutable_fields() {
        let a = Innovation::new(NodeId(1), NodeId(4), 0.3);
        let mut b = Innovation::disabled(NodeId(1), NodeId(4), -2.0);
        b.id = 99;
        assert_eq!(a.hash(), b.hash());

        let reversed = Innovation::new(NodeId(4), NodeId(1), 0.3);
        assert_ne!(a.hash(), reversed.hash());
    }

    #[test]
    fn test_new_innovation_is_unregistered() {
        let inn = Innovation::new(NodeId(0), NodeId(1), 1.0);
        assert!(inn.enabled);
        assert!(!inn.is_registered());
    }
}
