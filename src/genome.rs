//! NEAT genome: ordered node and innovation arenas plus phenotype wiring.
//!
//! A [`Genome`] owns its nodes and its local copies of innovations. Ids come
//! from the shared [`InnovationRegistry`]; the genome never makes one up.
//! Structural mutations are applied through the [`Mutator`] chosen at
//! construction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::RngCore;
use thiserror::Error;
use tracing::warn;

use crate::gene::{Innovation, Node, NodeId, NodeKind};
use crate::innovation::InnovationRegistry;
use crate::mutator::{
    AddConnectionOutcome, AddNodeOutcome, DefaultMutator, MutationReport, Mutator,
};

/// Errors raised by genome construction and gene edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenomeError {
    #[error("a genome needs at least one input node")]
    NoInputs,
    #[error("a genome needs at least one output node")]
    NoOutputs,
    #[error("{inputs} inputs and {outputs} outputs exceed the node id space")]
    TooManyNodes { inputs: usize, outputs: usize },
    #[error("innovation index {index} out of bounds for a genome with {len} innovations")]
    UnknownInnovation { index: usize, len: usize },
}

/// A candidate network: nodes, connection genes and known structural hashes.
///
/// The node sequence starts with the inputs, then the outputs, then hidden
/// nodes in creation order. Node and innovation positions are stable: genes
/// are only ever appended.
#[derive(Debug, Clone)]
pub struct Genome {
    nodes: Vec<Node>,
    innovations: Vec<Innovation>,
    /// Structural hashes of every local innovation, enabled or not.
    known_hashes: HashSet<u64>,
    /// First position of each node id in `nodes`.
    node_index: HashMap<NodeId, usize>,
    num_inputs: usize,
    num_outputs: usize,
    registry: Arc<InnovationRegistry>,
    mutator: Arc<dyn Mutator>,
}

impl Genome {
    /// Create a genome with `inputs` input nodes and `outputs` output nodes
    /// and no connections, mutated by [`DefaultMutator`].
    ///
    /// Node ids are positions: inputs `0..inputs`, outputs after them.
    ///
    /// # Errors
    ///
    /// Fails when either count is zero or the nodes would not fit in `u32` ids.
    pub fn new(
        inputs: usize,
        outputs: usize,
        registry: Arc<InnovationRegistry>,
    ) -> Result<Self, GenomeError> {
        Self::with_mutator(inputs, outputs, registry, Arc::new(DefaultMutator::default()))
    }

    /// Same as [`Genome::new`] with an explicit mutation strategy.
    ///
    /// # Errors
    ///
    /// See [`Genome::new`].
    pub fn with_mutator(
        inputs: usize,
        outputs: usize,
        registry: Arc<InnovationRegistry>,
        mutator: Arc<dyn Mutator>,
    ) -> Result<Self, GenomeError> {
        if inputs == 0 {
            return Err(GenomeError::NoInputs);
        }
        if outputs == 0 {
            return Err(GenomeError::NoOutputs);
        }
        let total = inputs
            .checked_add(outputs)
            .filter(|&n| u32::try_from(n).is_ok())
            .ok_or(GenomeError::TooManyNodes { inputs, outputs })?;

        let mut genome = Self {
            nodes: Vec::with_capacity(total),
            innovations: Vec::new(),
            known_hashes: HashSet::new(),
            node_index: HashMap::with_capacity(total),
            num_inputs: inputs,
            num_outputs: outputs,
            registry,
            mutator,
        };

        // `total` fits in u32, so every position does too
        for position in 0..total as u32 {
            let id = NodeId(position);
            let node = if (position as usize) < inputs {
                Node::input(id)
            } else {
                Node::output(id)
            };
            genome.add_node(node);
        }

        Ok(genome)
    }

    /// Append a node. Id uniqueness is the caller's responsibility; on a
    /// repeated id, lookups by id resolve to the first node.
    pub fn add_node(&mut self, node: Node) {
        self.node_index.entry(node.id).or_insert(self.nodes.len());
        self.nodes.push(node);
    }

    /// Register `innovation` with the shared registry, append the local copy
    /// and remember its structural hash. Returns the canonical id.
    ///
    /// Does not check for a local duplicate; mutators do that first.
    pub fn add_innovation(&mut self, mut innovation: Innovation) -> u64 {
        let id = self.registry.register(&mut innovation);
        self.known_hashes.insert(innovation.hash());
        self.innovations.push(innovation);
        id
    }

    /// Enable or disable the innovation at `index`.
    ///
    /// # Errors
    ///
    /// Fails if `index` is out of bounds.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<(), GenomeError> {
        let len = self.innovations.len();
        let innovation = self
            .innovations
            .get_mut(index)
            .ok_or(GenomeError::UnknownInnovation { index, len })?;
        innovation.enabled = enabled;
        Ok(())
    }

    /// Mutable access to connection weights, in innovation order.
    pub fn weights_mut(&mut self) -> impl Iterator<Item = &mut f32> + '_ {
        self.innovations.iter_mut().map(|inn| &mut inn.weight)
    }

    /// Rebuild every node's incoming and outgoing lists from the enabled
    /// innovations, discarding the previous wiring.
    ///
    /// Call again after any mutation; staleness is not tracked.
    pub fn generate_phenotype(&mut self) {
        for node in &mut self.nodes {
            node.clear_wiring();
        }

        for (index, innovation) in self.innovations.iter().enumerate() {
            if !innovation.enabled {
                continue;
            }
            let source = self.node_index.get(&innovation.source).copied();
            let destination = self.node_index.get(&innovation.destination).copied();
            match (source, destination) {
                (Some(source), Some(destination)) => {
                    self.nodes[source].outgoing.push(index);
                    self.nodes[destination].incoming.push(index);
                }
                _ => warn!(
                    id = innovation.id,
                    source = %innovation.source,
                    destination = %innovation.destination,
                    "innovation endpoint missing from genome, not wired"
                ),
            }
        }
    }

    /// Apply the genome's mutator's AddNode.
    pub fn mutate_add_node(&mut self, rng: &mut dyn RngCore) -> AddNodeOutcome {
        let mutator = Arc::clone(&self.mutator);
        mutator.add_node(self, rng)
    }

    /// Apply the genome's mutator's AddConnection.
    pub fn mutate_add_connection(&mut self, rng: &mut dyn RngCore) -> AddConnectionOutcome {
        let mutator = Arc::clone(&self.mutator);
        mutator.add_connection(self, rng)
    }

    /// Run one full mutation round with the genome's mutator.
    pub fn mutate(&mut self, rng: &mut dyn RngCore) -> MutationReport {
        let mutator = Arc::clone(&self.mutator);
        mutator.mutate(self, rng)
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn innovations(&self) -> &[Innovation] {
        &self.innovations
    }

    #[must_use]
    pub fn known_hashes(&self) -> &HashSet<u64> {
        &self.known_hashes
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<InnovationRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn mutator(&self) -> &Arc<dyn Mutator> {
        &self.mutator
    }

    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Ids of the input nodes, in order.
    pub fn input_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[..self.num_inputs].iter().map(|n| n.id)
    }

    /// Ids of the output nodes, in order.
    pub fn output_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[self.num_inputs..self.num_inputs + self.num_outputs]
            .iter()
            .map(|n| n.id)
    }

    #[must_use]
    pub fn hidden_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Hidden)
            .map(|n| n.id)
            .collect()
    }

    /// Position of a node id in [`Genome::nodes`].
    #[must_use]
    pub fn node_position(&self, id: NodeId) -> Option<usize> {
        self.node_index.get(&id).copied()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_position(id).map(|pos| &self.nodes[pos])
    }

    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    /// Whether an innovation with this structural hash is present locally.
    #[must_use]
    pub fn contains_hash(&self, hash: u64) -> bool {
        self.known_hashes.contains(&hash)
    }

    /// Position of the local innovation with this structural hash.
    #[must_use]
    pub fn find_innovation(&self, hash: u64) -> Option<usize> {
        if !self.contains_hash(hash) {
            return None;
        }
        self.innovations.iter().position(|inn| inn.hash() == hash)
    }

    #[must_use]
    pub fn num_enabled(&self) -> usize {
        self.innovations.iter().filter(|inn| inn.enabled).count()
    }

    /// Smallest id greater than every node id in the genome, or `None` once
    /// the genome holds `u32::MAX`.
    #[must_use]
    pub fn next_free_node_id(&self) -> Option<NodeId> {
        let max = self.nodes.iter().map(|n| n.id.0).max().unwrap_or(0);
        max.checked_add(1).map(NodeId)
    }

    /// Positions of the innovations AddNode may split: every enabled one.
    #[must_use]
    pub fn eligible_connections(&self) -> Vec<usize> {
        self.innovations
            .iter()
            .enumerate()
            .filter(|(_, inn)| inn.enabled)
            .map(|(index, _)| index)
            .collect()
    }

    /// Nodes a new connection may start from (input, bias, hidden).
    #[must_use]
    pub fn eligible_sources(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.kind.can_originate())
            .map(|n| n.id)
            .collect()
    }

    /// Nodes a new connection may end at (output, hidden).
    #[must_use]
    pub fn eligible_destinations(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.kind.can_terminate())
            .map(|n| n.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::gene::NodeKind;

    fn genome(inputs: usize, outputs: usize) -> Genome {
        Genome::new(inputs, outputs, InnovationRegistry::shared()).unwrap()
    }

    #[test]
    fn test_minimal_genome() {
        let g = genome(3, 2);
        assert_eq!(g.nodes().len(), 5);
        assert!(g.innovations().is_empty());

        let ids: Vec<u32> = g.nodes().iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(g.input_ids().count(), 3);
        assert_eq!(g.output_ids().collect::<Vec<_>>(), vec![NodeId(3), NodeId(4)]);
        assert!(g.nodes()[..3].iter().all(|n| n.kind == NodeKind::Input));
        assert!(g.nodes()[3..].iter().all(|n| n.kind == NodeKind::Output));
    }

    #[test]
    fn test_zero_counts_rejected() {
        let registry = InnovationRegistry::shared();
        assert_eq!(
            Genome::new(0, 2, Arc::clone(&registry)).unwrap_err(),
            GenomeError::NoInputs
        );
        assert_eq!(
            Genome::new(2, 0, registry).unwrap_err(),
            GenomeError::NoOutputs
        );
    }

    #[test]
    fn test_add_node_appends() {
        let mut g = genome(3, 2);
        g.add_node(Node::hidden(NodeId(12), Activation::Tanh));

        assert_eq!(g.nodes().len(), 6);
        assert_eq!(g.nodes()[5].id, NodeId(12));
        assert_eq!(g.next_free_node_id(), Some(NodeId(13)));
        assert!(g.contains_node(NodeId(12)));
    }

    #[test]
    fn test_next_free_node_id_exhausted() {
        let mut g = genome(1, 1);
        g.add_node(Node::hidden(NodeId(u32::MAX), Activation::Tanh));
        assert_eq!(g.next_free_node_id(), None);
    }

    #[test]
    fn test_mutator_getter_is_shared() {
        let g = genome(1, 1);
        let clone = g.clone();
        assert!(Arc::ptr_eq(g.mutator(), clone.mutator()));
        assert_eq!(g.mutator().config(), &crate::mutator::MutationConfig::default());
    }

    #[test]
    fn test_add_innovation_records_hash_and_id() {
        let mut g = genome(2, 1);
        let inn = Innovation::new(NodeId(0), NodeId(2), 0.4);
        let hash = inn.hash();

        let id = g.add_innovation(inn);

        assert_eq!(g.innovations().len(), 1);
        assert_eq!(g.innovations()[0].id, id);
        assert!(g.contains_hash(hash));
        assert_eq!(g.registry().id_of(hash), Some(id));
        assert_eq!(g.find_innovation(hash), Some(0));
    }

    #[test]
    fn test_set_enabled_bounds() {
        let mut g = genome(1, 1);
        g.add_innovation(Innovation::new(NodeId(0), NodeId(1), 1.0));

        g.set_enabled(0, false).unwrap();
        assert_eq!(g.num_enabled(), 0);
        assert_eq!(
            g.set_enabled(3, true),
            Err(GenomeError::UnknownInnovation { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_eligible_nodes_count_hidden_twice() {
        let mut g = genome(3, 2);
        g.add_node(Node::hidden(NodeId(5), Activation::Sigmoid));

        assert_eq!(g.eligible_sources().len(), 4);
        assert_eq!(g.eligible_destinations().len(), 3);
        assert!(g.eligible_sources().contains(&NodeId(5)));
        assert!(g.eligible_destinations().contains(&NodeId(5)));
    }

    #[test]
    fn test_eligible_connections_skip_disabled() {
        let mut g = genome(2, 1);
        g.add_innovation(Innovation::disabled(NodeId(0), NodeId(2), 1.0));
        g.add_innovation(Innovation::new(NodeId(1), NodeId(2), 1.0));
        assert_eq!(g.eligible_connections(), vec![1]);
    }

    #[test]
    fn test_phenotype_wires_enabled_only() {
        let mut g = genome(2, 1);
        g.add_innovation(Innovation::new(NodeId(0), NodeId(2), 0.5));
        g.add_innovation(Innovation::disabled(NodeId(1), NodeId(2), 0.5));

        g.generate_phenotype();

        assert_eq!(g.nodes()[0].outgoing, vec![0]);
        assert!(g.nodes()[1].outgoing.is_empty());
        assert_eq!(g.nodes()[2].incoming, vec![0]);
    }

    #[test]
    fn test_phenotype_rebuild_is_idempotent_and_incremental() {
        let mut g = genome(2, 1);
        g.add_innovation(Innovation::new(NodeId(0), NodeId(2), 0.5));
        g.generate_phenotype();
        g.generate_phenotype();
        assert_eq!(g.nodes()[2].incoming, vec![0]);

        g.add_node(Node::hidden(NodeId(3), Activation::Tanh));
        g.add_innovation(Innovation::new(NodeId(1), NodeId(3), 1.0));
        g.add_innovation(Innovation::new(NodeId(3), NodeId(2), 1.0));
        g.generate_phenotype();

        assert_eq!(g.nodes()[0].outgoing, vec![0]);
        assert_eq!(g.nodes()[1].outgoing, vec![1]);
        assert_eq!(g.nodes()[2].incoming, vec![0, 2]);
        assert_eq!(g.nodes()[3].incoming, vec![1]);
        assert_eq!(g.nodes()[3].outgoing, vec![2]);
    }

    #[test]
    fn test_phenotype_drops_newly_disabled_edges() {
        let mut g = genome(1, 1);
        g.add_innovation(Innovation::new(NodeId(0), NodeId(1), 0.5));
        g.generate_phenotype();
        assert_eq!(g.nodes()[1].incoming.len(), 1);

        g.set_enabled(0, false).unwrap();
        g.generate_phenotype();
        assert!(g.nodes()[1].incoming.is_empty());
        assert!(g.nodes()[0].outgoing.is_empty());
    }

    #[test]
    fn test_phenotype_skips_unknown_endpoint() {
        let mut g = genome(1, 1);
        g.add_innovation(Innovation::new(NodeId(0), NodeId(40), 0.5));
        g.generate_phenotype();
        assert!(g.nodes().iter().all(|n| n.outgoing.is_empty()));
    }
}
