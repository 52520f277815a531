//! Structural and weight mutation strategies.
//!
//! [`Mutator`] exposes the whole operation set (AddNode, AddConnection, weight
//! perturbation, enable toggling and a combined round) with default bodies.
//! Strategies differ in how they pick the candidate edge for AddConnection:
//!
//! - [`DefaultMutator`] allows recurrent edges, including hidden self-loops.
//! - [`FeedForwardMutator`] only proposes edges that keep the enabled graph acyclic.
//!
//! Nothing-to-do results are outcomes, not errors: an evolutionary loop hits
//! them all the time.

use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::activation::Activation;
use crate::gene::{Innovation, Node, NodeId};
use crate::genome::Genome;
use crate::innovation::structural_hash;
use crate::topology::Topology;

/// Result of an AddNode mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddNodeOutcome {
    /// `split` was disabled and replaced through the new hidden `node`.
    Success { node: NodeId, split: usize },
    /// The genome has no enabled connection to split.
    NoEligibleConnections,
}

/// Result of an AddConnection mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddConnectionOutcome {
    /// A connection was added with the registry id `innovation`.
    Success { innovation: u64 },
    /// The candidate edge is already in the genome.
    AlreadyExists { hash: u64 },
    /// The strategy found no (source, destination) pair at all.
    NoCandidate,
}

/// What one [`Mutator::mutate`] round did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub weights_changed: usize,
    pub toggled: usize,
    pub add_connection: Option<AddConnectionOutcome>,
    pub add_node: Option<AddNodeOutcome>,
}

/// Invalid [`MutationConfig`] values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be a probability in [0, 1], got {value}")]
    Probability { name: &'static str, value: f32 },
    #[error("weight_range must be finite and positive, got {0}")]
    WeightRange(f32),
    #[error("weight_mutation_power must be finite and non-negative, got {0}")]
    MutationPower(f32),
    #[error("hidden_activations must not be empty")]
    EmptyPalette,
    #[error("connection_attempts must be at least 1")]
    NoAttempts,
}

/// Mutation probabilities and ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Probability of an AddConnection per round.
    pub add_connection_prob: f32,
    /// Probability of an AddNode per round.
    pub add_node_prob: f32,
    /// Per-connection probability of a weight change.
    pub weight_mutation_prob: f32,
    /// Maximum perturbation added to a weight.
    pub weight_mutation_power: f32,
    /// Probability that a weight change replaces the weight outright.
    pub weight_replace_prob: f32,
    /// New weights are drawn from [-weight_range, weight_range].
    pub weight_range: f32,
    /// Per-connection probability of flipping the enabled flag.
    pub toggle_enabled_prob: f32,
    /// Activations new hidden nodes draw from.
    pub hidden_activations: Vec<Activation>,
    /// Random draws [`DefaultMutator`] makes looking for an edge the genome lacks.
    pub connection_attempts: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            add_connection_prob: 0.05,
            add_node_prob: 0.03,
            weight_mutation_prob: 0.8,
            weight_mutation_power: 0.5,
            weight_replace_prob: 0.1,
            weight_range: 1.0,
            toggle_enabled_prob: 0.01,
            hidden_activations: vec![Activation::Sigmoid, Activation::Tanh],
            connection_attempts: 10,
        }
    }
}

impl MutationConfig {
    /// Structural mutations only, always attempted. Handy in tests.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            add_connection_prob: 1.0,
            add_node_prob: 1.0,
            weight_mutation_prob: 0.0,
            toggle_enabled_prob: 0.0,
            hidden_activations: vec![Activation::Sigmoid],
            ..Default::default()
        }
    }

    /// Aggressive structural growth with the full activation palette.
    #[must_use]
    pub fn exploratory() -> Self {
        Self {
            add_connection_prob: 0.3,
            add_node_prob: 0.1,
            hidden_activations: Activation::ALL.to_vec(),
            ..Default::default()
        }
    }

    /// # Errors
    ///
    /// Returns the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("add_connection_prob", self.add_connection_prob),
            ("add_node_prob", self.add_node_prob),
            ("weight_mutation_prob", self.weight_mutation_prob),
            ("weight_replace_prob", self.weight_replace_prob),
            ("toggle_enabled_prob", self.toggle_enabled_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        if !self.weight_range.is_finite() || self.weight_range <= 0.0 {
            return Err(ConfigError::WeightRange(self.weight_range));
        }
        if !self.weight_mutation_power.is_finite() || self.weight_mutation_power < 0.0 {
            return Err(ConfigError::MutationPower(self.weight_mutation_power));
        }
        if self.hidden_activations.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        if self.connection_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }

    fn random_weight(&self, rng: &mut dyn RngCore) -> f32 {
        rng.random_range(-self.weight_range..=self.weight_range)
    }

    fn pick_activation(&self, rng: &mut dyn RngCore) -> Activation {
        if self.hidden_activations.is_empty() {
            return Activation::default();
        }
        self.hidden_activations[rng.random_range(0..self.hidden_activations.len())]
    }
}

/// A mutation strategy applied to genomes in place.
///
/// Implementors supply the config and the AddConnection candidate choice;
/// every operation has a default body built on those two.
pub trait Mutator: fmt::Debug + Send + Sync {
    fn config(&self) -> &MutationConfig;

    /// Candidate `(source, destination)` for AddConnection, or `None` when the
    /// genome offers no pair at all.
    fn choose_connection(
        &self,
        genome: &Genome,
        rng: &mut dyn RngCore,
    ) -> Option<(NodeId, NodeId)>;

    /// Split a uniformly chosen enabled connection with a new hidden node.
    fn add_node(&self, genome: &mut Genome, rng: &mut dyn RngCore) -> AddNodeOutcome {
        let eligible = genome.eligible_connections();
        if eligible.is_empty() {
            trace!("no enabled connection to split");
            return AddNodeOutcome::NoEligibleConnections;
        }
        let index = eligible[rng.random_range(0..eligible.len())];
        let activation = self.config().pick_activation(rng);
        split_connection(genome, index, activation)
    }

    /// Add the edge picked by [`Mutator::choose_connection`] unless the genome
    /// already holds it.
    fn add_connection(&self, genome: &mut Genome, rng: &mut dyn RngCore) -> AddConnectionOutcome {
        let Some((source, destination)) = self.choose_connection(genome, rng) else {
            trace!("no connection candidate");
            return AddConnectionOutcome::NoCandidate;
        };
        let weight = self.config().random_weight(rng);
        connect(genome, source, destination, weight)
    }

    /// Perturb or replace weights; returns how many changed.
    ///
    /// Weights are clamped to ten times `weight_range`.
    fn perturb_weights(&self, genome: &mut Genome, rng: &mut dyn RngCore) -> usize {
        let config = self.config();
        let limit = config.weight_range * 10.0;
        let mut changed = 0;

        for weight in genome.weights_mut() {
            if rng.random::<f32>() >= config.weight_mutation_prob {
                continue;
            }
            if rng.random::<f32>() < config.weight_replace_prob {
                *weight = config.random_weight(rng);
            } else {
                *weight += rng.random_range(-1.0f32..=1.0) * config.weight_mutation_power;
            }
            *weight = (*weight).clamp(-limit, limit);
            changed += 1;
        }

        changed
    }

    /// Flip enabled flags at `toggle_enabled_prob`; returns how many flipped.
    fn toggle_connections(&self, genome: &mut Genome, rng: &mut dyn RngCore) -> usize {
        let mut toggled = 0;
        for index in 0..genome.innovations().len() {
            if rng.random::<f32>() >= self.config().toggle_enabled_prob {
                continue;
            }
            let enabled = !genome.innovations()[index].enabled;
            if genome.set_enabled(index, enabled).is_ok() {
                toggled += 1;
            }
        }
        toggled
    }

    /// One round: weights, toggles, then AddConnection and AddNode each gated
    /// by its probability.
    fn mutate(&self, genome: &mut Genome, rng: &mut dyn RngCore) -> MutationReport {
        let weights_changed = self.perturb_weights(genome, rng);
        let toggled = self.toggle_connections(genome, rng);

        let add_connection = (rng.random::<f32>() < self.config().add_connection_prob)
            .then(|| self.add_connection(genome, rng));
        let add_node =
            (rng.random::<f32>() < self.config().add_node_prob).then(|| self.add_node(genome, rng));

        MutationReport {
            weights_changed,
            toggled,
            add_connection,
            add_node,
        }
    }
}

/// Split the innovation at `index` with a new hidden node.
///
/// The original is disabled; `source -> new` gets weight 1.0 and
/// `new -> destination` the original weight, so the network's behavior barely
/// moves. Both edges go through the registry, so the same split elsewhere in
/// the population yields the same node and innovation ids.
///
/// Leaves the genome unchanged and reports `NoEligibleConnections` when no
/// node id is left to allocate.
pub fn split_connection(genome: &mut Genome, index: usize, activation: Activation) -> AddNodeOutcome {
    let original = match genome.innovations().get(index) {
        Some(inn) if inn.enabled => inn.clone(),
        _ => return AddNodeOutcome::NoEligibleConnections,
    };

    let Some(node) = genome.registry().split_node_id(
        &original,
        genome.next_free_node_id(),
        |id| genome.contains_node(id),
    ) else {
        return AddNodeOutcome::NoEligibleConnections;
    };
    if genome.set_enabled(index, false).is_err() {
        return AddNodeOutcome::NoEligibleConnections;
    }
    genome.add_node(Node::hidden(node, activation));
    genome.add_innovation(Innovation::new(original.source, node, 1.0));
    genome.add_innovation(Innovation::new(node, original.destination, original.weight));

    debug!(
        node = %node,
        source = %original.source,
        destination = %original.destination,
        "split connection"
    );
    AddNodeOutcome::Success { node, split: index }
}

/// Add `source -> destination` with `weight` unless the genome already has
/// an edge with that structural hash.
///
/// Duplicates are judged against the genome only; an edge known to the
/// registry from other genomes is added here with the shared id.
pub fn connect(
    genome: &mut Genome,
    source: NodeId,
    destination: NodeId,
    weight: f32,
) -> AddConnectionOutcome {
    let hash = structural_hash(source, destination);
    if genome.contains_hash(hash) {
        trace!(source = %source, destination = %destination, "connection already exists");
        return AddConnectionOutcome::AlreadyExists { hash };
    }

    let innovation = genome.add_innovation(Innovation::new(source, destination, weight));
    debug!(innovation, source = %source, destination = %destination, "added connection");
    AddConnectionOutcome::Success { innovation }
}

/// Uniform candidates from the eligible sets; recurrent edges allowed.
#[derive(Debug, Clone, Default)]
pub struct DefaultMutator {
    config: MutationConfig,
}

impl DefaultMutator {
    /// # Errors
    ///
    /// Rejects a config that fails [`MutationConfig::validate`].
    pub fn new(config: MutationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Mutator for DefaultMutator {
    fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Draws up to `connection_attempts` pairs and returns the first the
    /// genome lacks, or the last draw if every one is already present.
    fn choose_connection(
        &self,
        genome: &Genome,
        rng: &mut dyn RngCore,
    ) -> Option<(NodeId, NodeId)> {
        let sources = genome.eligible_sources();
        let destinations = genome.eligible_destinations();
        if sources.is_empty() || destinations.is_empty() {
            return None;
        }

        let mut candidate = None;
        for _ in 0..self.config.connection_attempts.max(1) {
            let pair = (
                sources[rng.random_range(0..sources.len())],
                destinations[rng.random_range(0..destinations.len())],
            );
            candidate = Some(pair);
            if !genome.contains_hash(structural_hash(pair.0, pair.1)) {
                break;
            }
        }
        candidate
    }
}

/// Keeps the enabled graph acyclic so it stays evaluable by
/// [`FeedForwardNetwork`](crate::evaluator::FeedForwardNetwork).
#[derive(Debug, Clone, Default)]
pub struct FeedForwardMutator {
    config: MutationConfig,
}

impl FeedForwardMutator {
    /// # Errors
    ///
    /// Rejects a config that fails [`MutationConfig::validate`].
    pub fn new(config: MutationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Mutator for FeedForwardMutator {
    fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Uniform among acyclic pairs the genome lacks; when every acyclic pair
    /// is present, a present one (which AddConnection reports as existing).
    fn choose_connection(
        &self,
        genome: &Genome,
        rng: &mut dyn RngCore,
    ) -> Option<(NodeId, NodeId)> {
        let topology = Topology::from_genome(genome);
        let destinations = genome.eligible_destinations();

        let (fresh, present): (Vec<_>, Vec<_>) = genome
            .eligible_sources()
            .into_iter()
            .flat_map(|s| destinations.iter().map(move |&d| (s, d)))
            .filter(|&(s, d)| !topology.would_create_cycle(s, d))
            .partition(|&(s, d)| !genome.contains_hash(structural_hash(s, d)));

        let pool = if fresh.is_empty() { present } else { fresh };
        if pool.is_empty() {
            return None;
        }
        Some(pool[rng.random_range(0..pool.len())])
    }

    /// Disabling is always safe; re-enabling is skipped when it would close a cycle.
    fn toggle_connections(&self, genome: &mut Genome, rng: &mut dyn RngCore) -> usize {
        let mut toggled = 0;
        for index in 0..genome.innovations().len() {
            if rng.random::<f32>() >= self.config.toggle_enabled_prob {
                continue;
            }
            let inn = &genome.innovations()[index];
            let enable = !inn.enabled;
            let (source, destination) = (inn.source, inn.destination);
            if enable && Topology::from_genome(genome).would_create_cycle(source, destination) {
                continue;
            }
            if genome.set_enabled(index, enable).is_ok() {
                toggled += 1;
            }
        }
        toggled
    }
}
