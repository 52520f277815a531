//! # NEAT Innovation
//!
//! NeuroEvolution of Augmenting Topologies (NEAT) genomes whose structural
//! mutations are canonicalized by a shared innovation registry.
//!
//! ## Features
//!
//! - **Shared Innovation Registry**: the same edge discovered by any genome of a
//!   run gets one global id; the same split yields the same hidden node
//! - **Structural Hashing**: edge identity is `Hash(source, destination)`, never
//!   weight or enabled state
//! - **Pluggable Mutators**: [`Mutator`] exposes AddNode, AddConnection, weight
//!   perturbation and toggling; strategies are picked per genome
//! - **Phenotype Wiring**: every node lists its enabled incoming and outgoing
//!   innovations, rebuilt on demand and evaluable feed-forward
//!
//! ## Quick Start
//!
//! ```rust
//! use neat_innovation::{AddNodeOutcome, FeedForwardNetwork, Genome, InnovationRegistry};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let registry = InnovationRegistry::shared();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//!
//! let mut genome = Genome::new(2, 1, registry.clone()).unwrap();
//! genome.mutate_add_connection(&mut rng);
//! assert!(matches!(genome.mutate_add_node(&mut rng), AddNodeOutcome::Success { .. }));
//!
//! genome.generate_phenotype();
//! let mut network = FeedForwardNetwork::compile(&genome).unwrap();
//! let output = network.activate(&[0.5, -0.5]).unwrap();
//! assert_eq!(output.len(), 1);
//! assert_eq!(registry.count(), 3);
//! ```
//!
//! ## Architecture
//!
//! ### Innovation Registry
//!
//! One [`InnovationRegistry`] is built per evolutionary run and shared by
//! `Arc` with every genome. Registration is a read-then-write critical section
//! on a `parking_lot::RwLock`, so genomes on different threads proposing the
//! same edge receive a single id. [`InnovationRegistry::clear`] isolates runs.
//!
//! ### Arena Genomes
//!
//! Nodes and innovations are append-only `Vec` arenas. Node adjacency is a list
//! of innovation positions, rebuilt by [`Genome::generate_phenotype`].
//!
//! ### Cycles
//!
//! [`DefaultMutator`] lets genomes grow recurrent edges. [`FeedForwardMutator`]
//! keeps them acyclic, which [`FeedForwardNetwork`] requires.

pub mod activation;
pub mod evaluator;
pub mod gene;
pub mod genome;
pub mod innovation;
pub mod mutator;
pub mod topology;

pub use activation::Activation;
pub use evaluator::{FeedForwardNetwork, NetworkError};
pub use gene::{Innovation, Node, NodeId, NodeKind, UNASSIGNED_ID};
pub use genome::{Genome, GenomeError};
pub use innovation::{split_hash, structural_hash, InnovationRegistry};
pub use mutator::{
    connect, split_connection, AddConnectionOutcome, AddNodeOutcome, ConfigError,
    DefaultMutator, FeedForwardMutator, MutationConfig, MutationReport, Mutator,
};
pub use topology::Topology;
