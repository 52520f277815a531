//! Feed-forward execution of a genome's phenotype.
//!
//! [`FeedForwardNetwork::compile`] reads the wiring produced by
//! [`Genome::generate_phenotype`], orders nodes topologically and lays the
//! incoming edges of every node out in CSR form. Recurrent wiring cannot be
//! ordered and is rejected.

use thiserror::Error;

use crate::activation::Activation;
use crate::gene::NodeKind;
use crate::genome::Genome;
use crate::topology::Topology;

/// Errors from compiling or running a [`FeedForwardNetwork`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The phenotype wiring contains a cycle.
    #[error("phenotype contains a cycle; feed-forward evaluation needs an acyclic graph")]
    Cyclic,
    #[error("input length mismatch: expected {expected}, got {actual}")]
    InputMismatch { expected: usize, actual: usize },
    #[error("output buffer length mismatch: expected {expected}, got {actual}")]
    OutputMismatch { expected: usize, actual: usize },
}

/// Compiled, evaluation-ready phenotype.
#[derive(Debug, Clone)]
pub struct FeedForwardNetwork {
    /// Node values, indexed by genome node position.
    values: Vec<f32>,
    activations: Vec<Activation>,
    // Incoming edges of node i: sources/weights[offsets[i]..offsets[i + 1]]
    offsets: Vec<usize>,
    sources: Vec<usize>,
    weights: Vec<f32>,
    input_indices: Vec<usize>,
    bias_indices: Vec<usize>,
    output_indices: Vec<usize>,
    /// Hidden and output nodes in topological order.
    eval_order: Vec<usize>,
}

impl FeedForwardNetwork {
    /// Compile the genome's current phenotype wiring.
    ///
    /// Call [`Genome::generate_phenotype`] first; unwired nodes only see
    /// their activation of zero.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Cyclic`] when the wiring is recurrent.
    pub fn compile(genome: &Genome) -> Result<Self, NetworkError> {
        let order = Topology::from_phenotype(genome)
            .topological_order()
            .ok_or(NetworkError::Cyclic)?;

        let nodes = genome.nodes();
        let innovations = genome.innovations();

        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut sources = Vec::new();
        let mut weights = Vec::new();
        offsets.push(0);
        for node in nodes {
            for &index in &node.incoming {
                let Some(inn) = innovations.get(index) else {
                    continue;
                };
                if let Some(source) = genome.node_position(inn.source) {
                    sources.push(source);
                    weights.push(inn.weight);
                }
            }
            offsets.push(sources.len());
        }

        let positions_of = |kind: NodeKind| -> Vec<usize> {
            nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.kind == kind)
                .map(|(idx, _)| idx)
                .collect()
        };

        let eval_order = order
            .into_iter()
            .filter(|&idx| matches!(nodes[idx].kind, NodeKind::Hidden | NodeKind::Output))
            .collect();

        Ok(Self {
            values: vec![0.0; nodes.len()],
            activations: nodes.iter().map(|n| n.activation).collect(),
            offsets,
            sources,
            weights,
            input_indices: positions_of(NodeKind::Input),
            bias_indices: positions_of(NodeKind::Bias),
            output_indices: positions_of(NodeKind::Output),
            eval_order,
        })
    }

    /// Evaluate into a caller-provided output buffer.
    ///
    /// # Errors
    ///
    /// Input or output slices of the wrong length.
    pub fn activate_into(&mut self, inputs: &[f32], outputs: &mut [f32]) -> Result<(), NetworkError> {
        if inputs.len() != self.input_indices.len() {
            return Err(NetworkError::InputMismatch {
                expected: self.input_indices.len(),
                actual: inputs.len(),
            });
        }
        if outputs.len() != self.output_indices.len() {
            return Err(NetworkError::OutputMismatch {
                expected: self.output_indices.len(),
                actual: outputs.len(),
            });
        }

        self.values.fill(0.0);
        for (&idx, &value) in self.input_indices.iter().zip(inputs) {
            self.values[idx] = value;
        }
        for &idx in &self.bias_indices {
            self.values[idx] = 1.0;
        }

        for &idx in &self.eval_order {
            let sum: f32 = (self.offsets[idx]..self.offsets[idx + 1])
                .map(|edge| self.values[self.sources[edge]] * self.weights[edge])
                .sum();
            self.values[idx] = self.activations[idx].apply(sum);
        }

        for (out, &idx) in outputs.iter_mut().zip(&self.output_indices) {
            *out = self.values[idx];
        }
        Ok(())
    }

    /// Evaluate and return the output values in output-node order.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InputMismatch`] on a wrong input count.
    pub fn activate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError> {
        let mut outputs = vec![0.0; self.output_indices.len()];
        self.activate_into(inputs, &mut outputs)?;
        Ok(outputs)
    }

    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.input_indices.len()
    }

    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.output_indices.len()
    }

    #[must_use]
    pub fn num_connections(&self) -> usize {
        self.sources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{Innovation, Node, NodeId};
    use crate::innovation::InnovationRegistry;
    use crate::mutator::split_connection;

    fn single_edge(weight: f32) -> Genome {
        let mut g = Genome::new(1, 1, InnovationRegistry::shared()).unwrap();
        g.add_innovation(Innovation::new(NodeId(0), NodeId(1), weight));
        g.generate_phenotype();
        g
    }

    #[test]
    fn test_single_connection() {
        let mut net = FeedForwardNetwork::compile(&single_edge(0.5)).unwrap();
        assert_eq!(net.num_inputs(), 1);
        assert_eq!(net.num_outputs(), 1);

        let out = net.activate(&[2.0]).unwrap();
        let expected = Activation::Sigmoid.apply(1.0);
        assert!((out[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_unbuilt_phenotype_has_no_edges() {
        let mut g = Genome::new(1, 1, InnovationRegistry::shared()).unwrap();
        g.add_innovation(Innovation::new(NodeId(0), NodeId(1), 3.0));

        let mut net = FeedForwardNetwork::compile(&g).unwrap();
        assert_eq!(net.num_connections(), 0);
        let out = net.activate(&[1.0]).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_split_preserves_identity_path() {
        let mut g = Genome::new(1, 1, InnovationRegistry::shared()).unwrap();
        g.add_innovation(Innovation::new(NodeId(0), NodeId(1), 0.8));
        split_connection(&mut g, 0, Activation::Identity);
        g.generate_phenotype();

        let mut split = FeedForwardNetwork::compile(&g).unwrap();
        let mut direct = FeedForwardNetwork::compile(&single_edge(0.8)).unwrap();
        let a = split.activate(&[0.6]).unwrap()[0];
        let b = direct.activate(&[0.6]).unwrap()[0];
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_bias_node_feeds_constant() {
        let mut g = Genome::new(1, 1, InnovationRegistry::shared()).unwrap();
        g.add_node(Node::bias(NodeId(2)));
        g.add_innovation(Innovation::new(NodeId(2), NodeId(1), -0.5));
        g.generate_phenotype();

        let mut net = FeedForwardNetwork::compile(&g).unwrap();
        let out = net.activate(&[100.0]).unwrap();
        assert!((out[0] - Activation::Sigmoid.apply(-0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_recurrent_phenotype_rejected() {
        let mut g = Genome::new(1, 1, InnovationRegistry::shared()).unwrap();
        g.add_node(Node::hidden(NodeId(2), Activation::Tanh));
        g.add_innovation(Innovation::new(NodeId(0), NodeId(2), 1.0));
        g.add_innovation(Innovation::new(NodeId(2), NodeId(2), 1.0));
        g.add_innovation(Innovation::new(NodeId(2), NodeId(1), 1.0));
        g.generate_phenotype();

        assert_eq!(
            FeedForwardNetwork::compile(&g).unwrap_err(),
            NetworkError::Cyclic
        );
    }

    #[test]
    fn test_input_mismatch() {
        let mut net = FeedForwardNetwork::compile(&single_edge(1.0)).unwrap();
        assert_eq!(
            net.activate(&[1.0, 2.0]),
            Err(NetworkError::InputMismatch {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_error_display_mentions_cycle() {
        assert!(NetworkError::Cyclic.to_string().contains("cycle"));
    }
}
