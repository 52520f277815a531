//! Graph analysis over a genome's enabled edges in CSR form.
//!
//! Dense node indices are positions in [`Genome::nodes`]. Two sources of edges
//! are supported:
//!
//! - [`Topology::from_genome`] reads the enabled innovations directly, so it is
//!   always current. Mutators use it.
//! - [`Topology::from_phenotype`] reads the nodes' outgoing wiring, i.e. the
//!   graph as of the last [`Genome::generate_phenotype`]. The evaluator uses it.

use std::collections::VecDeque;

use crate::gene::NodeId;
use crate::genome::Genome;

/// Forward adjacency in compressed sparse row layout, plus in-degrees.
#[derive(Debug, Clone)]
pub struct Topology {
    node_count: usize,
    /// Successors of node i are `targets[offsets[i]..offsets[i + 1]]`.
    offsets: Vec<usize>,
    targets: Vec<usize>,
    in_degree: Vec<usize>,
    /// (node id, dense index) sorted by id for binary search.
    id_to_idx: Vec<(NodeId, usize)>,
}

impl Topology {
    /// Build from the genome's enabled innovations.
    #[must_use]
    pub fn from_genome(genome: &Genome) -> Self {
        let edges = genome
            .innovations()
            .iter()
            .filter(|inn| inn.enabled)
            .filter_map(|inn| {
                Some((
                    genome.node_position(inn.source)?,
                    genome.node_position(inn.destination)?,
                ))
            });
        Self::from_edges(genome, edges)
    }

    /// Build from the phenotype wiring.
    #[must_use]
    pub fn from_phenotype(genome: &Genome) -> Self {
        let innovations = genome.innovations();
        let edges = genome.nodes().iter().enumerate().flat_map(move |(from, node)| {
            node.outgoing.iter().filter_map(move |&index| {
                let inn = innovations.get(index)?;
                Some((from, genome.node_position(inn.destination)?))
            })
        });
        Self::from_edges(genome, edges)
    }

    fn from_edges(genome: &Genome, edges: impl Iterator<Item = (usize, usize)>) -> Self {
        let node_count = genome.nodes().len();
        let edges: Vec<(usize, usize)> = edges.collect();

        let mut counts = vec![0usize; node_count];
        let mut in_degree = vec![0usize; node_count];
        for &(from, to) in &edges {
            counts[from] += 1;
            in_degree[to] += 1;
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut running = 0;
        offsets.push(running);
        for &count in &counts {
            running += count;
            offsets.push(running);
        }

        let mut targets = vec![0usize; edges.len()];
        let mut write_pos = offsets[..node_count].to_vec();
        for &(from, to) in &edges {
            targets[write_pos[from]] = to;
            write_pos[from] += 1;
        }

        let mut id_to_idx: Vec<(NodeId, usize)> = genome
            .nodes()
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id, idx))
            .collect();
        id_to_idx.sort_by_key(|(id, _)| *id);

        Self {
            node_count,
            offsets,
            targets,
            in_degree,
            id_to_idx,
        }
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.targets.len()
    }

    /// Dense index of a node id.
    #[must_use]
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.id_to_idx
            .binary_search_by_key(&id, |(k, _)| *k)
            .ok()
            .map(|pos| self.id_to_idx[pos].1)
    }

    /// Successors of the node at dense index `idx`.
    #[inline]
    pub fn successors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.targets[self.offsets[idx]..self.offsets[idx + 1]]
            .iter()
            .copied()
    }

    /// Whether adding `from -> to` would close a cycle, self-loops included.
    ///
    /// Unknown ids never close a cycle.
    #[must_use]
    pub fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        let (Some(from_idx), Some(to_idx)) = (self.node_index(from), self.node_index(to)) else {
            return false;
        };
        if from_idx == to_idx {
            return true;
        }

        // Is `from` reachable from `to`?
        let mut visited = vec![false; self.node_count];
        let mut queue = VecDeque::from([to_idx]);
        visited[to_idx] = true;

        while let Some(current) = queue.pop_front() {
            for next in self.successors(current) {
                if next == from_idx {
                    return true;
                }
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }

        false
    }

    /// Kahn's algorithm; `None` if the graph has a cycle.
    #[must_use]
    pub fn topological_order(&self) -> Option<Vec<usize>> {
        let mut in_degree = self.in_degree.clone();
        let mut queue: VecDeque<usize> = (0..self.node_count)
            .filter(|&idx| in_degree[idx] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.node_count);
        while let Some(u) = queue.pop_front() {
            order.push(u);
            for v in self.successors(u) {
                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    queue.push_back(v);
                }
            }
        }

        (order.len() == self.node_count).then_some(order)
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.topological_order().is_none()
    }
}
