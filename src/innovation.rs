//! Structural hashing and the shared innovation registry.
//!
//! Every connection gene is identified structurally by
//! `Hash(source_node, destination_node)`. The [`InnovationRegistry`] maps each
//! structural hash to one canonical innovation carrying a global id from a
//! monotonically increasing counter, so the same edge discovered by any genome
//! of a run gets the same id.
//!
//! The registry is an explicit service: build one per run, share it through an
//! `Arc`, and [`clear`](InnovationRegistry::clear) it to isolate independent
//! runs. All access goes through a `parking_lot::RwLock`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, trace, warn};

use crate::gene::{Innovation, NodeId};

/// Mixed into split hashes so a node split never shares a key with an edge.
const SPLIT_MARKER: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// First id the registry hands out. Zero marks an unregistered innovation.
const FIRST_INNOVATION_ID: u64 = 1;

/// Deterministic hasher: FxHash-style multiply per byte, murmur3 finalizer.
///
/// `std`'s `DefaultHasher` is randomly keyed per process and is not usable
/// for ids that must agree across runs.
#[derive(Default)]
struct StructuralHasher {
    state: u64,
}

impl Hasher for StructuralHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = self
                .state
                .wrapping_mul(0x517c_c1b7_2722_0a95)
                .wrapping_add(u64::from(byte));
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        let mut h = self.state;
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
        h ^= h >> 33;
        h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
        h ^= h >> 33;
        h
    }
}

/// Structural hash of the edge `source -> destination`.
///
/// A pure function of the two endpoint ids. Order matters: `a -> b` and
/// `b -> a` are different edges.
#[inline]
#[must_use]
pub fn structural_hash(source: NodeId, destination: NodeId) -> u64 {
    let mut hasher = StructuralHasher::default();
    source.0.hash(&mut hasher);
    destination.0.hash(&mut hasher);
    hasher.finish()
}

/// Key under which the registry remembers the hidden node created by
/// splitting the edge with structural hash `edge_hash`.
#[inline]
#[must_use]
pub fn split_hash(edge_hash: u64) -> u64 {
    let mut hasher = StructuralHasher::default();
    edge_hash.hash(&mut hasher);
    SPLIT_MARKER.hash(&mut hasher);
    hasher.finish()
}

struct RegistryState {
    /// Structural hash -> canonical innovation. The canonical copy owns the id.
    canonical: HashMap<u64, Innovation>,
    /// Split hash -> hidden node id created by that split.
    split_nodes: HashMap<u64, NodeId>,
    next_id: u64,
    /// Lower bound for fresh split node ids; wider than `u32` so it can sit
    /// one past `u32::MAX`.
    next_node_id: u64,
}

impl RegistryState {
    fn empty() -> Self {
        Self {
            canonical: HashMap::new(),
            split_nodes: HashMap::new(),
            next_id: FIRST_INNOVATION_ID,
            next_node_id: 0,
        }
    }
}

/// Canonicalizes structural mutations to global ids across all genomes of a run.
pub struct InnovationRegistry {
    state: RwLock<RegistryState>,
}

impl Default for InnovationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InnovationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("InnovationRegistry")
            .field("innovations", &state.canonical.len())
            .field("splits", &state.split_nodes.len())
            .field("next_id", &state.next_id)
            .finish()
    }
}

impl InnovationRegistry {
    /// An empty registry with both counters at their start.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::empty()),
        }
    }

    /// A fresh registry ready to be handed to genomes.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Give `innovation` its canonical id and return it.
    ///
    /// A known structural hash yields the existing id; the caller's weight,
    /// enabled flag and proposed id do not touch the canonical copy. An unknown
    /// hash is assigned the next counter value and `innovation` becomes the
    /// canonical copy. Concurrent proposals of one edge get one id.
    pub fn register(&self, innovation: &mut Innovation) -> u64 {
        let hash = innovation.hash();

        if let Some(existing) = self.state.read().canonical.get(&hash) {
            check_endpoints(existing, innovation);
            innovation.id = existing.id;
            trace!(id = existing.id, hash, "reusing innovation");
            return existing.id;
        }

        let mut guard = self.state.write();
        let RegistryState {
            canonical, next_id, ..
        } = &mut *guard;

        // Another writer may have inserted the hash between the two locks.
        let id = match canonical.entry(hash) {
            Entry::Occupied(entry) => {
                check_endpoints(entry.get(), innovation);
                entry.get().id
            }
            Entry::Vacant(entry) => {
                let id = *next_id;
                *next_id += 1;
                innovation.id = id;
                entry.insert(innovation.clone());
                debug!(
                    id,
                    source = %innovation.source,
                    destination = %innovation.destination,
                    "new innovation"
                );
                id
            }
        };

        innovation.id = id;
        id
    }

    /// Hidden node id for splitting `edge`.
    ///
    /// Returns the id remembered for an earlier split of the same edge unless
    /// `in_use` reports it already taken in the splitting genome. Otherwise a
    /// fresh id no lower than `next_free` and not `in_use` is allocated (and
    /// remembered if the edge had no split yet).
    ///
    /// `None` when a fresh id is needed but the `u32` id space above
    /// `next_free` is used up, or `next_free` itself is `None`.
    pub fn split_node_id(
        &self,
        edge: &Innovation,
        next_free: Option<NodeId>,
        in_use: impl Fn(NodeId) -> bool,
    ) -> Option<NodeId> {
        let key = split_hash(edge.hash());
        let mut state = self.state.write();

        let remembered = state.split_nodes.get(&key).copied();
        if let Some(id) = remembered {
            if !in_use(id) {
                trace!(node = %id, "reusing split node");
                return Some(id);
            }
        }

        let Some(next_free) = next_free else {
            warn!(source = %edge.source, destination = %edge.destination, "node id space exhausted");
            return None;
        };
        let mut candidate = state.next_node_id.max(u64::from(next_free.0));
        let id = loop {
            let Ok(raw) = u32::try_from(candidate) else {
                warn!(source = %edge.source, destination = %edge.destination, "node id space exhausted");
                return None;
            };
            if !in_use(NodeId(raw)) {
                break NodeId(raw);
            }
            candidate += 1;
        };

        state.next_node_id = candidate + 1;
        if remembered.is_none() {
            state.split_nodes.insert(key, id);
        }
        debug!(node = %id, source = %edge.source, destination = %edge.destination, "new split node");
        Some(id)
    }

    /// Number of distinct canonical innovations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.state.read().canonical.len()
    }

    /// Number of distinct edge splits remembered.
    #[must_use]
    pub fn split_count(&self) -> usize {
        self.state.read().split_nodes.len()
    }

    #[must_use]
    pub fn contains(&self, hash: u64) -> bool {
        self.state.read().canonical.contains_key(&hash)
    }

    /// Id assigned to a structural hash, if any.
    #[must_use]
    pub fn id_of(&self, hash: u64) -> Option<u64> {
        self.state.read().canonical.get(&hash).map(|inn| inn.id)
    }

    /// Copy of the canonical innovation for a structural hash.
    #[must_use]
    pub fn canonical(&self, hash: u64) -> Option<Innovation> {
        self.state.read().canonical.get(&hash).cloned()
    }

    /// Forget every innovation and split and restart both counters.
    pub fn clear(&self) {
        let mut state = self.state.write();
        let dropped = state.canonical.len();
        *state = RegistryState::empty();
        info!(dropped, "innovation registry cleared");
    }
}

/// Two different edges landing on one 64-bit hash would silently share an id.
fn check_endpoints(canonical: &Innovation, proposed: &Innovation) {
    if canonical.source != proposed.source || canonical.destination != proposed.destination {
        error!(
            hash = proposed.hash(),
            canonical_source = %canonical.source,
            canonical_destination = %canonical.destination,
            source = %proposed.source,
            destination = %proposed.destination,
            "structural hash collision"
        );
    }
}
