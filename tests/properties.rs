//! Property tests for structural hashing and id sharing.

use std::sync::Arc;

use neat_innovation::{structural_hash, Genome, Innovation, InnovationRegistry, NodeId};
use proptest::prelude::*;

proptest! {
    #[test]
    fn hash_ignores_weight_and_enabled(
        source in 0u32..64,
        destination in 0u32..64,
        w1 in -10.0f32..10.0,
        w2 in -10.0f32..10.0,
    ) {
        let a = Innovation::new(NodeId(source), NodeId(destination), w1);
        let b = Innovation::disabled(NodeId(source), NodeId(destination), w2);
        prop_assert_eq!(a.hash(), b.hash());
        prop_assert_eq!(a.hash(), structural_hash(NodeId(source), NodeId(destination)));
    }

    #[test]
    fn hash_is_direction_sensitive(source in 0u32..1000, destination in 0u32..1000) {
        prop_assume!(source != destination);
        prop_assert_ne!(
            structural_hash(NodeId(source), NodeId(destination)),
            structural_hash(NodeId(destination), NodeId(source))
        );
    }

    #[test]
    fn genomes_agree_on_ids(edges in prop::collection::vec((0u32..3, 3u32..5), 1..12)) {
        let registry = InnovationRegistry::shared();
        let mut a = Genome::new(3, 2, Arc::clone(&registry)).unwrap();
        let mut b = Genome::new(3, 2, Arc::clone(&registry)).unwrap();

        for &(s, d) in &edges {
            a.add_innovation(Innovation::new(NodeId(s), NodeId(d), 1.0));
        }
        // Reverse order so ids are assigned by `a` but looked up by `b`
        for &(s, d) in edges.iter().rev() {
            b.add_innovation(Innovation::new(NodeId(s), NodeId(d), -1.0));
        }

        for inn in b.innovations() {
            let expected = a.innovations().iter().find(|x| x.hash() == inn.hash()).map(|x| x.id);
            prop_assert_eq!(Some(inn.id), expected);
        }

        let mut distinct: Vec<_> = edges.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(registry.count(), distinct.len());
    }
}
