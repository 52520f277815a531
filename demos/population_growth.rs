//! Grow a population of genomes on several threads against one registry.
//!
//! Every worker mutates its own slice of the population. Because all genomes
//! share the same innovation registry, an edge discovered by two workers
//! independently still ends up with one id.
//!
//! Run with: `cargo run --example population_growth`

use std::collections::HashSet;
use std::sync::Arc;

use neat_innovation::{
    AddConnectionOutcome, AddNodeOutcome, FeedForwardMutator, FeedForwardNetwork, Genome,
    InnovationRegistry, MutationConfig,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const WORKERS: u64 = 4;
const GENOMES_PER_WORKER: usize = 25;
const GENERATIONS: usize = 30;

#[derive(Default)]
struct Tally {
    connections: usize,
    duplicates: usize,
    splits: usize,
}

fn main() {
    println!("NEAT Population Growth");
    println!("======================\n");

    let registry = InnovationRegistry::shared();
    let config = MutationConfig {
        add_connection_prob: 0.5,
        add_node_prob: 0.2,
        ..MutationConfig::exploratory()
    };
    let mutator = Arc::new(FeedForwardMutator::new(config).expect("valid config"));

    let results: Vec<(Vec<Genome>, Tally)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                let mutator = mutator.clone();
                scope.spawn(move || {
                    let mut rng = ChaCha8Rng::seed_from_u64(worker);
                    let mut tally = Tally::default();
                    let mut genomes: Vec<Genome> = (0..GENOMES_PER_WORKER)
                        .map(|_| {
                            Genome::with_mutator(3, 2, Arc::clone(&registry), mutator.clone())
                                .expect("valid shape")
                        })
                        .collect();

                    for _ in 0..GENERATIONS {
                        for genome in &mut genomes {
                            let report = genome.mutate(&mut rng);
                            match report.add_connection {
                                Some(AddConnectionOutcome::Success { .. }) => tally.connections += 1,
                                Some(AddConnectionOutcome::AlreadyExists { .. }) => {
                                    tally.duplicates += 1;
                                }
                                _ => {}
                            }
                            if let Some(AddNodeOutcome::Success { .. }) = report.add_node {
                                tally.splits += 1;
                            }
                        }
                    }
                    (genomes, tally)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    });

    let mut local_genes = 0;
    let mut distinct = HashSet::new();
    let mut largest = None::<Genome>;
    for (worker, (genomes, tally)) in results.into_iter().enumerate() {
        println!(
            "worker {worker}: {} connections added, {} duplicates, {} splits",
            tally.connections, tally.duplicates, tally.splits
        );
        for genome in genomes {
            local_genes += genome.innovations().len();
            distinct.extend(genome.innovations().iter().map(|inn| inn.id));
            let bigger = largest
                .as_ref()
                .map_or(true, |best| genome.nodes().len() > best.nodes().len());
            if bigger {
                largest = Some(genome);
            }
        }
    }

    println!("\nLocal connection genes:  {local_genes}");
    println!("Distinct innovation ids: {}", distinct.len());
    println!("Registry innovations:    {}", registry.count());
    println!("Registry node splits:    {}", registry.split_count());

    if let Some(mut genome) = largest {
        genome.generate_phenotype();
        println!(
            "\nLargest genome: {} nodes, {} of {} connections enabled",
            genome.nodes().len(),
            genome.num_enabled(),
            genome.innovations().len()
        );
        match FeedForwardNetwork::compile(&genome) {
            Ok(mut network) => match network.activate(&[0.5, -0.25, 1.0]) {
                Ok(outputs) => println!("Outputs for [0.5, -0.25, 1.0]: {outputs:?}"),
                Err(e) => println!("Evaluation failed: {e}"),
            },
            Err(e) => println!("Compilation failed: {e}"),
        }
    }
}
