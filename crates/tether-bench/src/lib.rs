//! Benchmark profiles for Tether stashable force specifications.
//!
//! Provides seeded spring networks for benchmarks and examples:
//!
//! - [`lattice_profile`]: square lattice with random diagonal bracing
//! - [`reference_profile`]: 100x100 lattice (10K nodes)
//! - [`stress_profile`]: 316x316 lattice (~100K nodes)
//! - [`random_payloads`]: mixed spring/target payloads for stream benches

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tether_core::NodeIndex;
use tether_stash::{Spring, SpringForceSpec, SpringNetworkBuilder, Stashable, TargetPointForceSpec};

/// Probability that a lattice cell gets a diagonal brace.
pub const BRACE_PROBABILITY: f64 = 0.25;

/// Build a `side` x `side` spring lattice.
///
/// Nodes are numbered row-major. Every node is joined to its right and
/// lower neighbour; each cell additionally gets a diagonal brace with
/// probability [`BRACE_PROBABILITY`]. Stiffness and rest length are drawn
/// from a ChaCha8 stream seeded with `seed`, so the same arguments always
/// produce the same records.
pub fn lattice_profile(side: NodeIndex, seed: u64) -> Vec<SpringForceSpec> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut builder = SpringNetworkBuilder::new();
    let node = |row: NodeIndex, col: NodeIndex| row * side + col;

    let add = |builder: &mut SpringNetworkBuilder,
               a: NodeIndex,
               b: NodeIndex,
               law: i32,
               rng: &mut ChaCha8Rng| {
        let stiffness: f64 = rng.gen_range(50.0..150.0);
        let rest_length: f64 = rng.gen_range(0.9..1.1);
        // Lattice edges are distinct and never self-loops.
        let _ = builder.add_edge(a, b, law, stiffness, rest_length);
    };

    for row in 0..side {
        for col in 0..side {
            if col + 1 < side {
                add(&mut builder, node(row, col), node(row, col + 1), 0, &mut rng);
            }
            if row + 1 < side {
                add(&mut builder, node(row, col), node(row + 1, col), 0, &mut rng);
            }
            if row + 1 < side && col + 1 < side && rng.gen_bool(BRACE_PROBABILITY) {
                add(
                    &mut builder,
                    node(row, col),
                    node(row + 1, col + 1),
                    1,
                    &mut rng,
                );
            }
        }
    }
    builder.build()
}

/// 100x100 lattice (10K nodes).
pub fn reference_profile(seed: u64) -> Vec<SpringForceSpec> {
    lattice_profile(100, seed)
}

/// 316x316 lattice (~100K nodes).
pub fn stress_profile(seed: u64) -> Vec<SpringForceSpec> {
    lattice_profile(316, seed)
}

/// `n` payloads, roughly one in four a target point, the rest springs with
/// up to eight neighbours each.
pub fn random_payloads(n: NodeIndex, seed: u64) -> Vec<Stashable> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|master| {
            if rng.gen_bool(0.25) {
                let target = [rng.gen::<f64>(), rng.gen::<f64>(), 0.0];
                return Stashable::from(TargetPointForceSpec::new(
                    master,
                    rng.gen_range(1.0..1e3),
                    target,
                ));
            }
            let count = rng.gen_range(1..=8usize);
            let mut spec = SpringForceSpec::default();
            spec.set_master_index(master);
            for _ in 0..count {
                spec.push_spring(Spring {
                    slave_index: rng.gen_range(0..n.max(1)),
                    force_law_index: rng.gen_range(0..4),
                    stiffness: rng.gen_range(1.0..1e3),
                    rest_length: rng.gen_range(0.1..2.0),
                });
            }
            Stashable::from(spec)
        })
        .collect()
}
