//! Canned spring networks and marker payloads.
//!
//! - [`spring_chain`]: `n` nodes joined in a line.
//! - [`spring_ring`]: `n` nodes joined in a closed loop.
//! - [`mixed_payloads`]: alternating spring and target-point payloads.

use tether_core::NodeIndex;
use tether_stash::{
    MarkerStash, SpringForceSpec, SpringNetworkBuilder, Stashable, TargetPointForceSpec,
};

/// Stiffness used by every fixture spring.
pub const FIXTURE_STIFFNESS: f64 = 100.0;
/// Rest length used by every fixture spring.
pub const FIXTURE_REST_LENGTH: f64 = 0.25;

fn build(edges: impl IntoIterator<Item = (NodeIndex, NodeIndex)>) -> Vec<SpringForceSpec> {
    let mut builder = SpringNetworkBuilder::new();
    for (a, b) in edges {
        builder
            .add_edge(a, b, 0, FIXTURE_STIFFNESS, FIXTURE_REST_LENGTH)
            .expect("fixture edges are valid");
    }
    builder.build()
}

/// Records for nodes `0..n` joined in a line. `n - 1` springs in total.
pub fn spring_chain(n: NodeIndex) -> Vec<SpringForceSpec> {
    build((1..n.max(1)).map(|i| (i - 1, i)))
}

/// Records for nodes `0..n` joined in a closed loop. `n` springs for
/// `n >= 3`.
pub fn spring_ring(n: NodeIndex) -> Vec<SpringForceSpec> {
    assert!(n >= 3, "a ring needs at least three nodes");
    build((0..n).map(|i| (i, (i + 1) % n)))
}

/// `n` payloads whose master is their position; even positions carry a
/// spring to the next node, odd ones a target point.
pub fn mixed_payloads(n: NodeIndex) -> Vec<Stashable> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                SpringForceSpec::new(
                    i,
                    vec![i + 1],
                    vec![0],
                    vec![FIXTURE_STIFFNESS],
                    vec![FIXTURE_REST_LENGTH],
                )
                .expect("fixture record is valid")
                .into()
            } else {
                TargetPointForceSpec::new(i, FIXTURE_STIFFNESS, [i as f64, 0.5, 0.0]).into()
            }
        })
        .collect()
}

/// A stash with each of [`mixed_payloads`] attached to its master index.
pub fn populated_stash(n: NodeIndex) -> MarkerStash {
    let mut stash = MarkerStash::new();
    for payload in mixed_payloads(n) {
        stash.attach(payload.master_index(), payload);
    }
    stash
}
