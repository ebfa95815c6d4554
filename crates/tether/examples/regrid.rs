//! Regrid demo: a spring ring spread over four in-process ranks migrates
//! half of its markers one rank up, renumbering them on arrival.
//!
//! Run with `cargo run -p tether --example regrid`.

use std::thread;

use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use tether::prelude::*;

const RANKS: usize = 4;
const NODES: NodeIndex = 32;
/// Each rank numbers its local nodes from `rank * LOCAL_BASE`.
const LOCAL_BASE: NodeIndex = 1_000;

fn ring() -> Vec<SpringForceSpec> {
    let mut builder = SpringNetworkBuilder::new();
    for i in 0..NODES {
        builder
            .add_edge(i, (i + 1) % NODES, 0, 80.0, 0.2)
            .expect("ring edges are distinct");
    }
    builder.build()
}

fn run_rank(comm: ChannelCommunicator) -> Result<(usize, MigrationStats, usize), StashError> {
    let rank = comm.rank();
    let mut registry = StashableRegistry::new();
    registry.register::<SpringForceSpec>();
    registry.register::<TargetPointForceSpec>();
    registry.verify_collective(&comm)?;

    // Round-robin ownership, shifted into this rank's numbering.
    let mut stash = MarkerStash::new();
    for mut spec in ring() {
        if spec.master_index() as usize % RANKS != rank {
            continue;
        }
        spec.apply_offset(rank as NodeIndex * LOCAL_BASE)?;
        stash.attach(spec.master_index(), spec.into());
    }
    let anchor = rank as NodeIndex * LOCAL_BASE;
    stash.attach(
        anchor + NODES,
        TargetPointForceSpec::new(anchor + NODES, 500.0, [rank as f64, 0.0, 0.0]).into(),
    );

    let stats = stash.migrate(
        &comm,
        &registry,
        |marker, _| {
            if (marker / 2) % 2 == 0 {
                (rank + 1) % RANKS
            } else {
                rank
            }
        },
        |source| (rank as NodeIndex - source as NodeIndex) * LOCAL_BASE,
    )?;
    Ok((rank, stats, stash.len()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::new().with_level(LevelFilter::Info).init()?;

    let handles: Vec<_> = ChannelCommunicator::group(RANKS)
        .into_iter()
        .map(|comm| thread::spawn(move || run_rank(comm)))
        .collect();

    let mut total = 0;
    for handle in handles {
        let (rank, stats, held) = handle
            .join()
            .map_err(|_| "rank thread panicked")??;
        info!(
            "rank {rank}: {} departed, {} arrived, {} retained, {held} held",
            stats.departed, stats.arrived, stats.retained
        );
        total += held;
    }
    info!("{total} payloads held across {RANKS} ranks");
    Ok(())
}
