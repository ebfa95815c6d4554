//! Tether: stashable spring force specifications for distributed
//! immersed-boundary meshes.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tether sub-crates. For most users, adding `tether` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tether::prelude::*;
//!
//! // Every rank registers the same record types in the same order.
//! let mut registry = StashableRegistry::new();
//! registry.register::<SpringForceSpec>();
//! registry.register::<TargetPointForceSpec>();
//!
//! // A triangle of springs; each edge is owned by its lower endpoint.
//! let mut builder = SpringNetworkBuilder::new();
//! builder.add_edge(0, 1, 0, 10.0, 1.0).unwrap();
//! builder.add_edge(1, 2, 0, 10.0, 1.0).unwrap();
//! builder.add_edge(2, 0, 0, 10.0, 1.0).unwrap();
//!
//! let mut stash = MarkerStash::new();
//! for spec in builder.build() {
//!     stash.attach(spec.master_index(), spec.into());
//! }
//!
//! // Marker 1 leaves this rank.
//! let mut writer = StashWriter::new(Vec::new(), &registry, 0).unwrap();
//! assert_eq!(stash.pack_departing(&mut writer, |marker, _| marker == 1).unwrap(), 1);
//! let segment = writer.into_inner();
//!
//! // ...and arrives on a rank that numbers nodes from 50.
//! let mut arrived = MarkerStash::new();
//! let mut reader = StashReader::open(segment.as_slice(), &registry).unwrap();
//! arrived.unpack_arriving(&mut reader, 50).unwrap();
//! let spec = arrived.get(51).unwrap().as_spring_force().unwrap();
//! assert_eq!(spec.slave_indices(), &[52]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tether-core` | Node indices and wire tags |
//! | [`comm`] | `tether-comm` | Communicator trait and in-process channel ranks |
//! | [`stash`] | `tether-stash` | Records, registry, stream codec, marker storage |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Node indices and stashable wire tags (`tether-core`).
pub use tether_core as types;

/// Rank-to-rank messaging (`tether-comm`).
///
/// The [`comm::Communicator`] trait supplies broadcast, reduce, and
/// all-to-all on top of point-to-point send/recv;
/// [`comm::ChannelCommunicator`] runs every rank as a thread.
pub use tether_comm as comm;

/// Stashable records and their stream codec (`tether-stash`).
///
/// Build records such as [`stash::SpringForceSpec`], register them with a
/// [`stash::StashableRegistry`], and move them between ranks with
/// [`stash::StashWriter`] / [`stash::StashReader`] or
/// [`stash::MarkerStash::migrate`].
pub use tether_stash as stash;

/// Common imports for typical Tether usage.
///
/// ```rust
/// use tether::prelude::*;
/// ```
pub mod prelude {
    // Core ids
    pub use tether_core::{NodeIndex, StashableId, INVALID_NODE_INDEX};

    // Messaging
    pub use tether_comm::{ChannelCommunicator, CommError, Communicator};

    // Records
    pub use tether_stash::{
        Spring, SpringForceSpec, SpringNetworkBuilder, Stashable, StashableKind,
        StashableRecord, TargetPointForceSpec,
    };

    // Registry, streams, storage
    pub use tether_stash::{
        MarkerStash, MigrationStats, StashConfig, StashError, StashReader, StashWriter,
        StashableRegistry,
    };
}
