//! Stashable force specifications and the stream codec that moves them
//! between ranks.
//!
//! Lagrangian markers in an adaptively refined, distributed mesh carry
//! force specifications describing the springs and tethers attached to
//! them. When the mesh is regridded, markers migrate between ranks and
//! their payloads travel as bytes. This crate provides the payload types,
//! the registry that agrees on wire tags across ranks, and the codec.
//!
//! # Architecture
//!
//! - [`SpringForceSpec`] and [`TargetPointForceSpec`] are the record types,
//!   unified by the [`Stashable`] enum and the [`StashableRecord`] trait
//! - [`StashableRegistry`] assigns wire tags and decodes tagged records
//! - [`StashWriter`] / [`StashReader`] frame one migration stream
//! - [`MarkerStash`] holds one payload per marker and drives migration
//! - All I/O uses a custom little-endian codec (no serde dependency)
//!
//! # Format
//!
//! ```text
//! [MAGIC "TSTH"] [VERSION u8] [registry fingerprint u64] [source rank u32]
//! [marker i32] [tag u32] [record body] ...
//! ```
//!
//! # Example
//!
//! ```
//! use tether_stash::{SpringForceSpec, StashableRegistry};
//!
//! let mut registry = StashableRegistry::new();
//! registry.register::<SpringForceSpec>();
//!
//! let spec = SpringForceSpec::new(5, vec![7, 9], vec![0, 1], vec![2.0, 3.5], vec![1.0, 1.2])
//!     .unwrap();
//! let mut buf = Vec::new();
//! registry.pack(&mut buf, &spec.clone().into()).unwrap();
//!
//! let moved = registry.unpack(&mut buf.as_slice(), 100).unwrap();
//! let moved = moved.as_spring_force().unwrap();
//! assert_eq!(moved.master_index(), 105);
//! assert_eq!(moved.slave_indices(), &[107, 109]);
//! assert_eq!(moved.stiffnesses(), spec.stiffnesses());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod hash;
pub mod marker;
pub mod reader;
pub mod registry;
pub mod spring;
pub mod stashable;
pub mod target;
pub mod writer;

pub use config::StashConfig;
pub use error::StashError;
pub use hash::registry_fingerprint;
pub use marker::{MarkerStash, MigrationStats};
pub use reader::{EntryIter, StashReader};
pub use registry::StashableRegistry;
pub use spring::{Spring, SpringForceSpec, SpringNetworkBuilder};
pub use stashable::{Stashable, StashableKind, StashableRecord};
pub use target::TargetPointForceSpec;
pub use writer::StashWriter;

pub use tether_core::{NodeIndex, StashableId, INVALID_NODE_INDEX};

/// Magic bytes at the start of every stash segment.
pub const MAGIC: [u8; 4] = *b"TSTH";

/// Current binary format version of a stash segment.
///
/// History:
/// - v1: header carries the registry fingerprint and source rank
pub const FORMAT_VERSION: u8 = 1;
