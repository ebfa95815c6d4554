//! Core identifiers for the Tether workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the node-index conventions shared by the stashable records and the
//! wire tag type carried in front of every packed record.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod id;

pub use id::{shift_node_index, NodeIndex, StashableId, INVALID_NODE_INDEX};
