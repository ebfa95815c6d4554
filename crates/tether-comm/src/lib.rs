//! Minimal message passing between simulation ranks.
//!
//! The [`Communicator`] trait describes a fixed group of processes that
//! exchange opaque byte messages. Implementors only write `send` and
//! `recv` for their transport; broadcast, reduce, all-reduce and
//! all-to-all come as default methods built on binomial trees.
//!
//! [`ChannelCommunicator`] is an in-process transport where each rank is
//! a thread. It is what tests and demos use to exercise multi-rank
//! registration checks and marker migration without MPI.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod comm;
pub mod error;
pub mod util;

pub use channel::ChannelCommunicator;
pub use comm::Communicator;
pub use error::CommError;
