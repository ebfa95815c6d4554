//! Error types for rank-to-rank messaging.

use std::error::Error;
use std::fmt;

/// Errors raised by a [`Communicator`](crate::Communicator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// The peer's end of the transport has gone away.
    Disconnected {
        /// Rank of the peer that hung up.
        peer: usize,
    },
    /// A rank outside `0..size` was addressed.
    InvalidRank {
        /// The rank that was requested.
        rank: usize,
        /// Number of ranks in the communicator.
        size: usize,
    },
    /// An all-to-all was called with the wrong number of outgoing buffers.
    SizeMismatch {
        /// Number of ranks in the communicator.
        expected: usize,
        /// Number of buffers supplied.
        found: usize,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { peer } => write!(f, "peer rank {peer} disconnected"),
            Self::InvalidRank { rank, size } => {
                write!(f, "rank {rank} is outside communicator of size {size}")
            }
            Self::SizeMismatch { expected, found } => {
                write!(
                    f,
                    "all-to-all expects {expected} outgoing buffers, got {found}"
                )
            }
        }
    }
}

impl Error for CommError {}
