//! Error types for stashable records, the registry, and the stream codec.

use std::fmt;
use std::io;

use tether_comm::CommError;
use tether_core::{NodeIndex, StashableId};

use crate::stashable::StashableKind;

/// Errors that can occur while building, registering, packing, or
/// unpacking stashable records.
#[derive(Debug)]
pub enum StashError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// A record could not be built from the supplied values.
    InvalidRecord {
        /// Human-readable description of what went wrong.
        reason: String,
    },
    /// A record type was used before it was registered.
    NotRegistered {
        /// The kind that has no registry entry.
        kind: StashableKind,
    },
    /// A wire tag has no registered decoder on this rank.
    UnknownTag {
        /// The unrecognized tag.
        tag: StashableId,
    },
    /// Applying a migration offset would overflow a node index.
    IndexOverflow {
        /// The index being shifted.
        index: NodeIndex,
        /// The offset that was applied.
        offset: NodeIndex,
    },
    /// A record or entry could not be decoded (corrupt or truncated data).
    MalformedRecord {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The segment does not start with the expected `b"TSTH"` magic bytes.
    InvalidMagic,
    /// The segment format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the segment.
        found: u8,
    },
    /// Two ranks disagree on the registry table.
    FingerprintMismatch {
        /// Fingerprint expected (the local or root registry).
        expected: u64,
        /// Fingerprint found on the wire or on this rank.
        found: u64,
    },
    /// A [`StashConfig`](crate::StashConfig) invariant was violated.
    InvalidConfig {
        /// Description of which invariant was violated.
        reason: String,
    },
    /// An arriving payload landed on a marker that already carries one.
    MarkerCollision {
        /// The marker, after the arrival offset was applied.
        marker: NodeIndex,
    },
    /// Another rank failed during a migration, so no payload moved.
    MigrationAborted,
    /// Rank-to-rank messaging failed.
    Comm(CommError),
}

impl fmt::Display for StashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidRecord { reason } => write!(f, "invalid record: {reason}"),
            Self::NotRegistered { kind } => {
                write!(f, "stashable kind '{kind}' is not registered")
            }
            Self::UnknownTag { tag } => write!(f, "unknown stashable tag {tag}"),
            Self::IndexOverflow { index, offset } => {
                write!(f, "node index {index} overflows when shifted by {offset}")
            }
            Self::MalformedRecord { detail } => write!(f, "malformed record: {detail}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"TSTH\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::FingerprintMismatch { expected, found } => {
                write!(
                    f,
                    "registry fingerprint mismatch: expected={expected:#018x}, found={found:#018x}"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid stash config: {reason}"),
            Self::MarkerCollision { marker } => {
                write!(f, "marker {marker} already carries a payload")
            }
            Self::MigrationAborted => write!(f, "migration aborted by a peer rank"),
            Self::Comm(e) => write!(f, "communication failed: {e}"),
        }
    }
}

impl std::error::Error for StashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Comm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StashError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CommError> for StashError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}
