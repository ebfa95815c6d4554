//! Test fixtures and mock streams for Tether development.
//!
//! Provides ready-registered registries, canned spring networks
//! ([`fixtures`]), a [`FailingWriter`] for exercising I/O error paths, and
//! [`run_ranks`] for driving collective code across in-process ranks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::io::{self, Write};
use std::thread;

use tether_comm::ChannelCommunicator;
use tether_stash::{SpringForceSpec, StashableRegistry, TargetPointForceSpec};

pub use fixtures::{mixed_payloads, populated_stash, spring_chain, spring_ring};

/// A registry with every record type registered in the canonical order:
/// [`SpringForceSpec`] then [`TargetPointForceSpec`].
pub fn registered_registry() -> StashableRegistry {
    let mut registry = StashableRegistry::new();
    registry.register::<SpringForceSpec>();
    registry.register::<TargetPointForceSpec>();
    registry
}

/// Run `f` once per rank of a fresh channel group, each on its own thread,
/// and collect the results in rank order.
///
/// Panics in any rank are re-raised on the calling thread.
pub fn run_ranks<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(ChannelCommunicator) -> T + Send + Sync + Clone + 'static,
{
    let handles: Vec<_> = ChannelCommunicator::group(size)
        .into_iter()
        .map(|comm| {
            let f = f.clone();
            thread::spawn(move || f(comm))
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().expect("rank thread panicked"))
        .collect()
}

/// A `Write` sink that accepts a fixed number of bytes and then fails.
///
/// Useful for checking that a failed pack leaves marker storage intact.
pub struct FailingWriter {
    pub accepted: Vec<u8>,
    pub capacity: usize,
}

impl FailingWriter {
    /// Accept `capacity` bytes, then fail every write.
    pub fn new(capacity: usize) -> Self {
        Self {
            accepted: Vec::new(),
            capacity,
        }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.capacity - self.accepted.len();
        if room == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("deliberate failure after {} bytes", self.capacity),
            ));
        }
        let n = buf.len().min(room);
        self.accepted.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
