//! In-process communicator where every rank is a thread.
//!
//! One unbounded channel is created per ordered `(source, destination)`
//! pair, so sends never block and per-pair ordering is FIFO.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;

use crate::comm::Communicator;
use crate::error::CommError;

/// A [`Communicator`] backed by `crossbeam-channel` queues.
///
/// Build a whole group with [`ChannelCommunicator::group`] and move one
/// member into each rank's thread.
///
/// # Examples
///
/// ```
/// use std::thread;
/// use tether_comm::{ChannelCommunicator, Communicator};
///
/// let handles: Vec<_> = ChannelCommunicator::group(4)
///     .into_iter()
///     .map(|comm| {
///         thread::spawn(move || {
///             let root = if comm.rank() == 0 { Some(b"hello".to_vec()) } else { None };
///             comm.broadcast(root).unwrap()
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     assert_eq!(handle.join().unwrap(), b"hello");
/// }
/// ```
pub struct ChannelCommunicator {
    rank: usize,
    outboxes: Vec<Sender<Vec<u8>>>,
    inboxes: Vec<Receiver<Vec<u8>>>,
}

impl ChannelCommunicator {
    /// Create `size` connected communicators, indexed by rank.
    pub fn group(size: usize) -> Vec<Self> {
        // channels[source][dest]
        let channels: Vec<Vec<(Sender<Vec<u8>>, Receiver<Vec<u8>>)>> = (0..size)
            .map(|_| (0..size).map(|_| unbounded()).collect())
            .collect();

        (0..size)
            .map(|rank| Self {
                rank,
                outboxes: (0..size).map(|dest| channels[rank][dest].0.clone()).collect(),
                inboxes: (0..size)
                    .map(|source| channels[source][rank].1.clone())
                    .collect(),
            })
            .collect()
    }

    fn check_rank(&self, rank: usize) -> Result<(), CommError> {
        if rank < self.outboxes.len() {
            Ok(())
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.outboxes.len(),
            })
        }
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&self, rank: usize, message: Vec<u8>) -> Result<(), CommError> {
        self.check_rank(rank)?;
        trace!("[{}] send {} bytes to {}", self.rank, message.len(), rank);
        self.outboxes[rank]
            .send(message)
            .map_err(|_| CommError::Disconnected { peer: rank })
    }

    fn recv(&self, rank: usize) -> Result<Vec<u8>, CommError> {
        self.check_rank(rank)?;
        let message = self.inboxes[rank]
            .recv()
            .map_err(|_| CommError::Disconnected { peer: rank })?;
        trace!("[{}] recv {} bytes from {}", self.rank, message.len(), rank);
        Ok(message)
    }
}
