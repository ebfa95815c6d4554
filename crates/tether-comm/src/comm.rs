//! The [`Communicator`] trait and its tree-based collective defaults.

use crate::error::CommError;
use crate::util;

/// Interface for a group of processes that can exchange messages over a
/// network. The underlying transport can in principle be TCP, in-process
/// channels, or a higher level abstraction like MPI.
///
/// Messages between a given pair of ranks are delivered in the order they
/// were sent. Every rank must call the collective methods in the same
/// sequence; mixing up the order is a protocol bug and will deadlock or
/// pair the wrong messages.
pub trait Communicator {
    /// Must be implemented to return the rank of this process within the
    /// communicator.
    fn rank(&self) -> usize;

    /// Must be implemented to return the number of peer processes in this
    /// communicator.
    fn size(&self) -> usize;

    /// Must be implemented to send a message to a peer. This method must
    /// return immediately, in other words it is not allowed to block until a
    /// matching receive is posted.
    fn send(&self, rank: usize, message: Vec<u8>) -> Result<(), CommError>;

    /// Must be implemented to receive the next message sent by `rank`. This
    /// method is allowed to block until a message is ready.
    fn recv(&self, rank: usize) -> Result<Vec<u8>, CommError>;

    /// Binomial tree broadcast from rank 0. The message buffer must be
    /// `Some` on rank 0, and it is ignored elsewhere.
    fn broadcast(&self, value: Option<Vec<u8>>) -> Result<Vec<u8>, CommError> {
        let r = self.rank();
        let p = self.size();
        let mut value = if r == 0 { value.unwrap_or_default() } else { Vec::new() };

        for level in 0..util::ceil_log2(p) {
            let one = 1 << level;
            if r < one {
                if r + one < p {
                    self.send(r + one, value.clone())?;
                }
            } else if r < 2 * one {
                value = self.recv(r - one)?;
            }
        }
        Ok(value)
    }

    /// Binomial tree reduce onto rank 0. All ranks return `None` except for
    /// the root.
    fn reduce<F>(&self, f: F, mut value: Vec<u8>) -> Result<Option<Vec<u8>>, CommError>
    where
        F: Fn(Vec<u8>, Vec<u8>) -> Vec<u8>,
    {
        let r = self.rank();
        let p = self.size();

        for level in (0..util::ceil_log2(p)).rev() {
            let one = 1 << level;
            if r < one {
                if r + one < p {
                    value = f(value, self.recv(r + one)?);
                }
            } else if r < 2 * one {
                self.send(r - one, value)?;
                return Ok(None);
            }
        }
        Ok(Some(value))
    }

    /// All-reduce (symmetric fold) over a commutative binary operator.
    fn all_reduce<F>(&self, f: F, value: Vec<u8>) -> Result<Vec<u8>, CommError>
    where
        F: Fn(Vec<u8>, Vec<u8>) -> Vec<u8>,
    {
        let reduced = self.reduce(f, value)?;
        self.broadcast(reduced)
    }

    /// Personalised all-to-all exchange.
    ///
    /// `outgoing[d]` is delivered to rank `d`; the returned vector holds
    /// at index `s` the buffer rank `s` addressed to this rank. The
    /// buffer addressed to self is moved across without a send.
    fn all_to_all(&self, outgoing: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>, CommError> {
        let r = self.rank();
        let p = self.size();
        if outgoing.len() != p {
            return Err(CommError::SizeMismatch {
                expected: p,
                found: outgoing.len(),
            });
        }

        let mut incoming = vec![Vec::new(); p];
        for (dest, message) in outgoing.into_iter().enumerate() {
            if dest == r {
                incoming[r] = message;
            } else {
                self.send(dest, message)?;
            }
        }
        for (source, slot) in incoming.iter_mut().enumerate() {
            if source != r {
                *slot = self.recv(source)?;
            }
        }
        Ok(incoming)
    }
}
