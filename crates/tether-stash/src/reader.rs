//! Stash segment reader.
//!
//! [`StashReader`] reads `(marker, payload)` entries from any `Read`
//! source. The segment header is validated on construction.

use std::io::Read;

use log::{debug, error, trace};
use tether_core::{shift_node_index, NodeIndex};

use crate::codec::{decode_entry_marker, decode_segment_header, SegmentHeader};
use crate::error::StashError;
use crate::registry::StashableRegistry;
use crate::stashable::Stashable;

/// Reads one migration segment from a byte stream.
///
/// Generic over `R: Read` so tests can use `&[u8]` and production
/// code can use a buffered socket or file.
pub struct StashReader<'a, R: Read> {
    reader: R,
    registry: &'a StashableRegistry,
    header: SegmentHeader,
    entries_read: u64,
}

impl<'a, R: Read> StashReader<'a, R> {
    /// Open a segment, reading and validating the header.
    ///
    /// When the registry's config asks for it, a fingerprint that differs
    /// from the local registry fails with
    /// [`StashError::FingerprintMismatch`].
    pub fn open(mut reader: R, registry: &'a StashableRegistry) -> Result<Self, StashError> {
        let header = decode_segment_header(&mut reader)?;
        if registry.config().verify_fingerprint {
            let expected = registry.fingerprint();
            if header.fingerprint != expected {
                error!(
                    "segment from rank {} has registry fingerprint {:#018x}, local is {expected:#018x}",
                    header.source_rank, header.fingerprint
                );
                return Err(StashError::FingerprintMismatch {
                    expected,
                    found: header.fingerprint,
                });
            }
        }
        debug!("opened stash segment from rank {}", header.source_rank);
        Ok(Self {
            reader,
            registry,
            header,
            entries_read: 0,
        })
    }

    /// Rank that wrote the segment.
    pub fn source_rank(&self) -> u32 {
        self.header.source_rank
    }

    /// Registry fingerprint carried in the header.
    pub fn fingerprint(&self) -> u64 {
        self.header.fingerprint
    }

    /// Read the next entry, or `None` if the stream is exhausted.
    ///
    /// Both the marker index and every index inside the payload are
    /// shifted by `offset`.
    pub fn next_entry(
        &mut self,
        offset: NodeIndex,
    ) -> Result<Option<(NodeIndex, Stashable)>, StashError> {
        let Some(marker) = decode_entry_marker(&mut self.reader)? else {
            return Ok(None);
        };
        let marker = shift_node_index(marker, offset).ok_or(StashError::IndexOverflow {
            index: marker,
            offset,
        })?;
        let payload = self.registry.unpack(&mut self.reader, offset)?;
        self.entries_read += 1;
        trace!(
            "unpacked {} payload for marker {marker} from rank {}",
            payload.kind(),
            self.header.source_rank
        );
        Ok(Some((marker, payload)))
    }

    /// Number of entries read so far.
    pub fn entries_read(&self) -> u64 {
        self.entries_read
    }

    /// Convert into an entry iterator that applies `offset` to every entry.
    pub fn entries(self, offset: NodeIndex) -> EntryIter<'a, R> {
        EntryIter {
            inner: self,
            offset,
            done: false,
        }
    }
}

/// Iterator adapter over segment entries.
pub struct EntryIter<'a, R: Read> {
    inner: StashReader<'a, R>,
    offset: NodeIndex,
    done: bool,
}

impl<R: Read> EntryIter<'_, R> {
    /// Number of entries read so far.
    pub fn entries_read(&self) -> u64 {
        self.inner.entries_read
    }
}

impl<R: Read> Iterator for EntryIter<'_, R> {
    type Item = Result<(NodeIndex, Stashable), StashError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next_entry(self.offset) {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
