//! Stash segment writer.
//!
//! [`StashWriter`] streams `(marker, payload)` entries to any `Write` sink.
//! The segment header is written immediately on construction.

use std::io::Write;

use log::{debug, trace};
use tether_core::NodeIndex;

use crate::codec::{encode_segment_header, write_i32_le, SegmentHeader};
use crate::error::StashError;
use crate::registry::StashableRegistry;
use crate::stashable::Stashable;

/// Writes one migration segment to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use a buffered socket or file.
///
/// # Examples
///
/// ```
/// use tether_stash::{SpringForceSpec, StashReader, StashWriter, StashableRegistry};
///
/// let mut registry = StashableRegistry::new();
/// registry.register::<SpringForceSpec>();
///
/// let spec = SpringForceSpec::new(3, vec![4], vec![0], vec![1.0], vec![0.5]).unwrap();
/// let mut buf = Vec::new();
/// let mut writer = StashWriter::new(&mut buf, &registry, 0).unwrap();
/// writer.write_entry(3, &spec.into()).unwrap();
/// assert_eq!(writer.entries_written(), 1);
/// drop(writer);
///
/// let mut reader = StashReader::open(buf.as_slice(), &registry).unwrap();
/// let (marker, payload) = reader.next_entry(10).unwrap().unwrap();
/// assert_eq!(marker, 13);
/// assert_eq!(payload.master_index(), 13);
/// assert!(reader.next_entry(10).unwrap().is_none());
/// ```
pub struct StashWriter<'a, W: Write> {
    writer: W,
    registry: &'a StashableRegistry,
    source_rank: u32,
    entries_written: u64,
}

impl<'a, W: Write> StashWriter<'a, W> {
    /// Create a new segment writer, immediately writing the header.
    pub fn new(
        mut writer: W,
        registry: &'a StashableRegistry,
        source_rank: u32,
    ) -> Result<Self, StashError> {
        let header = SegmentHeader {
            fingerprint: registry.fingerprint(),
            source_rank,
        };
        encode_segment_header(&mut writer, &header)?;
        debug!(
            "opened stash segment from rank {source_rank} (fingerprint {:#018x})",
            header.fingerprint
        );
        Ok(Self {
            writer,
            registry,
            source_rank,
            entries_written: 0,
        })
    }

    /// Append the payload attached to `marker`.
    ///
    /// Nothing is written if the payload's kind is not registered or the
    /// payload exceeds the registry's limits.
    pub fn write_entry(&mut self, marker: NodeIndex, payload: &Stashable) -> Result<(), StashError> {
        self.registry.check_packable(payload)?;
        write_i32_le(&mut self.writer, marker)?;
        self.registry.pack(&mut self.writer, payload)?;
        self.entries_written += 1;
        trace!(
            "rank {} packed {} payload for marker {marker}",
            self.source_rank,
            payload.kind()
        );
        Ok(())
    }

    /// Rank recorded in the segment header.
    pub fn source_rank(&self) -> u32 {
        self.source_rank
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), StashError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of entries written so far.
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
