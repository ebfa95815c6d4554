//! Per-rank marker storage and migration.
//!
//! [`MarkerStash`] holds at most one [`Stashable`] payload per marker and
//! moves payloads between ranks when the mesh is regridded. Which rank a
//! marker moves to, and how node indices are renumbered on arrival, is
//! decided by the caller.

use std::io::{Read, Write};

use indexmap::IndexMap;
use log::{debug, info, warn};
use tether_comm::{CommError, Communicator};
use tether_core::NodeIndex;

use crate::error::StashError;
use crate::reader::StashReader;
use crate::registry::{any_rank_failed, StashableRegistry};
use crate::stashable::Stashable;
use crate::writer::StashWriter;

/// Counts reported by [`MarkerStash::migrate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MigrationStats {
    /// Payloads sent to other ranks.
    pub departed: usize,
    /// Payloads received from other ranks.
    pub arrived: usize,
    /// Payloads routed to this rank and left in place.
    pub retained: usize,
}

/// Marker-to-payload storage for one rank.
///
/// Iteration follows insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkerStash {
    payloads: IndexMap<NodeIndex, Stashable>,
}

impl MarkerStash {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `payload` to `marker`, returning the payload it replaced.
    pub fn attach(&mut self, marker: NodeIndex, payload: Stashable) -> Option<Stashable> {
        self.payloads.insert(marker, payload)
    }

    /// Remove and return the payload attached to `marker`.
    pub fn detach(&mut self, marker: NodeIndex) -> Option<Stashable> {
        self.payloads.shift_remove(&marker)
    }

    /// The payload attached to `marker`.
    pub fn get(&self, marker: NodeIndex) -> Option<&Stashable> {
        self.payloads.get(&marker)
    }

    /// Whether `marker` carries a payload.
    pub fn contains(&self, marker: NodeIndex) -> bool {
        self.payloads.contains_key(&marker)
    }

    /// Number of markers carrying a payload.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Whether no marker carries a payload.
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Iterate `(marker, payload)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &Stashable)> {
        self.payloads.iter().map(|(&marker, payload)| (marker, payload))
    }

    /// Write every payload whose marker satisfies `departs`, then remove
    /// those payloads.
    ///
    /// Payloads are removed only once all of them have been written; on
    /// error the store is unchanged.
    pub fn pack_departing<W, P>(
        &mut self,
        writer: &mut StashWriter<'_, W>,
        mut departs: P,
    ) -> Result<usize, StashError>
    where
        W: Write,
        P: FnMut(NodeIndex, &Stashable) -> bool,
    {
        let departing: Vec<NodeIndex> = self
            .payloads
            .iter()
            .filter(|&(&marker, payload)| departs(marker, payload))
            .map(|(&marker, _)| marker)
            .collect();
        for &marker in &departing {
            if let Some(payload) = self.payloads.get(&marker) {
                writer.write_entry(marker, payload)?;
            }
        }
        for marker in &departing {
            self.payloads.shift_remove(marker);
        }
        Ok(departing.len())
    }

    /// Attach every entry in `reader`, shifting markers and payload indices
    /// by `offset`. Returns the number of entries read.
    ///
    /// The whole segment is decoded before anything is attached. An entry
    /// that lands on a marker already carrying a payload, or on a marker
    /// an earlier entry claimed, fails with
    /// [`StashError::MarkerCollision`]; on any error the store is
    /// unchanged.
    pub fn unpack_arriving<R: Read>(
        &mut self,
        reader: &mut StashReader<'_, R>,
        offset: NodeIndex,
    ) -> Result<usize, StashError> {
        let arrivals = decode_arrivals(reader, offset, |marker| self.contains(marker))?;
        let count = arrivals.len();
        self.payloads.extend(arrivals);
        Ok(count)
    }

    /// Exchange payloads with every other rank.
    ///
    /// Collective. `route` names the destination rank of each payload;
    /// payloads routed to this rank stay where they are, untouched. Each
    /// received segment is unpacked with `offset_from(source_rank)`.
    ///
    /// Routes, registration and record limits are checked before anything
    /// is exchanged, so a bad route fails with [`StashError::Comm`] and an
    /// unpackable payload with [`StashError::NotRegistered`] or
    /// [`StashError::InvalidRecord`]. Every rank must then see the same
    /// failure or the collective will hang.
    ///
    /// Departing payloads are removed only once every rank has decoded its
    /// arrivals. If any rank fails to, every store is left unchanged; the
    /// failing rank returns its own error and the others return
    /// [`StashError::MigrationAborted`].
    pub fn migrate<C, F, O>(
        &mut self,
        comm: &C,
        registry: &StashableRegistry,
        mut route: F,
        offset_from: O,
    ) -> Result<MigrationStats, StashError>
    where
        C: Communicator,
        F: FnMut(NodeIndex, &Stashable) -> usize,
        O: Fn(usize) -> NodeIndex,
    {
        let rank = comm.rank();
        let size = comm.size();

        let mut routes: IndexMap<NodeIndex, usize> = IndexMap::with_capacity(self.payloads.len());
        for (&marker, payload) in &self.payloads {
            let dest = route(marker, payload);
            if dest >= size {
                return Err(CommError::InvalidRank { rank: dest, size }.into());
            }
            registry.check_packable(payload)?;
            routes.insert(marker, dest);
        }
        let retained = routes.values().filter(|&&dest| dest == rank).count();

        let source_rank = rank as u32;
        let mut outgoing = Vec::with_capacity(size);
        let mut departed = 0;
        for dest in 0..size {
            if dest == rank {
                outgoing.push(Vec::new());
                continue;
            }
            let mut writer = StashWriter::new(Vec::new(), registry, source_rank)?;
            for (&marker, payload) in &self.payloads {
                if routes.get(&marker) == Some(&dest) {
                    writer.write_entry(marker, payload)?;
                }
            }
            debug!(
                "rank {rank} packed {} payloads for rank {dest}",
                writer.entries_written()
            );
            departed += writer.entries_written() as usize;
            outgoing.push(writer.into_inner());
        }

        let incoming = comm.all_to_all(outgoing)?;

        let arrivals = receive_segments(incoming, rank, registry, &offset_from, |marker| {
            routes.get(&marker) == Some(&rank)
        });
        if any_rank_failed(comm, arrivals.is_err())? {
            let err = arrivals.err().unwrap_or(StashError::MigrationAborted);
            warn!("rank {rank} migration aborted, store unchanged: {err}");
            return Err(err);
        }
        let arrivals = arrivals?;

        self.payloads.retain(|marker, _| routes.get(marker) == Some(&rank));
        let arrived = arrivals.len();
        self.payloads.extend(arrivals);

        let stats = MigrationStats {
            departed,
            arrived,
            retained,
        };
        info!(
            "rank {rank} migration: {} departed, {} arrived, {} retained",
            stats.departed, stats.arrived, stats.retained
        );
        Ok(stats)
    }
}

/// Decode every entry of one segment. `occupied` reports markers that are
/// already taken outside the segment.
fn decode_arrivals<R, P>(
    reader: &mut StashReader<'_, R>,
    offset: NodeIndex,
    occupied: P,
) -> Result<IndexMap<NodeIndex, Stashable>, StashError>
where
    R: Read,
    P: Fn(NodeIndex) -> bool,
{
    let mut arrivals = IndexMap::new();
    while let Some((marker, payload)) = reader.next_entry(offset)? {
        if occupied(marker) || arrivals.insert(marker, payload).is_some() {
            return Err(StashError::MarkerCollision { marker });
        }
    }
    Ok(arrivals)
}

fn receive_segments<O, P>(
    incoming: Vec<Vec<u8>>,
    rank: usize,
    registry: &StashableRegistry,
    offset_from: &O,
    occupied: P,
) -> Result<IndexMap<NodeIndex, Stashable>, StashError>
where
    O: Fn(usize) -> NodeIndex,
    P: Fn(NodeIndex) -> bool,
{
    let mut arrivals: IndexMap<NodeIndex, Stashable> = IndexMap::new();
    for (source, segment) in incoming.into_iter().enumerate() {
        if source == rank {
            continue;
        }
        let mut reader = StashReader::open(segment.as_slice(), registry)?;
        if reader.source_rank() as usize != source {
            return Err(StashError::MalformedRecord {
                detail: format!(
                    "segment received from rank {source} claims source rank {}",
                    reader.source_rank()
                ),
            });
        }
        let batch = decode_arrivals(&mut reader, offset_from(source), |marker| {
            occupied(marker) || arrivals.contains_key(&marker)
        })?;
        arrivals.extend(batch);
    }
    Ok(arrivals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spring::SpringForceSpec;
    use crate::target::TargetPointForceSpec;

    fn registry() -> StashableRegistry {
        let mut registry = StashableRegistry::new();
        registry.register::<SpringForceSpec>();
        registry.register::<TargetPointForceSpec>();
        registry
    }

    fn spring(master: NodeIndex, slave: NodeIndex) -> Stashable {
        SpringForceSpec::new(master, vec![slave], vec![0], vec![1.0], vec![1.0])
            .unwrap()
            .into()
    }

    #[test]
    fn one_payload_per_marker() {
        let mut stash = MarkerStash::new();
        assert!(stash.attach(3, spring(3, 4)).is_none());
        let previous = stash.attach(3, spring(3, 5)).unwrap();
        assert_eq!(previous, spring(3, 4));
        assert_eq!(stash.len(), 1);
        assert_eq!(stash.get(3), Some(&spring(3, 5)));
        assert_eq!(stash.detach(3), Some(spring(3, 5)));
        assert!(stash.is_empty());
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut stash = MarkerStash::new();
        for marker in [9, 2, 5] {
            stash.attach(marker, spring(marker, marker + 1));
        }
        stash.detach(2);
        let markers: Vec<_> = stash.iter().map(|(m, _)| m).collect();
        assert_eq!(markers, vec![9, 5]);
    }

    #[test]
    fn pack_then_unpack_moves_departing_only() {
        let registry = registry();
        let mut source = MarkerStash::new();
        for marker in 0..6 {
            source.attach(marker, spring(marker, marker + 1));
        }
        source.attach(10, TargetPointForceSpec::new(10, 1.0, [0.0; 3]).into());

        let mut writer = StashWriter::new(Vec::new(), &registry, 0).unwrap();
        let packed = source
            .pack_departing(&mut writer, |marker, _| marker % 2 == 0)
            .unwrap();
        assert_eq!(packed, 4);
        assert_eq!(source.len(), 3);
        assert!(!source.contains(0));
        assert!(source.contains(1));

        let buf = writer.into_inner();
        let mut reader = StashReader::open(buf.as_slice(), &registry).unwrap();
        let mut dest = MarkerStash::new();
        assert_eq!(dest.unpack_arriving(&mut reader, 100).unwrap(), 4);
        assert_eq!(dest.get(102), Some(&spring(102, 103)));
        assert_eq!(dest.get(110).unwrap().master_index(), 110);
    }

    #[test]
    fn failed_pack_leaves_store_unchanged() {
        let mut partial = StashableRegistry::new();
        partial.register::<SpringForceSpec>();
        let mut stash = MarkerStash::new();
        stash.attach(1, spring(1, 2));
        stash.attach(2, TargetPointForceSpec::new(2, 1.0, [0.0; 3]).into());
        let before = stash.clone();

        let mut writer = StashWriter::new(Vec::new(), &partial, 0).unwrap();
        assert!(stash.pack_departing(&mut writer, |_, _| true).is_err());
        assert_eq!(stash, before);
    }

    #[test]
    fn arrival_on_occupied_marker_is_rejected() {
        let registry = registry();
        let mut writer = StashWriter::new(Vec::new(), &registry, 1).unwrap();
        writer.write_entry(0, &spring(0, 1)).unwrap();
        writer.write_entry(3, &spring(3, 4)).unwrap();
        let buf = writer.into_inner();

        let mut dest = MarkerStash::new();
        dest.attach(13, spring(13, 20));
        let before = dest.clone();
        let mut reader = StashReader::open(buf.as_slice(), &registry).unwrap();
        assert!(matches!(
            dest.unpack_arriving(&mut reader, 10),
            Err(StashError::MarkerCollision { marker: 13 })
        ));
        assert_eq!(dest, before);
    }

    #[test]
    fn duplicate_markers_in_one_segment_are_rejected() {
        let registry = registry();
        let mut writer = StashWriter::new(Vec::new(), &registry, 0).unwrap();
        writer.write_entry(4, &spring(4, 5)).unwrap();
        writer.write_entry(4, &spring(4, 6)).unwrap();
        let buf = writer.into_inner();

        let mut dest = MarkerStash::new();
        let mut reader = StashReader::open(buf.as_slice(), &registry).unwrap();
        assert!(matches!(
            dest.unpack_arriving(&mut reader, 0),
            Err(StashError::MarkerCollision { marker: 4 })
        ));
        assert!(dest.is_empty());
    }
}
