//! Spring force specifications and an undirected-network builder.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use tether_core::{shift_node_index, NodeIndex, INVALID_NODE_INDEX};

use crate::codec;
use crate::config::StashConfig;
use crate::error::StashError;
use crate::stashable::{Stashable, StashableKind, StashableRecord};

/// One spring as seen from its master node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spring {
    /// Node at the opposite end.
    pub slave_index: NodeIndex,
    /// Force-law identifier.
    pub force_law_index: i32,
    /// Spring stiffness.
    pub stiffness: f64,
    /// Rest length.
    pub rest_length: f64,
}

/// The springs owned by one master node.
///
/// Stored as four parallel sequences that always have the same length.
/// The force at the master is evaluated once per spring and its negation
/// applied at the slave, so an undirected edge must appear in exactly one
/// endpoint's record. [`SpringNetworkBuilder`] produces records that
/// satisfy this.
///
/// # Examples
///
/// ```
/// use tether_stash::{Spring, SpringForceSpec};
///
/// let mut spec = SpringForceSpec::new(5, vec![7], vec![0], vec![2.0], vec![1.0]).unwrap();
/// spec.push_spring(Spring { slave_index: 9, force_law_index: 1, stiffness: 3.5, rest_length: 1.2 });
/// assert_eq!(spec.spring_count(), 2);
/// assert_eq!(spec.slave_indices(), &[7, 9]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SpringForceSpec {
    master_index: NodeIndex,
    slave_indices: Vec<NodeIndex>,
    force_law_indices: Vec<i32>,
    stiffnesses: Vec<f64>,
    rest_lengths: Vec<f64>,
}

impl Default for SpringForceSpec {
    fn default() -> Self {
        Self {
            master_index: INVALID_NODE_INDEX,
            slave_indices: Vec::new(),
            force_law_indices: Vec::new(),
            stiffnesses: Vec::new(),
            rest_lengths: Vec::new(),
        }
    }
}

impl SpringForceSpec {
    /// Build a record from parallel per-spring sequences.
    ///
    /// Returns [`StashError::InvalidRecord`] if the sequences differ in
    /// length. All of them may be empty.
    pub fn new(
        master_index: NodeIndex,
        slave_indices: Vec<NodeIndex>,
        force_law_indices: Vec<i32>,
        stiffnesses: Vec<f64>,
        rest_lengths: Vec<f64>,
    ) -> Result<Self, StashError> {
        let n = slave_indices.len();
        if force_law_indices.len() != n || stiffnesses.len() != n || rest_lengths.len() != n {
            return Err(StashError::InvalidRecord {
                reason: format!(
                    "per-spring lengths disagree: slaves={n}, force_laws={}, stiffnesses={}, rest_lengths={}",
                    force_law_indices.len(),
                    stiffnesses.len(),
                    rest_lengths.len()
                ),
            });
        }
        Ok(Self {
            master_index,
            slave_indices,
            force_law_indices,
            stiffnesses,
            rest_lengths,
        })
    }

    /// Number of springs.
    pub fn spring_count(&self) -> usize {
        self.slave_indices.len()
    }

    /// Whether the record holds no springs.
    pub fn is_empty(&self) -> bool {
        self.slave_indices.is_empty()
    }

    /// Index of the owning node.
    pub fn master_index(&self) -> NodeIndex {
        self.master_index
    }

    /// Reassign the owning node.
    pub fn set_master_index(&mut self, master_index: NodeIndex) {
        self.master_index = master_index;
    }

    /// Opposite-end node per spring.
    pub fn slave_indices(&self) -> &[NodeIndex] {
        &self.slave_indices
    }

    /// Force-law identifier per spring.
    pub fn force_law_indices(&self) -> &[i32] {
        &self.force_law_indices
    }

    /// Stiffness per spring.
    pub fn stiffnesses(&self) -> &[f64] {
        &self.stiffnesses
    }

    /// Rest length per spring.
    pub fn rest_lengths(&self) -> &[f64] {
        &self.rest_lengths
    }

    /// The `i`th spring, if it exists.
    pub fn spring(&self, i: usize) -> Option<Spring> {
        if i >= self.spring_count() {
            return None;
        }
        Some(Spring {
            slave_index: self.slave_indices[i],
            force_law_index: self.force_law_indices[i],
            stiffness: self.stiffnesses[i],
            rest_length: self.rest_lengths[i],
        })
    }

    /// Overwrite the `i`th spring.
    pub fn set_spring(&mut self, i: usize, spring: Spring) -> Result<(), StashError> {
        if i >= self.spring_count() {
            return Err(StashError::InvalidRecord {
                reason: format!(
                    "spring index {i} out of range for {} springs",
                    self.spring_count()
                ),
            });
        }
        self.slave_indices[i] = spring.slave_index;
        self.force_law_indices[i] = spring.force_law_index;
        self.stiffnesses[i] = spring.stiffness;
        self.rest_lengths[i] = spring.rest_length;
        Ok(())
    }

    /// Append a spring.
    pub fn push_spring(&mut self, spring: Spring) {
        self.slave_indices.push(spring.slave_index);
        self.force_law_indices.push(spring.force_law_index);
        self.stiffnesses.push(spring.stiffness);
        self.rest_lengths.push(spring.rest_length);
    }

    /// Iterate the springs in storage order.
    pub fn springs(&self) -> impl ExactSizeIterator<Item = Spring> + '_ {
        (0..self.spring_count()).map(move |i| Spring {
            slave_index: self.slave_indices[i],
            force_law_index: self.force_law_indices[i],
            stiffness: self.stiffnesses[i],
            rest_length: self.rest_lengths[i],
        })
    }
}

impl StashableRecord for SpringForceSpec {
    const KIND: StashableKind = StashableKind::SpringForce;

    fn master_index(&self) -> NodeIndex {
        self.master_index
    }

    fn packed_size_upper_bound(&self) -> usize {
        codec::spring_force_size(self.spring_count())
    }

    fn pack(&self, w: &mut dyn Write) -> Result<(), StashError> {
        codec::encode_spring_force(w, self)
    }

    fn unpack(
        r: &mut dyn Read,
        offset: NodeIndex,
        config: &StashConfig,
    ) -> Result<Self, StashError> {
        codec::decode_spring_force(r, offset, config)
    }

    fn apply_offset(&mut self, offset: NodeIndex) -> Result<(), StashError> {
        let shift = |index: NodeIndex| {
            shift_node_index(index, offset).ok_or(StashError::IndexOverflow { index, offset })
        };
        let master_index = shift(self.master_index)?;
        let slave_indices = self
            .slave_indices
            .iter()
            .map(|&idx| shift(idx))
            .collect::<Result<Vec<_>, _>>()?;
        self.master_index = master_index;
        self.slave_indices = slave_indices;
        Ok(())
    }

    fn into_stashable(self) -> Stashable {
        Stashable::SpringForce(self)
    }
}

impl SpringForceSpec {
    /// Shift master and slave indices by `offset` in place.
    ///
    /// On overflow returns [`StashError::IndexOverflow`] and leaves the
    /// record unchanged.
    pub fn apply_offset(&mut self, offset: NodeIndex) -> Result<(), StashError> {
        StashableRecord::apply_offset(self, offset)
    }

    /// Exact body size in bytes: `8 + 24 * spring_count`.
    pub fn packed_size_upper_bound(&self) -> usize {
        StashableRecord::packed_size_upper_bound(self)
    }

    /// Append the record body to `w`.
    pub fn pack(&self, w: &mut dyn Write) -> Result<(), StashError> {
        StashableRecord::pack(self, w)
    }
}

// ── Network builder ─────────────────────────────────────────────

/// Builds spring records from an undirected edge list.
///
/// Each edge is stored once, in the record of its lower-indexed endpoint.
/// Self-loops, negative indices and repeated edges are rejected.
///
/// ```
/// use tether_stash::{Spring, SpringNetworkBuilder};
///
/// let mut builder = SpringNetworkBuilder::new();
/// builder.add_edge(2, 1, 0, 10.0, 0.5).unwrap();
/// builder.add_edge(1, 3, 0, 10.0, 0.5).unwrap();
/// let records = builder.build();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].master_index(), 1);
/// assert_eq!(records[0].slave_indices(), &[2, 3]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SpringNetworkBuilder {
    edges: BTreeSet<(NodeIndex, NodeIndex)>,
    records: BTreeMap<NodeIndex, SpringForceSpec>,
}

impl SpringNetworkBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the undirected spring `a`–`b`.
    pub fn add_edge(
        &mut self,
        a: NodeIndex,
        b: NodeIndex,
        force_law_index: i32,
        stiffness: f64,
        rest_length: f64,
    ) -> Result<&mut Self, StashError> {
        if a == b {
            return Err(StashError::InvalidRecord {
                reason: format!("self-loop on node {a}"),
            });
        }
        if a < 0 || b < 0 {
            return Err(StashError::InvalidRecord {
                reason: format!("edge ({a}, {b}) has a negative node index"),
            });
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        if !self.edges.insert((lo, hi)) {
            return Err(StashError::InvalidRecord {
                reason: format!("duplicate edge ({lo}, {hi})"),
            });
        }
        let record = self.records.entry(lo).or_insert_with(|| SpringForceSpec {
            master_index: lo,
            ..SpringForceSpec::default()
        });
        record.push_spring(Spring {
            slave_index: hi,
            force_law_index,
            stiffness,
            rest_length,
        });
        Ok(self)
    }

    /// Number of distinct edges added so far.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// One record per owning node, ordered by master index.
    pub fn build(self) -> Vec<SpringForceSpec> {
        self.records.into_values().collect()
    }
}
