//! Target-point force specifications.

use std::io::{Read, Write};

use tether_core::{shift_node_index, NodeIndex};

use crate::codec;
use crate::config::StashConfig;
use crate::error::StashError;
use crate::stashable::{Stashable, StashableKind, StashableRecord};

/// Tethers a master node to a fixed point in space with a penalty
/// stiffness.
///
/// Two-dimensional runs leave the trailing coordinate at zero.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetPointForceSpec {
    master_index: NodeIndex,
    stiffness: f64,
    target: [f64; 3],
}

impl TargetPointForceSpec {
    /// Build a record.
    pub fn new(master_index: NodeIndex, stiffness: f64, target: [f64; 3]) -> Self {
        Self {
            master_index,
            stiffness,
            target,
        }
    }

    /// Index of the owning node.
    pub fn master_index(&self) -> NodeIndex {
        self.master_index
    }

    /// Reassign the owning node.
    pub fn set_master_index(&mut self, master_index: NodeIndex) {
        self.master_index = master_index;
    }

    /// Penalty stiffness.
    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Replace the penalty stiffness.
    pub fn set_stiffness(&mut self, stiffness: f64) {
        self.stiffness = stiffness;
    }

    /// Target position.
    pub fn target(&self) -> &[f64; 3] {
        &self.target
    }

    /// Move the target.
    pub fn set_target(&mut self, target: [f64; 3]) {
        self.target = target;
    }

    /// Shift the master index by `offset`.
    pub fn apply_offset(&mut self, offset: NodeIndex) -> Result<(), StashError> {
        StashableRecord::apply_offset(self, offset)
    }

    /// Body size in bytes (always 36).
    pub fn packed_size_upper_bound(&self) -> usize {
        codec::TARGET_POINT_SIZE
    }

    /// Append the record body to `w`.
    pub fn pack(&self, w: &mut dyn Write) -> Result<(), StashError> {
        codec::encode_target_point(w, self)
    }
}

impl StashableRecord for TargetPointForceSpec {
    const KIND: StashableKind = StashableKind::TargetPoint;

    fn master_index(&self) -> NodeIndex {
        self.master_index
    }

    fn packed_size_upper_bound(&self) -> usize {
        codec::TARGET_POINT_SIZE
    }

    fn pack(&self, w: &mut dyn Write) -> Result<(), StashError> {
        codec::encode_target_point(w, self)
    }

    fn unpack(
        r: &mut dyn Read,
        offset: NodeIndex,
        _config: &StashConfig,
    ) -> Result<Self, StashError> {
        codec::decode_target_point(r, offset)
    }

    fn apply_offset(&mut self, offset: NodeIndex) -> Result<(), StashError> {
        let index = self.master_index;
        self.master_index =
            shift_node_index(index, offset).ok_or(StashError::IndexOverflow { index, offset })?;
        Ok(())
    }

    fn into_stashable(self) -> Stashable {
        Stashable::TargetPoint(self)
    }
}
