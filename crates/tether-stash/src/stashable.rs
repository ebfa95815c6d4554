//! The closed set of payloads a marker can carry.
//!
//! Every concrete record implements [`StashableRecord`]; the [`Stashable`]
//! enum is what marker storage and the registry actually move around.

use std::fmt;
use std::io::{Read, Write};

use tether_core::{NodeIndex, StashableId};

use crate::config::StashConfig;
use crate::error::StashError;
use crate::registry::StashableRegistry;
use crate::spring::SpringForceSpec;
use crate::target::TargetPointForceSpec;

/// Identifies a concrete stashable record type.
///
/// The kind is local type information; what travels on the wire is the
/// [`StashableId`] the registry assigned to the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StashableKind {
    /// [`SpringForceSpec`].
    SpringForce,
    /// [`TargetPointForceSpec`].
    TargetPoint,
}

impl StashableKind {
    /// Stable name, folded into the registry fingerprint.
    pub fn name(self) -> &'static str {
        match self {
            Self::SpringForce => "spring_force",
            Self::TargetPoint => "target_point",
        }
    }
}

impl fmt::Display for StashableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record type that can be attached to a marker and moved between ranks.
///
/// `pack` writes the record body only. The registry writes the wire tag in
/// front of it, and `unpack` is handed the stream positioned right after
/// that tag.
pub trait StashableRecord: Sized {
    /// The kind this type registers as.
    const KIND: StashableKind;

    /// Index of the node that owns this record.
    fn master_index(&self) -> NodeIndex;

    /// A conservative byte count for the body `pack` would write now.
    fn packed_size_upper_bound(&self) -> usize;

    /// Append the record body to `w`.
    fn pack(&self, w: &mut dyn Write) -> Result<(), StashError>;

    /// Read a record body from `r`, shifting every node index by `offset`.
    fn unpack(
        r: &mut dyn Read,
        offset: NodeIndex,
        config: &StashConfig,
    ) -> Result<Self, StashError>;

    /// Shift every node index by `offset` in place.
    ///
    /// On overflow the record is left unchanged.
    fn apply_offset(&mut self, offset: NodeIndex) -> Result<(), StashError>;

    /// Wrap into the marker payload enum.
    fn into_stashable(self) -> Stashable;

    /// The wire tag the registry assigned to this type.
    fn stashable_id(&self, registry: &StashableRegistry) -> Result<StashableId, StashError> {
        registry.id_of(Self::KIND)
    }
}

/// Payload held in a marker's storage slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Stashable {
    /// A network of springs owned by the master node.
    SpringForce(SpringForceSpec),
    /// A tether pulling the master node towards a fixed point.
    TargetPoint(TargetPointForceSpec),
}

impl Stashable {
    /// The concrete record type held.
    pub fn kind(&self) -> StashableKind {
        match self {
            Self::SpringForce(_) => StashableKind::SpringForce,
            Self::TargetPoint(_) => StashableKind::TargetPoint,
        }
    }

    /// Index of the node that owns the payload.
    pub fn master_index(&self) -> NodeIndex {
        match self {
            Self::SpringForce(spec) => spec.master_index(),
            Self::TargetPoint(spec) => spec.master_index(),
        }
    }

    /// Upper bound on the body size, excluding the wire tag.
    pub fn packed_size_upper_bound(&self) -> usize {
        match self {
            Self::SpringForce(spec) => spec.packed_size_upper_bound(),
            Self::TargetPoint(spec) => spec.packed_size_upper_bound(),
        }
    }

    /// Append the body, without the wire tag.
    pub fn pack(&self, w: &mut dyn Write) -> Result<(), StashError> {
        match self {
            Self::SpringForce(spec) => spec.pack(w),
            Self::TargetPoint(spec) => spec.pack(w),
        }
    }

    /// Shift every node index by `offset` in place.
    pub fn apply_offset(&mut self, offset: NodeIndex) -> Result<(), StashError> {
        match self {
            Self::SpringForce(spec) => spec.apply_offset(offset),
            Self::TargetPoint(spec) => spec.apply_offset(offset),
        }
    }

    /// The spring payload, if this is one.
    pub fn as_spring_force(&self) -> Option<&SpringForceSpec> {
        match self {
            Self::SpringForce(spec) => Some(spec),
            _ => None,
        }
    }

    /// The target-point payload, if this is one.
    pub fn as_target_point(&self) -> Option<&TargetPointForceSpec> {
        match self {
            Self::TargetPoint(spec) => Some(spec),
            _ => None,
        }
    }
}

impl From<SpringForceSpec> for Stashable {
    fn from(spec: SpringForceSpec) -> Self {
        Self::SpringForce(spec)
    }
}

impl From<TargetPointForceSpec> for Stashable {
    fn from(spec: TargetPointForceSpec) -> Self {
        Self::TargetPoint(spec)
    }
}
