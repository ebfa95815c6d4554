//! Binary encode/decode for stashable records and stash segments.
//!
//! All integers and reals are little-endian. Repeated fields are preceded
//! by a `u32` count so a reader needs no outside metadata. There is no
//! compression, no alignment padding, and no per-record version; the
//! segment header carries the format version.

use std::io::{ErrorKind, Read, Write};

use tether_core::{shift_node_index, NodeIndex};

use crate::config::StashConfig;
use crate::error::StashError;
use crate::spring::SpringForceSpec;
use crate::target::TargetPointForceSpec;
use crate::{FORMAT_VERSION, MAGIC};

/// Encoded size of an `i32`.
pub const I32_SIZE: usize = 4;
/// Encoded size of a `u32`.
pub const U32_SIZE: usize = 4;
/// Encoded size of an `f64`.
pub const F64_SIZE: usize = 8;
/// Encoded size of a segment header.
pub const SEGMENT_HEADER_SIZE: usize = 4 + 1 + 8 + 4;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), StashError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), StashError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), StashError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian i32.
pub fn write_i32_le(w: &mut dyn Write, v: i32) -> Result<(), StashError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), StashError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a run of little-endian i32 values without a length prefix.
pub fn write_i32_slice(w: &mut dyn Write, vs: &[i32]) -> Result<(), StashError> {
    for &v in vs {
        write_i32_le(w, v)?;
    }
    Ok(())
}

/// Write a run of little-endian f64 values without a length prefix.
pub fn write_f64_slice(w: &mut dyn Write, vs: &[f64]) -> Result<(), StashError> {
    for &v in vs {
        write_f64_le(w, v)?;
    }
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, StashError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, StashError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, StashError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut dyn Read) -> Result<i32, StashError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, StashError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read `len` little-endian i32 values.
pub fn read_i32_vec(r: &mut dyn Read, len: usize) -> Result<Vec<i32>, StashError> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_i32_le(r)?);
    }
    Ok(out)
}

/// Read `len` little-endian f64 values.
pub fn read_f64_vec(r: &mut dyn Read, len: usize) -> Result<Vec<f64>, StashError> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_f64_le(r)?);
    }
    Ok(out)
}

fn shift(index: NodeIndex, offset: NodeIndex) -> Result<NodeIndex, StashError> {
    shift_node_index(index, offset).ok_or(StashError::IndexOverflow { index, offset })
}

// ── Spring force records ────────────────────────────────────────

/// Body size of a spring record with `spring_count` springs.
pub fn spring_force_size(spring_count: usize) -> usize {
    I32_SIZE + U32_SIZE + spring_count * (2 * I32_SIZE + 2 * F64_SIZE)
}

/// Encode a spring record body.
///
/// Order: master index, spring count, slave indices, force-law indices,
/// stiffnesses, rest lengths.
pub fn encode_spring_force(w: &mut dyn Write, spec: &SpringForceSpec) -> Result<(), StashError> {
    let count = u32::try_from(spec.spring_count()).map_err(|_| StashError::InvalidRecord {
        reason: format!("spring count {} does not fit in u32", spec.spring_count()),
    })?;
    write_i32_le(w, spec.master_index())?;
    write_u32_le(w, count)?;
    write_i32_slice(w, spec.slave_indices())?;
    write_i32_slice(w, spec.force_law_indices())?;
    write_f64_slice(w, spec.stiffnesses())?;
    write_f64_slice(w, spec.rest_lengths())?;
    Ok(())
}

/// Decode a spring record body, shifting master and slave indices by
/// `offset`.
///
/// A spring count above `config.max_spring_count` is rejected before
/// anything is allocated.
pub fn decode_spring_force(
    r: &mut dyn Read,
    offset: NodeIndex,
    config: &StashConfig,
) -> Result<SpringForceSpec, StashError> {
    let master_index = read_i32_le(r)?;
    let count = read_u32_le(r)?;
    if count > config.max_spring_count {
        return Err(StashError::MalformedRecord {
            detail: format!(
                "spring count {count} exceeds limit {}",
                config.max_spring_count
            ),
        });
    }
    let n = count as usize;
    let slave_indices = read_i32_vec(r, n)?;
    let force_law_indices = read_i32_vec(r, n)?;
    let stiffnesses = read_f64_vec(r, n)?;
    let rest_lengths = read_f64_vec(r, n)?;

    let master_index = shift(master_index, offset)?;
    let slave_indices = slave_indices
        .into_iter()
        .map(|idx| shift(idx, offset))
        .collect::<Result<Vec<_>, _>>()?;

    SpringForceSpec::new(
        master_index,
        slave_indices,
        force_law_indices,
        stiffnesses,
        rest_lengths,
    )
}

// ── Target point records ────────────────────────────────────────

/// Body size of a target-point record.
pub const TARGET_POINT_SIZE: usize = I32_SIZE + 4 * F64_SIZE;

/// Encode a target-point record body: master index, stiffness, target.
pub fn encode_target_point(
    w: &mut dyn Write,
    spec: &TargetPointForceSpec,
) -> Result<(), StashError> {
    write_i32_le(w, spec.master_index())?;
    write_f64_le(w, spec.stiffness())?;
    write_f64_slice(w, spec.target())?;
    Ok(())
}

/// Decode a target-point record body, shifting the master index by
/// `offset`.
pub fn decode_target_point(
    r: &mut dyn Read,
    offset: NodeIndex,
) -> Result<TargetPointForceSpec, StashError> {
    let master_index = shift(read_i32_le(r)?, offset)?;
    let stiffness = read_f64_le(r)?;
    let target = [read_f64_le(r)?, read_f64_le(r)?, read_f64_le(r)?];
    Ok(TargetPointForceSpec::new(master_index, stiffness, target))
}

// ── Segment header ──────────────────────────────────────────────

/// Fields carried in a segment header after the magic and version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Fingerprint of the sender's registry table.
    pub fingerprint: u64,
    /// Rank that produced the segment.
    pub source_rank: u32,
}

/// Encode a segment header (magic, version, fingerprint, source rank).
pub fn encode_segment_header(w: &mut dyn Write, header: &SegmentHeader) -> Result<(), StashError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_u64_le(w, header.fingerprint)?;
    write_u32_le(w, header.source_rank)?;
    Ok(())
}

/// Decode and validate a segment header.
pub fn decode_segment_header(r: &mut dyn Read) -> Result<SegmentHeader, StashError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(StashError::InvalidMagic);
    }

    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(StashError::UnsupportedVersion { found: version });
    }

    Ok(SegmentHeader {
        fingerprint: read_u64_le(r)?,
        source_rank: read_u32_le(r)?,
    })
}

// ── Segment entries ─────────────────────────────────────────────

/// Read the marker index that opens a segment entry.
///
/// Returns `Ok(None)` on clean EOF (no bytes available) and an error if
/// the stream ends partway through the index.
pub fn decode_entry_marker(r: &mut dyn Read) -> Result<Option<NodeIndex>, StashError> {
    // Read byte-by-byte to distinguish clean EOF from a truncated entry.
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(StashError::MalformedRecord {
                    detail: format!("truncated entry header: got {filled} of 4 bytes for marker"),
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(StashError::Io(e)),
        }
    }
    Ok(Some(i32::from_le_bytes(buf)))
}
