//! Registry fingerprinting.
//!
//! Uses FNV-1a for fast, deterministic hashing of the registration table.
//! The hash is not cryptographically secure; it only detects ranks whose
//! registration sequences diverged.

use tether_core::StashableId;

use crate::stashable::StashableKind;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_u32(mut hash: u64, v: u32) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Hash an ordered `(tag, kind)` table.
///
/// The tag and the kind's stable name are folded in per entry, with a
/// zero byte closing each name, so entry order matters. An empty table
/// hashes to the FNV offset basis.
pub fn registry_fingerprint<I>(entries: I) -> u64
where
    I: IntoIterator<Item = (StashableId, StashableKind)>,
{
    let mut hash = FNV_OFFSET;
    for (tag, kind) in entries {
        hash = fnv1a_u32(hash, tag.0);
        for &b in kind.name().as_bytes() {
            hash = fnv1a_byte(hash, b);
        }
        hash = fnv1a_byte(hash, 0);
    }
    hash
}
