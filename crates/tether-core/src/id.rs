//! Node indices and strongly-typed stashable identifiers.

use std::fmt;

/// Global index of a Lagrangian mesh node.
///
/// Indices are signed so that [`INVALID_NODE_INDEX`] can mark a record
/// whose owning node has not been assigned yet.
pub type NodeIndex = i32;

/// Sentinel for a node index that has not been assigned.
pub const INVALID_NODE_INDEX: NodeIndex = -1;

/// Shift a node index by a migration offset.
///
/// Returns `None` if the result does not fit in a [`NodeIndex`].
///
/// # Examples
///
/// ```
/// use tether_core::shift_node_index;
///
/// assert_eq!(shift_node_index(5, 100), Some(105));
/// assert_eq!(shift_node_index(i32::MAX, 1), None);
/// ```
#[inline]
pub fn shift_node_index(index: NodeIndex, offset: NodeIndex) -> Option<NodeIndex> {
    index.checked_add(offset)
}

/// Wire tag identifying a concrete stashable record type.
///
/// Tags are handed out by the registry in registration order, so two
/// processes that register the same types in the same order agree on
/// every tag. The tag is the only type information carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StashableId(pub u32);

impl fmt::Display for StashableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StashableId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sentinel_is_negative() {
        assert!(INVALID_NODE_INDEX < 0);
    }

    #[test]
    fn stashable_id_displays_raw_value() {
        assert_eq!(StashableId(7).to_string(), "7");
        assert_eq!(StashableId::from(3), StashableId(3));
    }

    proptest! {
        #[test]
        fn shift_matches_checked_add(index in any::<i32>(), offset in any::<i32>()) {
            prop_assert_eq!(shift_node_index(index, offset), index.checked_add(offset));
        }
    }
}
