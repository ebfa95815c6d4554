//! Wire-tag registry for stashable record types.

use std::io::{Read, Write};

use indexmap::IndexMap;
use log::{debug, error, info};
use tether_comm::Communicator;
use tether_core::{NodeIndex, StashableId};

use crate::codec;
use crate::config::StashConfig;
use crate::error::StashError;
use crate::hash::registry_fingerprint;
use crate::stashable::{Stashable, StashableKind, StashableRecord};

/// Decodes one record body and wraps it as a [`Stashable`].
pub type DecodeFn = fn(&mut dyn Read, NodeIndex, &StashConfig) -> Result<Stashable, StashError>;

#[derive(Clone, Copy)]
struct RegistryEntry {
    kind: StashableKind,
    decode: DecodeFn,
}

/// Whether any rank in `comm` reports `local_failed`. Collective.
pub(crate) fn any_rank_failed<C: Communicator>(
    comm: &C,
    local_failed: bool,
) -> Result<bool, StashError> {
    let flag = |v: &[u8]| v.first().copied().unwrap_or(1);
    let any = comm.all_reduce(
        |a, b| vec![flag(&a) | flag(&b)],
        vec![u8::from(local_failed)],
    )?;
    Ok(flag(&any) != 0)
}

fn decode_into<T: StashableRecord>(
    r: &mut dyn Read,
    offset: NodeIndex,
    config: &StashConfig,
) -> Result<Stashable, StashError> {
    T::unpack(r, offset, config).map(T::into_stashable)
}

/// Maps wire tags to record decoders.
///
/// Registration is collective by contract: every rank must register the
/// same types in the same order, so the deterministic tag counter hands
/// out identical tags everywhere. [`verify_collective`] checks this before
/// the first pack or unpack.
///
/// [`verify_collective`]: StashableRegistry::verify_collective
///
/// # Examples
///
/// ```
/// use tether_stash::{SpringForceSpec, StashableId, StashableRegistry, TargetPointForceSpec};
///
/// let mut registry = StashableRegistry::new();
/// assert_eq!(registry.register::<SpringForceSpec>(), StashableId(0));
/// assert_eq!(registry.register::<TargetPointForceSpec>(), StashableId(1));
/// assert_eq!(registry.register::<SpringForceSpec>(), StashableId(0));
/// assert_eq!(registry.len(), 2);
/// ```
#[derive(Clone)]
pub struct StashableRegistry {
    entries: IndexMap<StashableId, RegistryEntry>,
    ids: IndexMap<StashableKind, StashableId>,
    config: StashConfig,
}

impl std::fmt::Debug for StashableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StashableRegistry")
            .field("ids", &self.ids)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for StashableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StashableRegistry {
    /// Empty registry with the default [`StashConfig`].
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            ids: IndexMap::new(),
            config: StashConfig::default(),
        }
    }

    /// Empty registry with an explicit configuration.
    pub fn with_config(config: StashConfig) -> Result<Self, StashError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// The limits applied by [`pack`](Self::pack) and [`unpack`](Self::unpack).
    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `T`, returning its wire tag.
    ///
    /// A second call for the same type returns the existing tag and
    /// creates nothing.
    pub fn register<T: StashableRecord>(&mut self) -> StashableId {
        if let Some(&id) = self.ids.get(&T::KIND) {
            debug!("stashable kind '{}' already registered as tag {id}", T::KIND);
            return id;
        }
        let id = StashableId(self.entries.len() as u32);
        self.entries.insert(
            id,
            RegistryEntry {
                kind: T::KIND,
                decode: decode_into::<T>,
            },
        );
        self.ids.insert(T::KIND, id);
        info!("registered stashable kind '{}' as tag {id}", T::KIND);
        id
    }

    /// Whether `T` has a tag.
    pub fn is_registered<T: StashableRecord>(&self) -> bool {
        self.is_kind_registered(T::KIND)
    }

    /// Whether `kind` has a tag.
    pub fn is_kind_registered(&self, kind: StashableKind) -> bool {
        self.ids.contains_key(&kind)
    }

    /// The tag assigned to `kind`.
    pub fn id_of(&self, kind: StashableKind) -> Result<StashableId, StashError> {
        self.ids
            .get(&kind)
            .copied()
            .ok_or(StashError::NotRegistered { kind })
    }

    /// Registered `(tag, kind)` pairs in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (StashableId, StashableKind)> + '_ {
        self.entries.iter().map(|(&id, entry)| (id, entry.kind))
    }

    /// Check that `payload` is registered and within the configured
    /// limits, returning its tag.
    ///
    /// A payload that passes packs into bytes this registry can unpack.
    pub fn check_packable(&self, payload: &Stashable) -> Result<StashableId, StashError> {
        let id = self.id_of(payload.kind())?;
        if let Stashable::SpringForce(spec) = payload {
            self.config.check_spring_count(spec.spring_count())?;
        }
        Ok(id)
    }

    /// Write the tag of `payload` followed by its body.
    ///
    /// Nothing is written if [`check_packable`](Self::check_packable)
    /// rejects the payload.
    pub fn pack(&self, w: &mut dyn Write, payload: &Stashable) -> Result<(), StashError> {
        let id = self.check_packable(payload)?;
        codec::write_u32_le(w, id.0)?;
        payload.pack(w)
    }

    /// Bytes [`pack`](Self::pack) may write for `payload`, tag included.
    pub fn packed_size_upper_bound(&self, payload: &Stashable) -> usize {
        codec::U32_SIZE + payload.packed_size_upper_bound()
    }

    /// Read one tagged record, shifting every node index by `offset`.
    pub fn unpack(&self, r: &mut dyn Read, offset: NodeIndex) -> Result<Stashable, StashError> {
        self.unpack_with(r, offset, &self.config)
    }

    /// [`unpack`](Self::unpack) with explicit decode limits.
    ///
    /// An unknown tag fails with [`StashError::UnknownTag`] after reading
    /// only the tag.
    pub fn unpack_with(
        &self,
        r: &mut dyn Read,
        offset: NodeIndex,
        config: &StashConfig,
    ) -> Result<Stashable, StashError> {
        let tag = StashableId(codec::read_u32_le(r)?);
        let Some(entry) = self.entries.get(&tag) else {
            error!(
                "no decoder registered for stashable tag {tag} ({} kinds known)",
                self.entries.len()
            );
            return Err(StashError::UnknownTag { tag });
        };
        (entry.decode)(r, offset, config)
    }

    /// FNV-1a fingerprint of the ordered registration table.
    pub fn fingerprint(&self) -> u64 {
        registry_fingerprint(self.iter())
    }

    /// Check that every rank holds the same registration table.
    ///
    /// Collective: rank 0's fingerprint is broadcast and a mismatch flag is
    /// reduced across all ranks, so either every rank returns `Ok` or every
    /// rank returns [`StashError::FingerprintMismatch`] with rank 0's
    /// fingerprint as `expected` and its own as `found`.
    pub fn verify_collective<C: Communicator>(&self, comm: &C) -> Result<(), StashError> {
        let local = self.fingerprint();
        let root_bytes = comm.broadcast(if comm.rank() == 0 {
            Some(local.to_le_bytes().to_vec())
        } else {
            None
        })?;
        let root_bytes: [u8; 8] =
            root_bytes
                .as_slice()
                .try_into()
                .map_err(|_| StashError::MalformedRecord {
                    detail: format!(
                        "broadcast fingerprint has {} bytes, expected 8",
                        root_bytes.len()
                    ),
                })?;
        let root = u64::from_le_bytes(root_bytes);

        if any_rank_failed(comm, local != root)? {
            if local != root {
                error!(
                    "rank {} registry fingerprint {local:#018x} differs from rank 0 ({root:#018x})",
                    comm.rank()
                );
            }
            return Err(StashError::FingerprintMismatch {
                expected: root,
                found: local,
            });
        }
        debug!(
            "rank {} registry fingerprint {local:#018x} agrees across {} ranks",
            comm.rank(),
            comm.size()
        );
        Ok(())
    }
}
