//! Decode limits and validation switches for the stream codec.

use crate::error::StashError;

/// Configuration for packing and unpacking stashable records.
///
/// Held by the [`StashableRegistry`](crate::StashableRegistry) and applied
/// to every decode it performs. Validated when the registry is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StashConfig {
    /// Largest spring count a spring record may carry.
    ///
    /// Packing a larger record fails with
    /// [`StashError::InvalidRecord`] before anything is written. On decode
    /// a larger count is treated as corruption and rejected before any
    /// buffer is allocated. Default: 1_048_576. Must be at least 1.
    pub max_spring_count: u32,

    /// Whether [`StashReader::open`](crate::StashReader::open) rejects
    /// segments whose registry fingerprint differs from the local one.
    ///
    /// Default: `true`.
    pub verify_fingerprint: bool,
}

impl StashConfig {
    /// Default decode limit on springs per record.
    pub const DEFAULT_MAX_SPRING_COUNT: u32 = 1 << 20;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), StashError> {
        if self.max_spring_count == 0 {
            return Err(StashError::InvalidConfig {
                reason: "max_spring_count must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Check that a record with `spring_count` springs can be decoded
    /// under this configuration.
    pub fn check_spring_count(&self, spring_count: usize) -> Result<(), StashError> {
        if spring_count > self.max_spring_count as usize {
            return Err(StashError::InvalidRecord {
                reason: format!(
                    "spring count {spring_count} exceeds limit {}",
                    self.max_spring_count
                ),
            });
        }
        Ok(())
    }
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            max_spring_count: Self::DEFAULT_MAX_SPRING_COUNT,
            verify_fingerprint: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validates() {
        StashConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_spring_limit_rejected() {
        let config = StashConfig {
            max_spring_count: 0,
            ..StashConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StashError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn spring_count_limit_is_inclusive() {
        let config = StashConfig {
            max_spring_count: 4,
            ..StashConfig::default()
        };
        config.check_spring_count(0).unwrap();
        config.check_spring_count(4).unwrap();
        assert!(matches!(
            config.check_spring_count(5),
            Err(StashError::InvalidRecord { .. })
        ));
    }
}
