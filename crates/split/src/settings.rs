use std::num::NonZeroUsize;

use snb_model::Thresholds;

use crate::classifier::SplitMode;

/// Read-only settings shared by every worker of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSettings {
    pub mode: SplitMode,
    /// Partitions of each update stream.
    pub num_partitions: NonZeroUsize,
    /// Fail on records deleted before they were created instead of dropping them.
    pub strict_lifespans: bool,
}

impl SplitSettings {
    pub fn raw() -> Self {
        SplitSettings {
            mode: SplitMode::Raw,
            num_partitions: NonZeroUsize::MIN,
            strict_lifespans: false,
        }
    }

    pub fn temporal(thresholds: Thresholds, num_partitions: NonZeroUsize) -> Self {
        SplitSettings {
            mode: SplitMode::TemporalSplit(thresholds),
            num_partitions,
            strict_lifespans: false,
        }
    }

    pub fn with_strict_lifespans(mut self, strict_lifespans: bool) -> Self {
        self.strict_lifespans = strict_lifespans;
        self
    }
}
