use std::fmt;

/// Instant in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    pub const fn from_days(days: i64) -> Self {
        Timestamp(days * Self::MILLIS_PER_DAY)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Timestamp(millis)
    }
}

/// Creation and deletion of a person or a knows edge.
///
/// `deletion == None` means the record outlives the generated window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifespan {
    pub creation: Timestamp,
    pub deletion: Option<Timestamp>,
    pub explicitly_deleted: bool,
}

impl Lifespan {
    /// Deleted before it was created.
    pub fn is_inverted(&self) -> bool {
        matches!(self.deletion, Some(deletion) if deletion < self.creation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("bulk load threshold {bulk_load_threshold} is after simulation end {simulation_end}")]
pub struct InvalidThresholds {
    pub bulk_load_threshold: Timestamp,
    pub simulation_end: Timestamp,
}

/// The two global boundaries every record is classified against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    bulk_load_threshold: Timestamp,
    simulation_end: Timestamp,
}

impl Thresholds {
    pub fn new(
        bulk_load_threshold: Timestamp,
        simulation_end: Timestamp,
    ) -> Result<Self, InvalidThresholds> {
        if bulk_load_threshold > simulation_end {
            return Err(InvalidThresholds {
                bulk_load_threshold,
                simulation_end,
            });
        }
        Ok(Thresholds {
            bulk_load_threshold,
            simulation_end,
        })
    }

    pub fn bulk_load_threshold(&self) -> Timestamp {
        self.bulk_load_threshold
    }

    pub fn simulation_end(&self) -> Timestamp {
        self.simulation_end
    }
}
