//! Fixtures shared by the split benchmarks.

use std::num::NonZeroUsize;

use snb_model::generator::PersonGenerator;
use snb_model::{Person, Thresholds, Timestamp};
use snb_split::{Batch, BlockPartitioner, SplitSettings};

pub const SEED: u64 = 0x5eed;
pub const BLOCK_SIZE: usize = 256;
pub const PARTITIONS: usize = 4;

/// Generated persons whose lifespans straddle the bulk load threshold.
pub fn persons(count: usize) -> Vec<Person> {
    PersonGenerator::seeded(Timestamp::from_days(0), Timestamp::from_days(730), SEED)
        .take(count)
        .collect()
}

pub fn temporal_settings() -> snb_split::Result<SplitSettings> {
    let thresholds = Thresholds::new(Timestamp::from_days(600), Timestamp::from_days(730))
        .map_err(|err| snb_split::Error::Config(err.to_string()))?;
    let partitions = NonZeroUsize::new(PARTITIONS)
        .ok_or_else(|| snb_split::Error::Config("zero partitions".into()))?;
    Ok(SplitSettings::temporal(thresholds, partitions))
}

pub fn streams(persons: Vec<Person>, workers: usize) -> snb_split::Result<Vec<Vec<Batch>>> {
    BlockPartitioner::new(BLOCK_SIZE, workers)?.distribute(persons)
}
