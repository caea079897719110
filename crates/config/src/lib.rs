mod serde_timestamp;

pub use serde_timestamp::parse as parse_timestamp;

use std::path::{Path, PathBuf};

use anyhow::Context;
use snb_model::{Thresholds, Timestamp};

/// `config/settings.toml` at the workspace root (`settings-dev.toml` when
/// built with `SNB_DEV` set).
pub const DEFAULT_CONFIG_FILE: &str = env!("DEFAULT_CONFIG_FILE");

/// Environment overrides look like `SNB__SERIALIZER__NUM_PARTITIONS=4`.
const ENV_PREFIX: &str = "SNB";
const ENV_SEPARATOR: &str = "__";

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    pub input: InputConfig,
    pub serializer: SerializerConfig,
    pub dates: DatesConfig,
}

impl Config {
    pub fn from_file(config_file: &Path) -> anyhow::Result<Self> {
        Self::load(config_file, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load(config_file: &Path, environment: config::Environment) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(config_file))
            .add_source(environment.separator(ENV_SEPARATOR).try_parsing(true))
            .build()
            .with_context(|| format!("failed to read config {}", config_file.display()))?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.serializer.num_partitions == 0 {
            anyhow::bail!("serializer.num_partitions must be at least 1");
        }
        if self.serializer.block_size == 0 {
            anyhow::bail!("serializer.block_size must be at least 1");
        }
        self.thresholds()?;
        Ok(())
    }

    pub fn thresholds(&self) -> anyhow::Result<Thresholds> {
        let thresholds = Thresholds::new(self.dates.bulk_load_threshold, self.dates.simulation_end)?;
        Ok(thresholds)
    }

    /// Worker count, with `0` standing for the available parallelism.
    pub fn num_threads(&self) -> anyhow::Result<usize> {
        match self.serializer.num_threads {
            0 => Ok(std::thread::available_parallelism()?.get()),
            num_threads => Ok(num_threads),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct PathsConfig {
    pub output_dir: PathBuf,
}

/// Where persons come from before they are split.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputConfig {
    /// One JSON person per line.
    Jsonl { path: PathBuf },
    /// Seeded synthetic persons created inside the `dates` window.
    Generated { persons: usize, seed: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatagenMode {
    RawData,
    Interactive,
    Bi,
}

impl DatagenMode {
    /// Whether records are split into snapshot and update streams.
    pub fn splits_streams(self) -> bool {
        matches!(self, DatagenMode::Interactive | DatagenMode::Bi)
    }
}

impl std::str::FromStr for DatagenMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw_data" => Ok(Self::RawData),
            "interactive" => Ok(Self::Interactive),
            "bi" => Ok(Self::Bi),
            _ => anyhow::bail!("unknown datagen mode: {s}"),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct SerializerConfig {
    pub mode: DatagenMode,
    #[serde(default)]
    pub num_threads: usize,
    /// Number of partitions of every update stream.
    #[serde(default = "default_num_partitions")]
    pub num_partitions: usize,
    /// Persons per block; blocks are the unit distributed across workers.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Fail on records deleted before they were created instead of dropping them.
    #[serde(default)]
    pub strict_lifespans: bool,
}

fn default_num_partitions() -> usize {
    1
}

fn default_block_size() -> usize {
    10_000
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct DatesConfig {
    #[serde(deserialize_with = "serde_timestamp::deserialize")]
    pub bulk_load_threshold: Timestamp,
    #[serde(deserialize_with = "serde_timestamp::deserialize")]
    pub simulation_end: Timestamp,
}
