use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context;
use snb_config::{Config, InputConfig};
use snb_model::generator::PersonGenerator;
use snb_model::{Person, Timestamp};

use crate::application::ports::PersonSource;

/// Reads persons stored one JSON document per line.
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PersonSource for JsonlSource {
    fn load(&self) -> anyhow::Result<Vec<Person>> {
        tracing::info!("Input file: {:?}", self.path);
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open persons file: {:?}", self.path))?;
        snb_model::read_persons_jsonl(BufReader::new(file))
            .with_context(|| format!("Failed to read persons file: {:?}", self.path))
    }
}

/// Seeded synthetic persons, created around the bulk load threshold so that
/// every routing bucket is populated.
pub struct GeneratedSource {
    persons: usize,
    seed: u64,
    start: Timestamp,
    end: Timestamp,
}

impl GeneratedSource {
    pub fn new(persons: usize, seed: u64, bulk_load_threshold: Timestamp, simulation_end: Timestamp) -> Self {
        let threshold = bulk_load_threshold.as_millis();
        let span = (simulation_end.as_millis() - threshold).max(Timestamp::MILLIS_PER_DAY);
        Self {
            persons,
            seed,
            start: Timestamp::from_millis(threshold - span),
            end: Timestamp::from_millis(threshold + span),
        }
    }
}

impl PersonSource for GeneratedSource {
    fn load(&self) -> anyhow::Result<Vec<Person>> {
        tracing::debug!(
            persons = self.persons,
            seed = self.seed,
            start = %self.start,
            end = %self.end,
            "generating persons"
        );
        let persons = PersonGenerator::seeded(self.start, self.end, self.seed)
            .take(self.persons)
            .collect();
        Ok(persons)
    }
}

/// The source selected by the `input` section.
pub enum InputSource {
    Jsonl(JsonlSource),
    Generated(GeneratedSource),
}

impl InputSource {
    pub fn new(config: &Config) -> Self {
        match &config.input {
            InputConfig::Jsonl { path } => InputSource::Jsonl(JsonlSource::new(path)),
            InputConfig::Generated { persons, seed } => InputSource::Generated(GeneratedSource::new(
                *persons,
                *seed,
                config.dates.bulk_load_threshold,
                config.dates.simulation_end,
            )),
        }
    }
}

impl PersonSource for InputSource {
    fn load(&self) -> anyhow::Result<Vec<Person>> {
        match self {
            InputSource::Jsonl(source) => source.load(),
            InputSource::Generated(source) => source.load(),
        }
    }
}
