use snb_split::{BlockPartitioner, SplitSettings, StageReport, run_stage};

use super::ports::{ChannelFactory, PersonSource};

/// The main application service that orchestrates the split.
/// It is generic over the PersonSource and ChannelFactory traits, allowing
/// for dependency injection.
pub struct PersonSerializerService<S: PersonSource, F: ChannelFactory> {
    source: S,
    channels: F,
    partitioner: BlockPartitioner,
    settings: SplitSettings,
}

impl<S: PersonSource, F: ChannelFactory> PersonSerializerService<S, F> {
    /// Creates a new service with concrete implementations of the ports.
    pub fn new(
        source: S,
        channels: F,
        partitioner: BlockPartitioner,
        settings: SplitSettings,
    ) -> Self {
        Self {
            source,
            channels,
            partitioner,
            settings,
        }
    }

    /// Executes the entire pipeline. A failed split leaves no output behind.
    pub fn run(&self) -> anyhow::Result<StageReport> {
        tracing::info!("Starting Stage 1: Loading persons");
        let persons = self.source.load()?;
        tracing::info!(persons = persons.len(), "Stage 1: Loading finished successfully");

        tracing::info!(
            "Starting Stage 2: Grouping persons for {} workers",
            self.partitioner.workers()
        );
        let streams = self.partitioner.distribute(persons)?;
        tracing::info!("Stage 2: Grouping finished successfully");

        tracing::info!("Starting Stage 3: Splitting into snapshot and update streams");
        match run_stage(&self.settings, &self.channels, streams) {
            Ok(report) => {
                tracing::info!("Stage 3: Splitting finished successfully");
                Ok(report)
            }
            Err(err) => {
                if let Err(cleanup) = self.channels.discard_all() {
                    tracing::error!("Failed to remove partial output: {cleanup}");
                }
                Err(err.into())
            }
        }
    }
}
