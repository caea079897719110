mod application;
mod config;
mod infrastructure;

use anyhow::Result;
use config::{get_config, split_settings};
use snb_split::BlockPartitioner;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use application::service::PersonSerializerService;
use infrastructure::{csv_channel::CsvChannelFactory, source::InputSource};

fn setup_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.parse()?)
        .from_env_lossy();

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let config = get_config()?;
    setup_tracing(&config.logging.level)?;
    tracing::debug!(?config, "Full application configuration");
    tracing::info!(
        mode = ?config.serializer.mode,
        workers = config.serializer.num_threads,
        partitions = config.serializer.num_partitions,
        "Splitting persons into {:?}",
        config.paths.output_dir
    );

    let source = InputSource::new(&config);
    let channels = CsvChannelFactory::new(&config.paths.output_dir);
    let partitioner =
        BlockPartitioner::new(config.serializer.block_size, config.serializer.num_threads)?;
    let settings = split_settings(&config)?;

    let service = PersonSerializerService::new(source, channels, partitioner, settings);

    match service.run() {
        Ok(report) => {
            let total = report.total;
            tracing::info!(
                workers = report.workers.len(),
                snapshot = total.snapshot,
                inserts = total.inserts,
                deletes = total.deletes,
                dropped = total.dropped,
                inverted = total.inverted,
                "Split written to {:?}",
                config.paths.output_dir
            );
            if total.inverted > 0 {
                tracing::warn!(
                    "{} records were deleted before their creation",
                    total.inverted
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Split failed, partial output removed: {:?}", e);
            std::process::exit(1);
        }
    }
}
