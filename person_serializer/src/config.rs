use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use snb_config::{Config, DatagenMode};
use snb_split::SplitSettings;

/// Parses command-line arguments using the clap derive macro.
#[derive(Parser, Debug)]
#[command(version, about = "Splits persons into a bulk load snapshot and update streams", long_about = None)]
struct Cli {
    /// Settings file; defaults to config/settings.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub num_threads: Option<usize>,

    /// raw_data, interactive or bi.
    #[arg(short, long)]
    pub mode: Option<DatagenMode>,

    #[arg(short = 'p', long)]
    pub num_partitions: Option<usize>,

    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Loads configuration from the TOML file and merges it with CLI arguments.
pub fn get_config() -> anyhow::Result<Config> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(snb_config::DEFAULT_CONFIG_FILE));
    let mut config = Config::from_file(&config_path)?;
    apply_cli(&mut config, cli);
    config.validate()?;

    if config.serializer.num_threads == 0 {
        config.serializer.num_threads = config.num_threads()?;
    }

    Ok(config)
}

fn apply_cli(config: &mut Config, cli: Cli) {
    if let Some(num_threads) = cli.num_threads {
        config.serializer.num_threads = num_threads;
    }
    if let Some(mode) = cli.mode {
        config.serializer.mode = mode;
    }
    if let Some(num_partitions) = cli.num_partitions {
        config.serializer.num_partitions = num_partitions;
    }
    if let Some(output_dir) = cli.output_dir {
        config.paths.output_dir = output_dir;
    }
}

/// The read-only settings handed to every worker.
pub fn split_settings(config: &Config) -> anyhow::Result<SplitSettings> {
    let serializer = &config.serializer;
    let settings = if serializer.mode.splits_streams() {
        let num_partitions = NonZeroUsize::new(serializer.num_partitions)
            .ok_or_else(|| anyhow::anyhow!("serializer.num_partitions must be at least 1"))?;
        SplitSettings::temporal(config.thresholds()?, num_partitions)
    } else {
        SplitSettings::raw()
    };
    Ok(settings.with_strict_lifespans(serializer.strict_lifespans))
}

#[cfg(test)]
mod tests {
    use super::*;
    use snb_split::SplitMode;

    fn config(mode: DatagenMode) -> anyhow::Result<Config> {
        let mut config = Config::from_file(std::path::Path::new(snb_config::DEFAULT_CONFIG_FILE))?;
        config.serializer.mode = mode;
        Ok(config)
    }

    #[test]
    fn cli_overrides_settings() -> anyhow::Result<()> {
        let mut config = config(DatagenMode::Interactive)?;
        let cli = Cli::try_parse_from([
            "person_serializer",
            "--mode",
            "raw_data",
            "-p",
            "7",
            "--output-dir",
            "/tmp/split",
            "-n",
            "3",
        ])?;
        apply_cli(&mut config, cli);

        assert_eq!(config.serializer.mode, DatagenMode::RawData);
        assert_eq!(config.serializer.num_partitions, 7);
        assert_eq!(config.serializer.num_threads, 3);
        assert_eq!(config.paths.output_dir, PathBuf::from("/tmp/split"));
        Ok(())
    }

    #[test]
    fn mode_selects_split_settings() -> anyhow::Result<()> {
        let raw = split_settings(&config(DatagenMode::RawData)?)?;
        assert_eq!(raw.mode, SplitMode::Raw);

        for mode in [DatagenMode::Interactive, DatagenMode::Bi] {
            let config = config(mode)?;
            let settings = split_settings(&config)?;
            assert_eq!(settings.mode, SplitMode::TemporalSplit(config.thresholds()?));
            assert_eq!(settings.num_partitions.get(), config.serializer.num_partitions);
        }
        Ok(())
    }
}
