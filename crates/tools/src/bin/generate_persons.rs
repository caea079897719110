use std::io::BufWriter;

use anyhow::Context;
use clap::Parser;
use snb_model::generator::PersonGenerator;

/// Writes synthetic persons, one JSON document per line, for the
/// person_serializer `jsonl` input.
fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    if config.start >= config.end {
        anyhow::bail!("--start must be before --end");
    }

    if let Some(parent) = config.out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&config.out_path)
        .with_context(|| format!("cannot create {}", config.out_path.display()))?;

    let generator = match config.seed {
        Some(seed) => PersonGenerator::seeded(config.start, config.end, seed),
        None => PersonGenerator::new(config.start, config.end),
    };
    let written = snb_model::write_persons_jsonl(BufWriter::new(file), generator.take(config.persons))?;
    println!("wrote {written} persons to {}", config.out_path.display());
    Ok(())
}

#[derive(Clone, Debug, Parser)]
#[command()]
struct Config {
    #[arg()]
    out_path: Box<std::path::Path>,
    #[arg()]
    persons: usize,
    /// First creation instant (epoch millis or date).
    #[arg(long, value_parser = parse_timestamp, default_value = "2010-01-01")]
    start: snb_model::Timestamp,
    /// End of the creation window (epoch millis or date).
    #[arg(long, value_parser = parse_timestamp, default_value = "2013-01-01")]
    end: snb_model::Timestamp,
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_timestamp(value: &str) -> anyhow::Result<snb_model::Timestamp> {
    snb_config::parse_timestamp(value).with_context(|| format!("invalid instant: {value}"))
}
