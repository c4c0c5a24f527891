// In: src/bin/sstable_dump.rs

//! Decodes one sstable and writes it as an Arrow IPC stream.
//!
//! ```text
//! sstable-dump Statistics.db Data.db --index Index.db --output users.arrows
//! sstable-dump Statistics.db Data.db --schema-json
//! ```

use anyhow::{Context, Result};
use arrow::ipc::writer::StreamWriter;
use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use sstable_arrow::{DecodeConfig, SstableDecoder};

#[derive(Parser, Debug)]
#[command(version, about = "Decode an sstable into an Arrow IPC stream")]
struct Args {
    /// Path to the Statistics component.
    statistics: PathBuf,

    /// Path to the Data component.
    data: PathBuf,

    /// Path to the Index component. Enables index cross-checking and sharding.
    #[arg(long)]
    index: Option<PathBuf>,

    /// A JSON file holding a `DecodeConfig`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured parallelism.
    #[arg(long)]
    parallelism: Option<usize>,

    /// Where to write the IPC stream. Defaults to stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Print the Arrow schema as JSON instead of decoding the data.
    #[arg(long)]
    schema_json: bool,
}

fn load_config(args: &Args) -> Result<DecodeConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            DecodeConfig::from_json(&json)?
        }
        None => DecodeConfig::default(),
    };
    if let Some(parallelism) = args.parallelism {
        config.parallelism = parallelism;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let statistics = std::fs::read(&args.statistics)
        .with_context(|| format!("reading {}", args.statistics.display()))?;
    let decoder = SstableDecoder::from_statistics(&statistics, config)?;

    if args.schema_json {
        let schema = decoder.arrow_schema();
        println!("{}", serde_json::to_string_pretty(&*schema)?);
        return Ok(());
    }

    let data = std::fs::read(&args.data).with_context(|| format!("reading {}", args.data.display()))?;
    let index = match &args.index {
        Some(path) => Some(std::fs::read(path).with_context(|| format!("reading {}", path.display()))?),
        None => None,
    };

    let table = decoder.decode(&data, index.as_deref())?;
    log::info!(
        "decoded {} row(s) across {} column(s)",
        table.row_count(),
        table.columns().len()
    );
    let batch = table.to_record_batch()?;

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).with_context(|| format!("creating {}", path.display()))?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = StreamWriter::try_new(sink, &batch.schema())?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(())
}
