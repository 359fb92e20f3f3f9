use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::info;

use vareffect::data::cache::InMemoryCache;
use vareffect::data::cdot;
use vareffect::data::variant_io::VariantReader;
use vareffect::data::writer::TsvWriter;
use vareffect::pipeline::{self, PipelineConfig};

/// Annotate variants with their predicted effect on overlapping transcripts.
#[derive(Parser, Debug)]
#[command(name = "vareffect", version, about)]
struct Args {
    /// Path to a cdot-shaped gene model JSON file (optionally gzip-compressed).
    #[arg(long)]
    cache: PathBuf,

    /// Genome build key to select within the gene model's `genome_builds` map.
    #[arg(long, default_value = "GRCh38")]
    genome_build: String,

    /// Reference FASTA (with a `.fai` index alongside it) used to splice CDS
    /// and 3'UTR sequence onto each transcript. Without this, every
    /// transcript is treated as non-coding and no `c.`/`p.` HGVS is emitted.
    #[arg(long)]
    fasta: Option<PathBuf>,

    /// Input variant file (`chrom pos ref alt` per line). Defaults to stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output TSV path. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of worker threads. Defaults to the logical core count.
    #[arg(long)]
    threads: Option<usize>,

    /// Only annotate against canonical transcripts.
    #[arg(long)]
    canonical_only: bool,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("loading gene model from {}", args.cache.display());
    let transcripts = cdot::load_transcripts(&args.cache, &args.genome_build, args.fasta.as_deref())?;
    info!("loaded {} transcripts", transcripts.len());
    let cache: Arc<dyn vareffect::data::TranscriptCache> =
        Arc::new(InMemoryCache::new(transcripts));

    let mut reader: Box<dyn vareffect::data::VariantReader> = match &args.input {
        Some(path) => Box::new(VariantReader::new(BufReader::new(File::open(path)?))),
        None => Box::new(VariantReader::new(BufReader::new(std::io::stdin()))),
    };

    let mut writer: Box<dyn vareffect::data::AnnotationWriter> = match &args.output {
        Some(path) => Box::new(TsvWriter::new(BufWriter::new(File::create(path)?))),
        None => Box::new(TsvWriter::new(BufWriter::new(std::io::stdout()))),
    };

    let config = PipelineConfig {
        workers: args.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }),
        queue_capacity: 64,
        progress_interval: Duration::from_secs(5),
        canonical_only: args.canonical_only,
    };

    let emitted = pipeline::run(reader.as_mut(), cache, writer.as_mut(), &config, |n| {
        info!("processed {n} variants so far");
    })?;

    info!("done, annotated {emitted} variant(s)");
    Ok(())
}
