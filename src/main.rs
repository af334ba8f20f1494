use byte_tally::{Config, FileSource, Threads, DEFAULT_CAPACITY};
use clap::Parser;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

/// Count how often each byte value occurs in a file.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// File to read.
    path: PathBuf,

    /// Worker threads [default: available CPUs].
    #[arg(short, long)]
    workers: Option<NonZeroUsize>,

    /// Per-worker read buffer size in bytes.
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    buffer_size: usize,
}

fn main() -> io::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::new().with_capacity(args.buffer_size);
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }

    let start = Instant::now();
    let source = FileSource::open(&args.path)?;
    let census = byte_tally::count(Threads, source, &config)?;
    let elapsed = start.elapsed();

    let mut out = BufWriter::new(io::stdout().lock());
    for row in census.tally.report() {
        writeln!(out, "{} {}", row, row.count)?;
    }
    writeln!(out, "{} bytes in {:.3?}", census.total, elapsed)?;
    out.flush()
}
