use std::{
    io::{BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::Context;
use brc_stats::{process_file, Config};
use clap::Parser;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

/// Prints `name = min/mean/max` for every name in a file of `<name>;<value>` lines
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Input file
    #[arg(default_value = "measurements.txt")]
    path: PathBuf,

    /// Number of worker threads, defaults to the available parallelism
    #[arg(short, long)]
    workers: Option<usize>,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let started = Instant::now();
    let args = CliArgs::parse();

    TermLogger::init(
        if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let mut config = Config::default();
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    let mut buffered_stdout = BufWriter::with_capacity(2 * 1024 * 1024, std::io::stdout());
    process_file(&args.path, config, &mut buffered_stdout)
        .with_context(|| format!("failed to process {}", args.path.display()))?;

    writeln!(buffered_stdout)?;
    writeln!(buffered_stdout, "Processed in: {:?}", started.elapsed())?;
    buffered_stdout.flush()?;
    Ok(())
}
