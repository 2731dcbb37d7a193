//! Per-key min, mean and max over a file of `<name>;<value>` lines, using every core.
//!
//! The input is memory mapped and split into line-aligned ranges ([`chunks`]). Each range is
//! scanned by its own thread into a private [`AggregateTable`] ([`scanner`]), the tables are
//! folded together once all threads are done ([`stats`]) and the result is written sorted by
//! name ([`report`]).

pub mod chunks;
pub mod error;
pub mod parse;
pub mod report;
pub mod scanner;
pub mod stats;

use std::{fs::File, io::Write, path::Path, thread};

use log::{debug, warn};
use memmap2::MmapOptions;

pub use crate::chunks::{plan_chunks, ByteRange, ChunkPlan, LineEnding};
pub use crate::error::Error;
pub use crate::report::write_report;
pub use crate::scanner::LineScanner;
pub use crate::stats::{merge_tables, AggregateTable, Stat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on the number of ranges, and so threads
    pub workers: usize,
    /// Bytes searched backwards for each range boundary. Must exceed the longest line.
    pub lookback: usize,
    /// Initial size of each thread's read buffer
    pub scan_buffer: usize,
}

impl Config {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let workers = match thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(e) => {
                warn!("couldn't query the available parallelism ({e}), going single-threaded");
                1
            }
        };
        Self {
            workers,
            lookback: 1024 * 1024,
            scan_buffer: scanner::DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Aggregates every line of `input`, one thread per planned range.
/// Fails as a whole if any range fails.
pub fn aggregate(input: &[u8], config: Config) -> Result<AggregateTable, Error> {
    let ChunkPlan {
        ranges,
        line_ending,
    } = plan_chunks(input, config.workers, config.lookback)?;

    let tables = thread::scope(|s| {
        let handles: Vec<_> = ranges
            .iter()
            .map(|&range| {
                let view = range.slice(input);
                s.spawn(move || {
                    let table = LineScanner::new(view, line_ending, config.scan_buffer)
                        .scan(AggregateTable::new())?;
                    debug!(
                        "range [{} .. {}) done, {} distinct keys",
                        range.start,
                        range.end,
                        table.len()
                    );
                    Ok::<_, Error>(table)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(_) => Err(Error::WorkerPanicked),
            })
            .collect::<Result<Vec<AggregateTable>, Error>>()
    })?; // scope ends, all threads were joined

    Ok(merge_tables(tables))
}

/// Aggregates `input` and writes the sorted report to `out`.
/// Nothing is written unless every line was aggregated.
pub fn process(input: &[u8], config: Config, out: &mut impl Write) -> Result<(), Error> {
    let table = aggregate(input, config)?;
    write_report(table, out)?;
    Ok(())
}

/// [`process`] over the memory-mapped contents of the file at `path`
pub fn process_file(path: &Path, config: Config, out: &mut impl Write) -> Result<(), Error> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(Error::EmptyInput);
    }
    // SAFETY: the mapping is read-only and the input is not expected to change while we run.
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    debug!("mapped {} bytes of {}", mmap.len(), path.display());
    process(&mmap, config, out)
}
