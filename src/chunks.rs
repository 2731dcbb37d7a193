use log::debug;
use memchr::{memchr, memrchr};

use crate::error::Error;

/// Half-open `[start .. end)` byte offsets into the input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The bytes of `input` covered by this range
    pub fn slice<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.start as usize..self.end as usize]
    }
}

/// Line terminator used by the whole input, decided from its first line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// `CrLf` if the first `\n` of `input` is preceded by `\r`.
    /// An input without any `\n` is a single unterminated line, treated as `Lf`.
    pub fn detect(input: &[u8]) -> Self {
        match memchr(b'\n', input) {
            Some(idx) if idx > 0 && input[idx - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }

    /// Bytes to drop from the end of a line before the `\n`
    #[inline]
    pub fn trailer_len(self) -> usize {
        match self {
            Self::Lf => 0,
            Self::CrLf => 1,
        }
    }
}

/// Line-aligned ranges covering the whole input, one per worker
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    pub ranges: Vec<ByteRange>,
    pub line_ending: LineEnding,
}

/// Splits `input` into up to `workers` ranges, each ending just after a `\n` (or at the end
/// of input), which together cover `input` exactly.
///
/// Boundary `i` is found by searching the `lookback` bytes just before `start + len / workers`
/// for their last `\n`, so `lookback` must exceed the longest line. When `len / workers` is
/// no bigger than `lookback`, a single range covers everything.
pub fn plan_chunks(input: &[u8], workers: usize, lookback: usize) -> Result<ChunkPlan, Error> {
    let len = input.len() as u64;
    if len == 0 {
        return Err(Error::EmptyInput);
    }
    let workers = workers.max(1) as u64;
    let lookback = lookback.max(1) as u64;
    let chunk_size = len / workers;
    let line_ending = LineEnding::detect(input);

    if chunk_size <= lookback {
        debug!("{len} bytes is too small to split {workers} ways, using a single range");
        return Ok(ChunkPlan {
            ranges: vec![ByteRange { start: 0, end: len }],
            line_ending,
        });
    }

    let mut ranges = Vec::with_capacity(workers as usize);
    let mut start = 0;
    for _ in 0..workers - 1 {
        // start <= i * chunk_size, so the window stays inside the input and after `start`
        let window_end = start + chunk_size;
        let window_start = window_end - lookback;
        let window = &input[window_start as usize..window_end as usize];
        let Some(newline) = memrchr(b'\n', window) else {
            return Err(Error::NoLineTerminator {
                window_start,
                window_end,
            });
        };
        let end = window_start + newline as u64 + 1;
        ranges.push(ByteRange { start, end });
        start = end;
    }
    ranges.push(ByteRange { start, end: len });

    debug!(
        "planned {} ranges over {len} bytes, line ending {line_ending:?}",
        ranges.len()
    );
    Ok(ChunkPlan {
        ranges,
        line_ending,
    })
}
