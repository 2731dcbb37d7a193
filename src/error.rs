use thiserror::Error;

/// Every way a run can fail. A run either produces a full report or one of these.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not access input: {0}")]
    Io(#[from] std::io::Error),

    #[error("input is empty")]
    EmptyInput,

    /// No `\n` between `window_start` and `window_end` while looking for a chunk boundary
    #[error("no line terminator in bytes [{window_start} .. {window_end}], input is not line-delimited")]
    NoLineTerminator { window_start: u64, window_end: u64 },

    #[error("malformed line `{line}`, expected `<name>;<value>` with one fractional digit")]
    MalformedLine { line: String },

    #[error("key `{key}` is not valid UTF-8")]
    InvalidKey { key: String },

    #[error("a worker thread panicked")]
    WorkerPanicked,
}

impl Error {
    pub(crate) fn malformed(line: &[u8]) -> Self {
        Self::MalformedLine {
            line: String::from_utf8_lossy(line).into_owned(),
        }
    }
}
