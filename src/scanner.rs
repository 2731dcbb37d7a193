use std::io::{ErrorKind, Read};

use memchr::memchr;

use crate::chunks::LineEnding;
use crate::error::Error;
use crate::parse::parse_temperature;
use crate::stats::AggregateTable;

/// Initial size of the working buffer, 1 MiB
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Reads `<name>;<value>` lines from `source` and records them into an [`AggregateTable`].
///
/// Bytes are read into a working buffer. The unterminated tail of each read is moved to the
/// front of the buffer and completed by the next read; the buffer doubles whenever a single
/// partial line fills it.
pub struct LineScanner<R> {
    source: R,
    buffer: Vec<u8>,
    /// Length of the partial line kept at the front of `buffer`
    leftover: usize,
    line_ending: LineEnding,
}

impl<R: Read> LineScanner<R> {
    pub fn new(source: R, line_ending: LineEnding, buffer_size: usize) -> Self {
        Self {
            source,
            buffer: vec![0; buffer_size.max(1)],
            leftover: 0,
            line_ending,
        }
    }

    /// Current size of the working buffer
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Records every line of the source into `table` and hands it back once the source is
    /// exhausted. Stops at the first malformed line.
    pub fn scan(mut self, mut table: AggregateTable) -> Result<AggregateTable, Error> {
        self.scan_into(&mut table)?;
        Ok(table)
    }

    fn scan_into(&mut self, table: &mut AggregateTable) -> Result<(), Error> {
        let trailer = self.line_ending.trailer_len();
        loop {
            if self.leftover == self.buffer.len() {
                let doubled = self.buffer.len() * 2;
                self.buffer.resize(doubled, 0);
            }
            let read = self.fill()?;
            if read == 0 {
                break;
            }

            let filled = self.leftover + read;
            let mut remainder = &self.buffer[..filled];
            while let Some(newline) = memchr(b'\n', remainder) {
                record_line(&remainder[..newline.saturating_sub(trailer)], table)?;
                remainder = &remainder[newline + 1..];
            }
            let tail = remainder.len();
            self.buffer.copy_within(filled - tail..filled, 0);
            self.leftover = tail;
        }

        // last line of the input may lack its terminator
        if self.leftover > 0 {
            let line = &self.buffer[..self.leftover];
            let line = match self.line_ending {
                LineEnding::CrLf => line.strip_suffix(b"\r").unwrap_or(line),
                LineEnding::Lf => line,
            };
            record_line(line, table)?;
            self.leftover = 0;
        }
        Ok(())
    }

    /// Reads after the leftover bytes, returning how many arrived. 0 means end of source.
    fn fill(&mut self) -> Result<usize, Error> {
        loop {
            match self.source.read(&mut self.buffer[self.leftover..]) {
                Ok(read) => return Ok(read),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Splits `name;value` and records it. Empty lines are skipped.
#[inline]
fn record_line(line: &[u8], table: &mut AggregateTable) -> Result<(), Error> {
    if line.is_empty() {
        return Ok(());
    }
    let Some(separator) = memchr(b';', line) else {
        return Err(Error::malformed(line));
    };
    let (name, value) = (&line[..separator], &line[separator + 1..]);
    let Some(value) = parse_temperature(value) else {
        return Err(Error::malformed(line));
    };
    table.record(name, value)
}

#[cfg(test)]
mod test {
    use std::io::Read;

    use super::LineScanner;
    use crate::chunks::LineEnding;
    use crate::error::Error;
    use crate::stats::AggregateTable;

    /// Hands out at most `step` bytes per read
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn scan(input: &str, line_ending: LineEnding, buffer_size: usize) -> AggregateTable {
        LineScanner::new(input.as_bytes(), line_ending, buffer_size)
            .scan(AggregateTable::new())
            .unwrap()
    }

    fn summary(table: &AggregateTable, name: &str) -> (i16, i16, i64, u32) {
        let stat = table.get(name).unwrap_or_else(|| panic!("`{name}` missing"));
        (stat.min(), stat.max(), stat.sum(), stat.count())
    }

    #[test]
    fn scans_lines_into_table() {
        let table = scan("A;10.0\nB;-3.5\nA;20.0\n", LineEnding::Lf, 1024);
        assert_eq!(2, table.len());
        assert_eq!((100, 200, 300, 2), summary(&table, "A"));
        assert_eq!((-35, -35, -35, 1), summary(&table, "B"));
    }

    #[test]
    fn crlf_matches_lf() {
        let lf = "Oslo;-1.5\nSt. John's;12.0\nOslo;3.0\nAbha;0.0\n";
        let crlf = lf.replace('\n', "\r\n");
        let lf_table = scan(lf, LineEnding::Lf, 1024);
        let crlf_table = scan(&crlf, LineEnding::CrLf, 1024);
        for name in ["Oslo", "St. John's", "Abha"] {
            assert_eq!(summary(&lf_table, name), summary(&crlf_table, name));
        }
        assert_eq!(lf_table.len(), crlf_table.len());
    }

    #[test]
    fn lines_split_across_reads() {
        let input = "Hamburg;12.0\nBulawayo;8.9\nPalembang;38.8\nHamburg;-4.2\n";
        for step in 1..=7 {
            for buffer_size in [4, 16, 64] {
                let source = Trickle {
                    data: input.as_bytes(),
                    step,
                };
                let table = LineScanner::new(source, LineEnding::Lf, buffer_size)
                    .scan(AggregateTable::new())
                    .unwrap();
                assert_eq!((-42, 120, 78, 2), summary(&table, "Hamburg"), "step {step}");
                assert_eq!((89, 89, 89, 1), summary(&table, "Bulawayo"));
                assert_eq!((388, 388, 388, 1), summary(&table, "Palembang"));
            }
        }
    }

    #[test]
    fn buffer_grows_for_long_lines() {
        let name = "x".repeat(100);
        let input = format!("{name};1.0\n{name};2.0\n");
        let mut scanner = LineScanner::new(input.as_bytes(), LineEnding::Lf, 8);
        let mut table = AggregateTable::new();
        scanner.scan_into(&mut table).unwrap();
        assert_eq!(128, scanner.buffer_size());
        assert_eq!((10, 20, 30, 2), summary(&table, &name));
    }

    #[test]
    fn unterminated_last_line_is_recorded() {
        for (input, line_ending) in [
            ("A;1.0\nA;2.0", LineEnding::Lf),
            ("A;1.0\r\nA;2.0", LineEnding::CrLf),
            ("A;1.0\r\nA;2.0\r", LineEnding::CrLf),
        ] {
            let table = scan(input, line_ending, 4);
            assert_eq!((10, 20, 30, 2), summary(&table, "A"), "input: {input:?}");
        }
    }

    #[test]
    fn empty_lines_are_skipped() {
        let table = scan("\nA;1.0\n\n\nA;2.0\n\n", LineEnding::Lf, 1024);
        assert_eq!((10, 20, 30, 2), summary(&table, "A"));
    }

    #[test]
    fn malformed_lines_fail() {
        for input in ["A;1.0\nB 2.0\n", "A;1.0\nB;2\n", "A;1.0\nB;2.25\n", "A;x.0\n"] {
            let result = LineScanner::new(input.as_bytes(), LineEnding::Lf, 1024)
                .scan(AggregateTable::new());
            assert!(
                matches!(result, Err(Error::MalformedLine { .. })),
                "input: {input:?}"
            );
        }
    }
}
