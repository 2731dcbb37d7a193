use std::fmt;
use std::io::{self, Write};

use crate::parse::Tenths;
use crate::stats::{AggregateTable, Stat};

/// `name = min/mean/max`, each with one fractional digit
impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {}/{}/{}",
            self.name(),
            Tenths(self.min() as i64),
            Tenths(self.mean()),
            Tenths(self.max() as i64)
        )
    }
}

/// Final aggregates ordered by the bytes of their names
pub fn sorted_stats(table: AggregateTable) -> Vec<Stat> {
    let mut stats: Vec<Stat> = table.into_stats().collect();
    stats.sort_unstable_by(|a, b| a.name().as_bytes().cmp(b.name().as_bytes()));
    stats
}

/// Writes one newline-terminated line per key, sorted by name
pub fn write_report(table: AggregateTable, out: &mut impl Write) -> io::Result<()> {
    for stat in sorted_stats(table) {
        writeln!(out, "{stat}")?;
    }
    Ok(())
}
