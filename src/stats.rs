use std::collections::hash_map::Entry;

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::Error;
use crate::parse::hash_key;

/// Running min, max, sum and count of one key, all in tenths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stat {
    name: String,
    hash: i32,
    min: i16,
    max: i16,
    sum: i64,
    count: u32,
}

impl Stat {
    pub fn new(name: String, hash: i32, value: i16) -> Self {
        Self {
            name,
            hash,
            min: value,
            max: value,
            sum: value as i64,
            count: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> i32 {
        self.hash
    }

    pub fn min(&self) -> i16 {
        self.min
    }

    pub fn max(&self) -> i16 {
        self.max
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Mean in tenths, rounded half away from zero
    pub fn mean(&self) -> i64 {
        (self.sum as f64 / self.count as f64).round() as i64
    }

    #[inline]
    pub fn apply(&mut self, value: i16) {
        self.count += 1;
        self.sum += value as i64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Folds in the aggregate of the same key from another table.
    /// Not idempotent: merging the same `other` twice counts its rows twice.
    pub fn merge(&mut self, other: &Stat) {
        debug_assert_eq!(self.name, other.name, "merging stats of different keys");
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Per-key aggregates, placed by [`hash_key`].
///
/// A hit on the hash is confirmed against the stored name, so two keys sharing a hash are
/// still reported separately. The second such key lives in `collisions`, which is searched
/// linearly and is expected to stay tiny.
#[derive(Debug, Default)]
pub struct AggregateTable {
    by_hash: FxHashMap<i32, Stat>,
    collisions: Vec<Stat>,
}

impl AggregateTable {
    pub fn new() -> Self {
        let mut by_hash = FxHashMap::default();
        by_hash.reserve(10_000);
        Self {
            by_hash,
            collisions: Vec::new(),
        }
    }

    /// Records one measurement of `key`.
    /// Errs only when `key` is seen for the first time and isn't UTF-8.
    #[inline]
    pub fn record(&mut self, key: &[u8], value: i16) -> Result<(), Error> {
        let hash = hash_key(key);
        match self.by_hash.entry(hash) {
            Entry::Occupied(mut e) => {
                let stat = e.get_mut();
                if stat.name.as_bytes() == key {
                    stat.apply(value);
                } else if let Some(stat) = self
                    .collisions
                    .iter_mut()
                    .find(|s| s.name.as_bytes() == key)
                {
                    stat.apply(value);
                } else {
                    self.collisions
                        .push(Stat::new(decode_key(key)?, hash, value));
                }
            }
            Entry::Vacant(e) => {
                e.insert(Stat::new(decode_key(key)?, hash, value));
            }
        }
        Ok(())
    }

    /// Merges one finished aggregate into this table.
    pub fn absorb(&mut self, stat: Stat) {
        match self.by_hash.entry(stat.hash) {
            Entry::Occupied(mut e) if e.get().name == stat.name => e.get_mut().merge(&stat),
            Entry::Occupied(_) => {
                match self.collisions.iter_mut().find(|s| s.name == stat.name) {
                    Some(existing) => existing.merge(&stat),
                    None => self.collisions.push(stat),
                }
            }
            Entry::Vacant(e) => {
                e.insert(stat);
            }
        }
    }

    /// Merges every aggregate of `other` into this table.
    pub fn absorb_table(&mut self, other: AggregateTable) {
        for stat in other.into_stats() {
            self.absorb(stat);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Stat> {
        match self.by_hash.get(&hash_key(name.as_bytes())) {
            Some(stat) if stat.name == name => Some(stat),
            Some(_) => self.collisions.iter().find(|s| s.name == name),
            None => None,
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.by_hash.len() + self.collisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Unordered aggregates, one per distinct key
    pub fn into_stats(self) -> impl Iterator<Item = Stat> {
        self.by_hash.into_values().chain(self.collisions)
    }
}

fn decode_key(key: &[u8]) -> Result<String, Error> {
    match std::str::from_utf8(key) {
        Ok(name) => Ok(name.to_owned()),
        Err(_) => Err(Error::InvalidKey {
            key: String::from_utf8_lossy(key).into_owned(),
        }),
    }
}

/// Folds the per-worker tables into one, taking each exactly once.
/// Runs only after every worker has finished.
pub fn merge_tables(tables: impl IntoIterator<Item = AggregateTable>) -> AggregateTable {
    let mut tables = tables.into_iter();
    let Some(mut merged) = tables.next() else {
        return AggregateTable::new();
    };
    let mut merged_count = 1;
    for table in tables {
        merged.absorb_table(table);
        merged_count += 1;
    }
    debug!(
        "merged {merged_count} tables into {} distinct keys",
        merged.len()
    );
    merged
}
