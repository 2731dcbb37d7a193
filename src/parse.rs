//! Byte-level helpers for the hot loop: key hashing and fixed-point measurements.
//!
//! Measurements are carried as tenths of a unit in integers from the moment they are
//! parsed until the report is written.

use std::fmt;

const LENGTH_MULTIPLIER: i32 = 820_243;

/// Cheap, non-cryptographic hash of a key, used to place it in an [`AggregateTable`].
///
/// Not collision free. Keys of length 2 and 3 sharing their first two bytes always
/// collide, as do longer keys of equal length sharing their first four bytes.
///
/// [`AggregateTable`]: crate::stats::AggregateTable
#[inline]
pub fn hash_key(key: &[u8]) -> i32 {
    match key {
        [] => 0,
        [only] => *only as i32,
        [a, b] | [a, b, _] => u16::from_le_bytes([*a, *b]) as i32,
        [a, b, c, d, ..] => {
            (key.len() as i32).wrapping_mul(LENGTH_MULTIPLIER) ^ i32::from_le_bytes([*a, *b, *c, *d])
        }
    }
}

/// Parses `-?\d+\.\d` into tenths, e.g. `"-5.2"` becomes `-52`.
/// Returns `None` for anything else, or if the value doesn't fit in an `i16`.
#[inline]
pub fn parse_temperature(input: &[u8]) -> Option<i16> {
    let (negative, digits) = match input.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, input),
    };
    let [whole @ .., b'.', fraction] = digits else {
        return None;
    };
    if whole.is_empty() || !fraction.is_ascii_digit() {
        return None;
    }

    let mut value: i32 = 0;
    for b in whole {
        let digit = b.wrapping_sub(b'0');
        if digit >= 10 || value > i16::MAX as i32 / 10 {
            return None;
        }
        value = value * 10 + digit as i32;
    }
    value = value * 10 + (fraction - b'0') as i32;

    i16::try_from(if negative { -value } else { value }).ok()
}

/// Displays a tenths value with exactly one fractional digit: `Tenths(-52)` is `-5.2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tenths(pub i64);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", abs / 10, abs % 10)
    }
}
