//! Primary key ordering
//!
//! Keys are strings, but numeric-looking keys (an optional leading `-`
//! followed by ASCII digits) compare as integers of unbounded width and
//! sort before every non-numeric key. Non-numeric keys compare bytewise.

use num_bigint::BigInt;
use num_traits::Num;
use std::cmp::Ordering;
use std::fmt;

/// A primary key with its precomputed sort position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    raw: String,
    numeric: Option<BigInt>,
}

impl RecordKey {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let numeric = numeric_value(&raw);
        Self { raw, numeric }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric.is_some()
    }
}

impl Ord for RecordKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.numeric, &other.numeric) {
            // Spelling breaks ties so that "007" and "7" stay distinct.
            (Some(a), Some(b)) => a.cmp(b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for RecordKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compare two raw keys in numeric-aware order
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    RecordKey::new(a).cmp(&RecordKey::new(b))
}

fn numeric_value(key: &str) -> Option<BigInt> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigInt::from_str_radix(key, 10).ok()
}
