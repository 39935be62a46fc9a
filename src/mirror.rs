//! Ordered key/value mirror of expected store state.
//!
//! Backed by `BTreeMap`, which gives the O(log n) point and neighbor
//! queries and sorted iteration the generators and oracles rely on. All
//! ranges are `[lo, hi)`: the lower bound is inclusive, the upper bound
//! exclusive. `higher`/`lower` are strict: `higher(k)` never returns `k`
//! itself even when present.

use std::collections::BTreeMap;
use std::ops::Bound;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct StateMirror {
    data: BTreeMap<String, String>,
}

impl StateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.data.get(key)
    }

    pub fn delete(&mut self, key: &str) -> Option<String> {
        self.data.remove(key)
    }

    /// Greatest key <= `key`.
    pub fn floor(&self, key: &str) -> Option<Entry> {
        self.data
            .range::<str, _>((Bound::Unbounded, Bound::Included(key)))
            .next_back()
            .map(Entry::from)
    }

    /// Least key >= `key`.
    pub fn ceiling(&self, key: &str) -> Option<Entry> {
        self.data
            .range::<str, _>((Bound::Included(key), Bound::Unbounded))
            .next()
            .map(Entry::from)
    }

    /// Least key strictly greater than `key`.
    pub fn higher(&self, key: &str) -> Option<Entry> {
        self.data
            .range::<str, _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(Entry::from)
    }

    /// Greatest key strictly less than `key`.
    pub fn lower(&self, key: &str) -> Option<Entry> {
        self.data
            .range::<str, _>((Bound::Unbounded, Bound::Excluded(key)))
            .next_back()
            .map(Entry::from)
    }

    /// Keys in `[lo, hi)`, ascending.
    pub fn list(&self, lo: &str, hi: &str) -> Vec<String> {
        self.data
            .range::<str, _>((Bound::Included(lo), Bound::Excluded(hi)))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Entries in `[lo, hi)`, ascending.
    pub fn range_scan(&self, lo: &str, hi: &str) -> Vec<Entry> {
        self.data
            .range::<str, _>((Bound::Included(lo), Bound::Excluded(hi)))
            .map(Entry::from)
            .collect()
    }

    /// Removes every entry in `[lo, hi)`. Leaves none behind: the
    /// collected keys are taken from the same bounds used to iterate,
    /// so there is no truncation inconsistency between the scan and the
    /// removal.
    pub fn delete_range(&mut self, lo: &str, hi: &str) {
        let keys: Vec<String> = self.list(lo, hi);
        for key in keys {
            self.data.remove(&key);
        }
    }
}

impl From<(&String, &String)> for Entry {
    fn from((key, value): (&String, &String)) -> Self {
        Entry {
            key: key.clone(),
            value: value.clone(),
        }
    }
}
