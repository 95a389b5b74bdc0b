//! Cached exchange rates and the pair resolution rules built on top of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Currency every provider quotes against. Used as the single pivot hop.
pub const PIVOT_CURRENCY: &str = "USD";

/// Builds the `"<FROM>_<TO>"` key used in the persisted pair table.
pub fn pair_key(from: &str, to: &str) -> String {
    format!("{from}_{to}")
}

/// A single cached quote for a directed pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: String,
}

impl PairRecord {
    pub fn new(rate: f64, updated_at: DateTime<Utc>, source: &str) -> Self {
        Self {
            rate,
            updated_at: Some(updated_at),
            source: source.to_string(),
        }
    }

    /// A zero rate never counts as a match.
    fn usable_rate(&self) -> Option<f64> {
        (self.rate != 0.0).then_some(self.rate)
    }
}

/// Sparse, directed table of known pairs keyed by `"<FROM>_<TO>"`.
///
/// The table is not symmetric: holding `EUR_USD` says nothing about whether
/// `USD_EUR` is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairTable(HashMap<String, PairRecord>);

impl PairTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, from: &str, to: &str) -> Option<&PairRecord> {
        self.0.get(&pair_key(from, to))
    }

    pub fn insert(&mut self, from: &str, to: &str, record: PairRecord) {
        self.0.insert(pair_key(from, to), record);
    }

    pub fn insert_key(&mut self, key: String, record: PairRecord) {
        self.0.insert(key, record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PairRecord)> {
        self.0.iter()
    }

    fn direct(&self, from: &str, to: &str) -> Option<f64> {
        self.get(from, to).and_then(PairRecord::usable_rate)
    }

    fn reverse(&self, from: &str, to: &str) -> Option<f64> {
        self.get(to, from)
            .and_then(PairRecord::usable_rate)
            .map(|rate| 1.0 / rate)
    }
}

impl FromIterator<(String, PairRecord)> for PairTable {
    fn from_iter<I: IntoIterator<Item = (String, PairRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The persisted shape of the rates cache (`rates.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatesSnapshot {
    #[serde(default)]
    pub pairs: PairTable,
    #[serde(default)]
    pub last_refresh: Option<DateTime<Utc>>,
}

/// One row of the append-only rate history (`exchange_rates.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateHistoryEntry {
    pub id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl RateHistoryEntry {
    /// Builds an entry from a `"<FROM>_<TO>"` key; `None` if the key is malformed.
    pub fn from_pair_key(key: &str, record: &PairRecord, timestamp: DateTime<Utc>) -> Option<Self> {
        let (from, to) = key.split_once('_')?;
        if from.is_empty() || to.is_empty() {
            return None;
        }
        Some(Self {
            id: format!("{key}_{}", timestamp.to_rfc3339()),
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            rate: record.rate,
            timestamp,
            source: record.source.clone(),
        })
    }
}

/// Resolves the effective rate for `from -> to`.
///
/// Lookup order is identity, direct entry, inverted reverse entry, then a
/// single hop through [`PIVOT_CURRENCY`]. Anything that cannot be resolved
/// yields `0.0` rather than an error, so a missing pair can never abort a
/// portfolio total. Chains needing more than one pivot hop are not followed.
pub fn resolve(table: &PairTable, from: &str, to: &str) -> f64 {
    if from == to {
        return 1.0;
    }

    if let Some(rate) = lookup(table, from, to) {
        return rate;
    }

    if from != PIVOT_CURRENCY && to != PIVOT_CURRENCY {
        // Both legs touch the pivot, so they stop at `lookup` and never recurse.
        let to_pivot = resolve(table, from, PIVOT_CURRENCY);
        let from_pivot = resolve(table, PIVOT_CURRENCY, to);
        return if to_pivot != 0.0 && from_pivot != 0.0 {
            to_pivot * from_pivot
        } else {
            0.0
        };
    }

    0.0
}

fn lookup(table: &PairTable, from: &str, to: &str) -> Option<f64> {
    table
        .direct(from, to)
        .or_else(|| table.reverse(from, to))
}
