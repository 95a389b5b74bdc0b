//! Refreshes the rates cache from every configured provider.

use crate::core::error::LedgerError;
use crate::core::provider::RateProvider;
use crate::core::rates::{PairRecord, PairTable, RateHistoryEntry, RatesSnapshot};
use crate::store::{HISTORY_FILE, JsonStore, RATES_FILE};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, instrument, warn};

/// Outcome of a refresh. Provider failures are reported, not raised,
/// as long as at least one rate came back.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    pub total_rates: usize,
    pub last_refresh: DateTime<Utc>,
    pub errors: Vec<String>,
}

pub struct RatesUpdater {
    providers: Vec<Box<dyn RateProvider>>,
    store: JsonStore,
}

impl RatesUpdater {
    pub fn new(providers: Vec<Box<dyn RateProvider>>, store: JsonStore) -> Self {
        Self { providers, store }
    }

    #[instrument(name = "RatesUpdate", skip(self))]
    pub async fn run_update(&self) -> Result<UpdateReport> {
        info!("Starting rates update from {} provider(s)", self.providers.len());
        let now = Utc::now();

        let fetches = self.providers.iter().map(|provider| async move {
            (provider.name(), provider.fetch_rates().await)
        });
        let results = join_all(fetches).await;

        let mut pairs = PairTable::new();
        let mut errors = Vec::new();
        for (name, result) in results {
            match result {
                Ok(rates) => {
                    info!("{name}: fetched {} rate(s)", rates.len());
                    for (key, rate) in rates {
                        pairs.insert_key(key, PairRecord::new(rate, now, name));
                    }
                }
                Err(e) => {
                    // Provider errors already carry the provider name.
                    let reason = match e.downcast_ref::<LedgerError>() {
                        Some(LedgerError::ApiRequest(reason)) => reason.clone(),
                        _ => format!("{name}: {e:#}"),
                    };
                    warn!("Rates provider failed: {reason}");
                    errors.push(reason);
                }
            }
        }

        if pairs.is_empty() {
            return Err(LedgerError::ApiRequest("no rates could be fetched".to_string()).into());
        }

        let snapshot = RatesSnapshot {
            pairs,
            last_refresh: Some(now),
        };
        self.store
            .write(RATES_FILE, &snapshot)
            .context("Failed to save rates cache")?;
        self.append_history(&snapshot.pairs, now)?;

        info!("Rates update finished: {} rate(s)", snapshot.pairs.len());
        Ok(UpdateReport {
            total_rates: snapshot.pairs.len(),
            last_refresh: now,
            errors,
        })
    }

    fn append_history(&self, pairs: &PairTable, now: DateTime<Utc>) -> Result<()> {
        let mut history: Vec<RateHistoryEntry> = self.store.read(HISTORY_FILE)?;
        let mut fresh: Vec<_> = pairs
            .iter()
            .filter_map(|(key, record)| RateHistoryEntry::from_pair_key(key, record, now))
            .collect();
        fresh.sort_by(|a, b| a.id.cmp(&b.id));
        history.extend(fresh);
        self.store
            .write(HISTORY_FILE, &history)
            .context("Failed to save rate history")
    }
}
