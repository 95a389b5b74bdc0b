use super::util::{HttpSettings, with_retry};
use crate::core::config::CoinGeckoProviderConfig;
use crate::core::error::LedgerError;
use crate::core::provider::{FetchedRates, RateProvider};
use crate::core::rates::{PIVOT_CURRENCY, pair_key};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// `{"bitcoin": {"usd": 59337.21}, ...}`
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

/// Crypto prices in USD from CoinGecko's `simple/price` endpoint.
pub struct CoinGeckoProvider {
    base_url: String,
    /// Currency code to coin id.
    ids: BTreeMap<String, String>,
    http: HttpSettings,
}

impl CoinGeckoProvider {
    pub fn new(config: &CoinGeckoProviderConfig, http: HttpSettings) -> Self {
        CoinGeckoProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ids: config.ids.clone(),
            http,
        }
    }

    async fn fetch(&self) -> Result<FetchedRates> {
        let ids = self.ids.values().cloned().collect::<Vec<_>>().join(",");
        let vs_currency = PIVOT_CURRENCY.to_lowercase();
        let url = format!(
            "{}/simple/price?ids={ids}&vs_currencies={vs_currency}",
            self.base_url
        );
        debug!("Requesting crypto prices from {url}");

        let client = self.http.client()?;
        let response = with_retry(
            || async { client.get(&url).send().await?.error_for_status() },
            self.http.retry,
        )
        .await?;

        let text = response.text().await.context("Failed to read response")?;
        let data: SimplePriceResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse response: '{text}'"))?;

        let rates = self
            .ids
            .iter()
            .filter_map(|(code, coin_id)| {
                let price = data.get(coin_id)?.get(&vs_currency).copied()?;
                (price != 0.0).then(|| (pair_key(code, PIVOT_CURRENCY), price))
            })
            .collect();
        Ok(rates)
    }
}

#[async_trait]
impl RateProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    #[instrument(name = "CoinGeckoFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<FetchedRates> {
        self.fetch()
            .await
            .map_err(|e| LedgerError::ApiRequest(format!("{}: {e:#}", self.name())).into())
    }
}
