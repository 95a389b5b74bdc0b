use super::util::{HttpSettings, with_retry};
use crate::core::config::ExchangeRateProviderConfig;
use crate::core::error::LedgerError;
use crate::core::provider::{FetchedRates, RateProvider};
use crate::core::rates::{PIVOT_CURRENCY, pair_key};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    /// Units of each currency per one USD.
    #[serde(default, alias = "rates")]
    conversion_rates: HashMap<String, f64>,
}

/// Fiat rates from ExchangeRate-API, quoted as `<CODE>_USD`.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: Option<String>,
    currencies: Vec<String>,
    http: HttpSettings,
}

impl ExchangeRateApiProvider {
    pub fn new(
        config: &ExchangeRateProviderConfig,
        currencies: &[String],
        http: HttpSettings,
    ) -> Self {
        ExchangeRateApiProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            currencies: currencies.iter().map(|c| c.to_uppercase()).collect(),
            http,
        }
    }

    async fn fetch(&self, api_key: &str) -> Result<FetchedRates> {
        let url = format!("{}/{}/latest/{}", self.base_url, api_key, PIVOT_CURRENCY);
        debug!(
            "Requesting fiat rates from {}/***/latest/{}",
            self.base_url, PIVOT_CURRENCY
        );

        let client = self.http.client()?;
        let response = with_retry(
            || async { client.get(&url).send().await?.error_for_status() },
            self.http.retry,
        )
        .await?;

        let text = response.text().await.context("Failed to read response")?;
        let data: LatestResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse response: '{text}'"))?;

        if data.result != "success" {
            return Err(anyhow!(
                data.error_type.unwrap_or_else(|| "Unknown error".to_string())
            ));
        }

        let mut rates = FetchedRates::new();
        for code in &self.currencies {
            match data.conversion_rates.get(code) {
                // 1 USD = x CODE, so 1 CODE = 1/x USD.
                Some(&per_usd) if per_usd != 0.0 => {
                    rates.insert(pair_key(code, PIVOT_CURRENCY), 1.0 / per_usd);
                }
                Some(_) => warn!("Zero rate for {code}, skipping"),
                None => debug!("{code} missing from response"),
            }
        }
        Ok(rates)
    }
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    fn name(&self) -> &str {
        "ExchangeRate-API"
    }

    #[instrument(name = "ExchangeRateFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<FetchedRates> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            LedgerError::ApiRequest(format!("{}: missing API key", self.name()))
        })?;

        // Request errors echo the URL, which carries the key.
        self.fetch(api_key).await.map_err(|e| {
            let reason = format!("{e:#}").replace(api_key, "***");
            LedgerError::ApiRequest(format!("{}: {reason}", self.name())).into()
        })
    }
}
