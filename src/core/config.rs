use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_EXCHANGERATE_URL: &str = "https://v6.exchangerate-api.com/v6";

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_rates_ttl_seconds() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_fiat_currencies() -> Vec<String> {
    ["EUR", "GBP", "RUB"].iter().map(|c| c.to_string()).collect()
}

fn default_crypto_ids() -> BTreeMap<String, String> {
    [("BTC", "bitcoin"), ("ETH", "ethereum"), ("SOL", "solana")]
        .iter()
        .map(|(code, id)| (code.to_string(), id.to_string()))
        .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
    /// Currency code to CoinGecko coin id.
    #[serde(default = "default_crypto_ids")]
    pub ids: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub coingecko: Option<CoinGeckoProviderConfig>,
    pub exchangerate: Option<ExchangeRateProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: Some(CoinGeckoProviderConfig {
                base_url: DEFAULT_COINGECKO_URL.to_string(),
                ids: default_crypto_ids(),
            }),
            exchangerate: Some(ExchangeRateProviderConfig {
                base_url: DEFAULT_EXCHANGERATE_URL.to_string(),
                api_key: None,
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub retries: usize,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            retries: 2,
            delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub data_path: Option<String>,
    /// Buy/sell audit log; defaults to `<data dir>/logs/actions.log`.
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_rates_ttl_seconds")]
    pub rates_ttl_seconds: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_fiat_currencies")]
    pub fiat_currencies: Vec<String>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_path: None,
            log_file: None,
            base_currency: default_base_currency(),
            rates_ttl_seconds: default_rates_ttl_seconds(),
            request_timeout_secs: default_request_timeout_secs(),
            fiat_currencies: default_fiat_currencies(),
            retry: RetryConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "valuta", "valuta").context("Could not determine project directories")
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file exists yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    pub fn actions_log_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.log_file {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(self.data_dir()?.join("logs").join("actions.log"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `VALUTA_*` and `EXCHANGERATE_API_KEY` overrides from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("VALUTA_DATA_DIR") {
            self.data_path = Some(dir);
        }
        if let Some(base) = lookup("VALUTA_BASE_CURRENCY") {
            self.base_currency = base.to_uppercase();
        }
        match lookup("VALUTA_RATES_TTL_SECONDS").map(|v| v.parse::<u64>()) {
            Some(Ok(ttl)) => self.rates_ttl_seconds = ttl,
            Some(Err(e)) => debug!("Ignoring invalid VALUTA_RATES_TTL_SECONDS: {e}"),
            None => {}
        }
        if let (Some(key), Some(provider)) = (
            lookup("EXCHANGERATE_API_KEY"),
            self.providers.exchangerate.as_mut(),
        ) {
            provider.api_key = Some(key);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
data_path: "/tmp/valuta"
base_currency: "EUR"
rates_ttl_seconds: 60
fiat_currencies: [EUR, GBP]
providers:
  coingecko:
    base_url: "http://example.com/coingecko"
    ids:
      BTC: bitcoin
  exchangerate:
    base_url: "http://example.com/exchangerate"
    api_key: "abc123"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.data_path.as_deref(), Some("/tmp/valuta"));
        assert_eq!(config.base_currency, "EUR");
        assert_eq!(config.rates_ttl_seconds, 60);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.fiat_currencies, vec!["EUR", "GBP"]);
        assert_eq!(config.retry, RetryConfig::default());

        let coingecko = config.providers.coingecko.unwrap();
        assert_eq!(coingecko.base_url, "http://example.com/coingecko");
        assert_eq!(coingecko.ids.len(), 1);
        assert_eq!(coingecko.ids.get("BTC").map(String::as_str), Some("bitcoin"));

        let exchangerate = config.providers.exchangerate.unwrap();
        assert_eq!(exchangerate.base_url, "http://example.com/exchangerate");
        assert_eq!(exchangerate.api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.rates_ttl_seconds, 300);
        assert!(config.data_path.is_none());
        assert_eq!(
            config.providers.coingecko.unwrap().ids.get("SOL").map(String::as_str),
            Some("solana")
        );
        assert!(config.providers.exchangerate.unwrap().api_key.is_none());
    }

    #[test]
    fn test_partial_providers_disable_the_rest() {
        let yaml_str = r#"
providers:
  coingecko:
    base_url: "http://localhost:1234"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert!(config.providers.coingecko.is_some());
        assert!(config.providers.exchangerate.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default().with_overrides(|key| match key {
            "VALUTA_DATA_DIR" => Some("/data".to_string()),
            "VALUTA_BASE_CURRENCY" => Some("eur".to_string()),
            "VALUTA_RATES_TTL_SECONDS" => Some("not-a-number".to_string()),
            "EXCHANGERATE_API_KEY" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/data"));
        assert_eq!(
            config.actions_log_path().unwrap(),
            PathBuf::from("/data/logs/actions.log")
        );
        assert_eq!(config.base_currency, "EUR");
        assert_eq!(config.rates_ttl_seconds, 300);
        assert_eq!(
            config.providers.exchangerate.unwrap().api_key.as_deref(),
            Some("secret")
        );
    }

    #[test]
    fn test_custom_log_file() {
        let config: AppConfig = serde_yaml::from_str(r#"log_file: "/var/log/valuta.log""#).unwrap();
        assert_eq!(
            config.actions_log_path().unwrap(),
            PathBuf::from("/var/log/valuta.log")
        );
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = AppConfig::load_from_path("/definitely/not/here/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
