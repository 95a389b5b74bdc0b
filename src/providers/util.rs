use crate::core::config::{AppConfig, RetryConfig};
use anyhow::{Context, Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("valuta/", env!("CARGO_PKG_VERSION"));

/// Timeout and retry policy shared by every rate provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl HttpSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_secs),
            retry: config.retry,
        }
    }

    pub fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Retries an async operation according to `policy`.
///
/// Runs the operation once, then up to `policy.retries` more times with
/// `policy.delay_ms` between attempts. Returns the last error if every
/// attempt fails.
pub async fn with_retry<F, Fut, T, E>(mut operation: F, policy: RetryConfig) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Error>,
{
    let mut attempt = 0;
    loop {
        match operation().await.map_err(Into::into) {
            Ok(val) => return Ok(val),
            Err(err) if attempt >= policy.retries => return Err(err),
            Err(err) => {
                attempt += 1;
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt,
                    policy.retries + 1,
                    err
                );
                tokio::time::sleep(Duration::from_millis(policy.delay_ms)).await;
            }
        }
    }
}
