//! Rate source abstraction

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Rates keyed by `"<FROM>_<TO>"`, as returned by a single source.
pub type FetchedRates = HashMap<String, f64>;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Name recorded as the `source` of every rate this provider supplies.
    fn name(&self) -> &str;

    async fn fetch_rates(&self) -> Result<FetchedRates>;
}
