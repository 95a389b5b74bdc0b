pub mod coingecko;
pub mod exchangerate;
pub mod util;

use crate::core::config::AppConfig;
use crate::core::provider::RateProvider;
use coingecko::CoinGeckoProvider;
use exchangerate::ExchangeRateApiProvider;
use util::HttpSettings;

/// Builds every provider enabled in `config`, in refresh order.
pub fn build_providers(config: &AppConfig) -> Vec<Box<dyn RateProvider>> {
    let http = HttpSettings::from_config(config);
    let mut providers: Vec<Box<dyn RateProvider>> = Vec::new();

    if let Some(coingecko) = &config.providers.coingecko {
        providers.push(Box::new(CoinGeckoProvider::new(coingecko, http)));
    }
    if let Some(exchangerate) = &config.providers.exchangerate {
        providers.push(Box::new(ExchangeRateApiProvider::new(
            exchangerate,
            &config.fiat_currencies,
            http,
        )));
    }

    providers
}
