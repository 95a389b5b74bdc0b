//! Prices a set of wallets in a single base currency.
use crate::core::models::Wallet;
use crate::core::rates::{PairTable, resolve};
use std::collections::BTreeMap;
use tracing::debug;

/// One wallet's contribution to a [`Valuation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationRow {
    pub code: String,
    pub balance: f64,
    pub value: f64,
}

/// Total value of a wallet set plus the itemized breakdown.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Valuation {
    pub base_currency: String,
    pub total: f64,
    pub rows: Vec<ValuationRow>,
}

/// Values every wallet in `base_currency` using [`resolve`].
///
/// Rows follow the map's iteration order, i.e. ascending currency code.
/// Unknown or unresolvable currencies contribute `0.0` instead of failing.
pub fn valuate(
    pairs: &PairTable,
    wallets: &BTreeMap<String, Wallet>,
    base_currency: &str,
) -> Valuation {
    let mut valuation = Valuation {
        base_currency: base_currency.to_string(),
        total: 0.0,
        rows: Vec::with_capacity(wallets.len()),
    };

    for (code, wallet) in wallets {
        let balance = wallet.balance();
        let rate = resolve(pairs, code, base_currency);
        if rate == 0.0 {
            debug!("No rate for {code} -> {base_currency}, valuing at zero");
        }
        let value = balance * rate;
        valuation.total += value;
        valuation.rows.push(ValuationRow {
            code: code.clone(),
            balance,
            value,
        });
    }

    valuation
}
