//! Supported currencies and code validation.

use crate::core::error::LedgerError;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurrencyKind {
    Fiat {
        issuing_country: &'static str,
    },
    Crypto {
        algorithm: &'static str,
        market_cap: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Currency {
    pub name: &'static str,
    pub code: &'static str,
    pub kind: CurrencyKind,
}

impl Currency {
    const fn fiat(name: &'static str, code: &'static str, issuing_country: &'static str) -> Self {
        Self {
            name,
            code,
            kind: CurrencyKind::Fiat { issuing_country },
        }
    }

    const fn crypto(
        name: &'static str,
        code: &'static str,
        algorithm: &'static str,
        market_cap: f64,
    ) -> Self {
        Self {
            name,
            code,
            kind: CurrencyKind::Crypto {
                algorithm,
                market_cap,
            },
        }
    }

    pub fn is_crypto(&self) -> bool {
        matches!(self.kind, CurrencyKind::Crypto { .. })
    }

    /// One-line description used by the `currencies` listing.
    pub fn display_info(&self) -> String {
        match self.kind {
            CurrencyKind::Fiat { issuing_country } => format!(
                "[FIAT] {} — {} (Issuing: {issuing_country})",
                self.code, self.name
            ),
            CurrencyKind::Crypto {
                algorithm,
                market_cap,
            } => format!(
                "[CRYPTO] {} — {} (Algo: {algorithm}, MCAP: {market_cap:.2e})",
                self.code, self.name
            ),
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_info())
    }
}

const REGISTRY: &[Currency] = &[
    Currency::fiat("US Dollar", "USD", "United States"),
    Currency::fiat("Euro", "EUR", "Eurozone"),
    Currency::fiat("British Pound", "GBP", "United Kingdom"),
    Currency::fiat("Russian Ruble", "RUB", "Russia"),
    Currency::crypto("Bitcoin", "BTC", "SHA-256", 1.12e12),
    Currency::crypto("Ethereum", "ETH", "Ethash", 4.5e11),
    Currency::crypto("Solana", "SOL", "Proof of History", 3.2e10),
];

pub fn all() -> &'static [Currency] {
    REGISTRY
}

/// Looks a currency up by code, ignoring case.
pub fn get_currency(code: &str) -> Result<&'static Currency, LedgerError> {
    let code = code.trim().to_uppercase();
    REGISTRY
        .iter()
        .find(|c| c.code == code)
        .ok_or(LedgerError::CurrencyNotFound(code))
}

/// Checks the shape of a code: 2-5 uppercase ASCII letters or digits.
pub fn validate_code(code: &str) -> Result<(), LedgerError> {
    let len_ok = (2..=5).contains(&code.len());
    let chars_ok = code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && code.chars().any(|c| c.is_ascii_uppercase());
    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(LedgerError::InvalidCurrencyCode(code.to_string()))
    }
}
