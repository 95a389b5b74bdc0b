//! Typed failures raised by the ledger use cases.
//!
//! These travel inside `anyhow::Error`, so callers that care about the kind
//! can `downcast_ref::<LedgerError>()` while everything else just propagates.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient funds: available {available:.4} {code}, required {required:.4} {code}")]
    InsufficientFunds {
        available: f64,
        required: f64,
        code: String,
    },

    #[error("Unknown currency '{0}'")]
    CurrencyNotFound(String),

    #[error("Invalid currency code '{0}': expected 2-5 uppercase characters")]
    InvalidCurrencyCode(String),

    #[error("External API request failed: {0}")]
    ApiRequest(String),

    #[error("'amount' must be a positive number, got {0}")]
    InvalidAmount(f64),

    #[error("Balance cannot be negative")]
    NegativeBalance,

    #[error("Currency {0} is already in the portfolio")]
    DuplicateWallet(String),

    #[error("You have no '{0}' wallet. Wallets are created on the first purchase")]
    NoWallet(String),

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("Password must be at least {0} characters long")]
    PasswordTooShort(usize),

    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Not logged in. Run 'login' first")]
    NotLoggedIn,

    #[error("Rate {from}->{to} is unavailable. Run 'update-rates' and try again")]
    RateUnavailable { from: String, to: String },

    #[error("Rate data is stale (updated: {0}). Run 'update-rates'")]
    StaleRate(String),
}
