//! Domain model, rate resolution and the use cases built on them

pub mod config;
pub mod currency;
pub mod error;
pub mod ledger;
pub mod log;
pub mod models;
pub mod provider;
pub mod rates;
pub mod updater;
pub mod valuation;

// Re-export main types for cleaner imports
pub use error::LedgerError;
pub use ledger::Ledger;
pub use provider::RateProvider;
pub use rates::{PairTable, resolve};
pub use valuation::{Valuation, valuate};
