pub mod account;
pub mod portfolio;
pub mod rates;
pub mod setup;
pub mod shell;
pub mod trade;
pub mod ui;
