//! Account and trading use cases on top of the JSON store.

use crate::core::config::AppConfig;
use crate::core::currency::get_currency;
use crate::core::error::LedgerError;
use crate::core::log::ACTIONS_TARGET;
use crate::core::models::{Portfolio, User, UserInfo};
use crate::core::rates::{RatesSnapshot, resolve};
use crate::core::valuation::Valuation;
use crate::store::{JsonStore, PORTFOLIOS_FILE, RATES_FILE, SESSION_FILE, USERS_FILE};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{debug, error, info, warn};

/// `source` reported for rates computed from other pairs.
pub const DERIVED_SOURCE: &str = "derived";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub user_id: u64,
    pub username: String,
}

/// The account that is currently logged in, persisted between invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: u64,
    pub username: String,
    pub logged_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TradeAction::Buy => "BUY",
                TradeAction::Sell => "SELL",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeReceipt {
    pub action: TradeAction,
    pub currency: String,
    pub amount: f64,
    pub old_balance: f64,
    pub new_balance: f64,
    /// Rate of `currency` in `base_currency`, `0.0` when unknown.
    pub rate: f64,
    pub base_currency: String,
    pub estimated_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub updated_at: Option<DateTime<Utc>>,
    pub source: String,
}

impl RateQuote {
    pub fn reverse_rate(&self) -> Option<f64> {
        (self.rate != 0.0).then(|| 1.0 / self.rate)
    }
}

fn check_amount(amount: f64) -> Result<(), LedgerError> {
    if amount.is_nan() || amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

/// Converts the configured TTL, saturating values chrono cannot represent.
fn ttl_duration(seconds: u64) -> Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

pub struct Ledger {
    store: JsonStore,
    base_currency: String,
    rates_ttl: Duration,
}

impl Ledger {
    pub fn new(store: JsonStore, config: &AppConfig) -> Self {
        Self {
            store,
            base_currency: config.base_currency.to_uppercase(),
            rates_ttl: ttl_duration(config.rates_ttl_seconds),
        }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn register(&self, username: &str, password: &str) -> Result<RegisteredUser> {
        let mut users: Vec<User> = self.store.read(USERS_FILE)?;
        if users.iter().any(|u| u.username == username) {
            return Err(LedgerError::UsernameTaken(username.to_string()).into());
        }

        let user_id = users.iter().map(|u| u.user_id).max().unwrap_or(0) + 1;
        let user = User::create(user_id, username, password)?;
        users.push(user);
        self.store.write(USERS_FILE, &users)?;

        let mut portfolios: Vec<Portfolio> = self.store.read(PORTFOLIOS_FILE)?;
        portfolios.retain(|p| p.user_id != user_id);
        portfolios.push(Portfolio::new(user_id));
        self.store.write(PORTFOLIOS_FILE, &portfolios)?;

        info!("Registered user {username} (id={user_id})");
        Ok(RegisteredUser {
            user_id,
            username: username.to_string(),
        })
    }

    /// Checks credentials and records the session.
    pub fn login(&self, username: &str, password: &str) -> Result<UserInfo> {
        let users: Vec<User> = self.store.read(USERS_FILE)?;
        let user = users
            .into_iter()
            .find(|u| u.username == username)
            .ok_or_else(|| LedgerError::UserNotFound(username.to_string()))?;

        if !user.verify_password(password) {
            return Err(LedgerError::WrongPassword.into());
        }

        let session = SessionUser {
            user_id: user.user_id,
            username: user.username.clone(),
            logged_in_at: Utc::now(),
        };
        self.store.write(SESSION_FILE, &Some(session))?;
        info!("User {username} logged in");
        Ok(user.info())
    }

    /// Ends the session, returning who was logged in.
    pub fn logout(&self) -> Result<Option<SessionUser>> {
        let session: Option<SessionUser> = self.store.read(SESSION_FILE)?;
        self.store.remove(SESSION_FILE)?;
        Ok(session)
    }

    pub fn current_user(&self) -> Result<SessionUser> {
        let session: Option<SessionUser> = self.store.read(SESSION_FILE)?;
        Ok(session.ok_or(LedgerError::NotLoggedIn)?)
    }

    /// Loads a portfolio; an account without one gets an empty portfolio.
    pub fn load_portfolio(&self, user_id: u64) -> Result<Portfolio> {
        let portfolios: Vec<Portfolio> = self.store.read(PORTFOLIOS_FILE)?;
        Ok(portfolios
            .into_iter()
            .find(|p| p.user_id == user_id)
            .unwrap_or_else(|| Portfolio::new(user_id)))
    }

    pub fn save_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        let mut portfolios: Vec<Portfolio> = self.store.read(PORTFOLIOS_FILE)?;
        match portfolios
            .iter_mut()
            .find(|p| p.user_id == portfolio.user_id)
        {
            Some(existing) => *existing = portfolio.clone(),
            None => portfolios.push(portfolio.clone()),
        }
        self.store.write(PORTFOLIOS_FILE, &portfolios)
    }

    pub fn rates(&self) -> Result<RatesSnapshot> {
        self.store.read(RATES_FILE)
    }

    /// Values the account's wallets in `base_currency`.
    pub fn valuate(&self, user_id: u64, base_currency: &str) -> Result<Valuation> {
        let portfolio = self.load_portfolio(user_id)?;
        let rates = self.rates()?;
        Ok(portfolio.valuate(&rates.pairs, &base_currency.to_uppercase()))
    }

    pub fn buy(&self, user_id: u64, currency_code: &str, amount: f64) -> Result<TradeReceipt> {
        self.audited(TradeAction::Buy, user_id, currency_code, amount, || {
            check_amount(amount)?;
            let code = get_currency(currency_code)?.code;

            let mut portfolio = self.load_portfolio(user_id)?;
            let wallet = portfolio.wallet_entry(code)?;
            let old_balance = wallet.balance();
            wallet.deposit(amount)?;
            let new_balance = wallet.balance();
            debug!("After buy: {}", wallet.balance_info());
            self.save_portfolio(&portfolio)?;

            Ok(self.receipt(TradeAction::Buy, code, amount, old_balance, new_balance))
        })
    }

    pub fn sell(&self, user_id: u64, currency_code: &str, amount: f64) -> Result<TradeReceipt> {
        self.audited(TradeAction::Sell, user_id, currency_code, amount, || {
            check_amount(amount)?;
            let code = get_currency(currency_code)?.code;

            let mut portfolio = self.load_portfolio(user_id)?;
            let wallet = portfolio
                .wallet_mut(code)
                .ok_or_else(|| LedgerError::NoWallet(code.to_string()))?;
            let old_balance = wallet.balance();
            wallet.withdraw(amount)?;
            let new_balance = wallet.balance();
            debug!("After sell: {}", wallet.balance_info());
            self.save_portfolio(&portfolio)?;

            Ok(self.receipt(TradeAction::Sell, code, amount, old_balance, new_balance))
        })
    }

    pub fn get_rate(&self, from: &str, to: &str) -> Result<RateQuote> {
        self.get_rate_at(from, to, Utc::now())
    }

    /// Quotes `from -> to` as of `now`.
    ///
    /// A cached direct pair is preferred; otherwise the rate is resolved from
    /// reverse or USD-pivot pairs and reported with source [`DERIVED_SOURCE`].
    pub fn get_rate_at(&self, from: &str, to: &str, now: DateTime<Utc>) -> Result<RateQuote> {
        let from = get_currency(from)?.code;
        let to = get_currency(to)?.code;
        let snapshot = self.rates()?;

        let direct = snapshot.pairs.get(from, to).filter(|r| r.rate != 0.0);
        let (rate, updated_at, source) = match direct {
            Some(record) => (record.rate, record.updated_at, record.source.clone()),
            None => {
                let rate = resolve(&snapshot.pairs, from, to);
                if rate == 0.0 {
                    return Err(LedgerError::RateUnavailable {
                        from: from.to_string(),
                        to: to.to_string(),
                    }
                    .into());
                }
                (rate, snapshot.last_refresh, DERIVED_SOURCE.to_string())
            }
        };

        if let Some(updated_at) = updated_at {
            if now - updated_at > self.rates_ttl {
                return Err(LedgerError::StaleRate(updated_at.to_rfc3339()).into());
            }
        }

        Ok(RateQuote {
            from: from.to_string(),
            to: to.to_string(),
            rate,
            updated_at,
            source,
        })
    }

    fn receipt(
        &self,
        action: TradeAction,
        code: &str,
        amount: f64,
        old_balance: f64,
        new_balance: f64,
    ) -> TradeReceipt {
        let rates = self.rates().unwrap_or_else(|e| {
            warn!("Could not read cached rates: {e:#}");
            RatesSnapshot::default()
        });
        let rate = resolve(&rates.pairs, code, &self.base_currency);
        debug!("{code} -> {} rate for estimate: {rate}", self.base_currency);

        TradeReceipt {
            action,
            currency: code.to_string(),
            amount,
            old_balance,
            new_balance,
            rate,
            base_currency: self.base_currency.clone(),
            estimated_value: (rate != 0.0).then(|| amount * rate),
        }
    }

    fn audited<T>(
        &self,
        action: TradeAction,
        user_id: u64,
        currency: &str,
        amount: f64,
        op: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let result = op();
        match &result {
            Ok(_) => info!(
                target: ACTIONS_TARGET,
                %action, user_id, currency, amount, result = "OK", "trade"
            ),
            Err(e) => error!(
                target: ACTIONS_TARGET,
                %action, user_id, currency, amount, result = "ERROR", error = %e, "trade"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::PairRecord;
    use tempfile::TempDir;

    fn ledger() -> (TempDir, Ledger) {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(JsonStore::new(dir.path()), &AppConfig::default());
        (dir, ledger)
    }

    fn ledger_error(err: &anyhow::Error) -> &LedgerError {
        err.downcast_ref::<LedgerError>()
            .unwrap_or_else(|| panic!("expected a LedgerError, got: {err:#}"))
    }

    fn seed_rates(ledger: &Ledger, updated_at: DateTime<Utc>, pairs: &[(&str, &str, f64)]) {
        let mut snapshot = RatesSnapshot {
            last_refresh: Some(updated_at),
            ..Default::default()
        };
        for (from, to, rate) in pairs {
            snapshot
                .pairs
                .insert(from, to, PairRecord::new(*rate, updated_at, "test"));
        }
        ledger.store().write(RATES_FILE, &snapshot).unwrap();
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let (_dir, ledger) = ledger();
        let alice = ledger.register("alice", "pass1234").unwrap();
        let bob = ledger.register("bob", "pass1234").unwrap();
        assert_eq!(alice.user_id, 1);
        assert_eq!(bob.user_id, 2);

        let portfolio = ledger.load_portfolio(bob.user_id).unwrap();
        assert!(portfolio.wallets().is_empty());
        let portfolios: Vec<Portfolio> = ledger.store().read(PORTFOLIOS_FILE).unwrap();
        assert_eq!(portfolios.len(), 2);
    }

    #[test]
    fn test_register_rejects_duplicates_and_bad_input() {
        let (_dir, ledger) = ledger();
        ledger.register("alice", "pass1234").unwrap();

        let err = ledger.register("alice", "other-pass").unwrap_err();
        assert_eq!(
            ledger_error(&err),
            &LedgerError::UsernameTaken("alice".to_string())
        );
        let err = ledger.register("carol", "abc").unwrap_err();
        assert_eq!(ledger_error(&err), &LedgerError::PasswordTooShort(4));
        let err = ledger.register("", "abcd").unwrap_err();
        assert_eq!(ledger_error(&err), &LedgerError::EmptyUsername);

        let users: Vec<User> = ledger.store().read(USERS_FILE).unwrap();
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_login_logout_session() {
        let (_dir, ledger) = ledger();
        ledger.register("alice", "pass1234").unwrap();

        let err = ledger.current_user().unwrap_err();
        assert_eq!(ledger_error(&err), &LedgerError::NotLoggedIn);

        let err = ledger.login("alice", "wrong").unwrap_err();
        assert_eq!(ledger_error(&err), &LedgerError::WrongPassword);
        let err = ledger.login("mallory", "pass1234").unwrap_err();
        assert_eq!(
            ledger_error(&err),
            &LedgerError::UserNotFound("mallory".to_string())
        );

        let user = ledger.login("alice", "pass1234").unwrap();
        assert_eq!(user.user_id, 1);
        let session = ledger.current_user().unwrap();
        assert_eq!(session.username, "alice");

        let ended = ledger.logout().unwrap();
        assert_eq!(ended.map(|s| s.user_id), Some(1));
        assert!(ledger.current_user().is_err());
        assert_eq!(ledger.logout().unwrap(), None);
    }

    #[test]
    fn test_buy_creates_wallet_and_estimates() {
        let (_dir, ledger) = ledger();
        let user = ledger.register("alice", "pass1234").unwrap();
        seed_rates(&ledger, Utc::now(), &[("BTC", "USD", 60000.0)]);

        let receipt = ledger.buy(user.user_id, "btc", 0.5).unwrap();
        assert_eq!(receipt.action, TradeAction::Buy);
        assert_eq!(receipt.currency, "BTC");
        assert_eq!(receipt.old_balance, 0.0);
        assert_eq!(receipt.new_balance, 0.5);
        assert_eq!(receipt.rate, 60000.0);
        assert_eq!(receipt.base_currency, "USD");
        assert_eq!(receipt.estimated_value, Some(30000.0));

        let receipt = ledger.buy(user.user_id, "BTC", 0.25).unwrap();
        assert_eq!(receipt.old_balance, 0.5);
        assert_eq!(receipt.new_balance, 0.75);

        let portfolio = ledger.load_portfolio(user.user_id).unwrap();
        assert_eq!(portfolio.wallet("BTC").unwrap().balance(), 0.75);
    }

    #[test]
    fn test_buy_without_rates_has_no_estimate() {
        let (_dir, ledger) = ledger();
        let user = ledger.register("alice", "pass1234").unwrap();

        let receipt = ledger.buy(user.user_id, "EUR", 100.0).unwrap();
        assert_eq!(receipt.rate, 0.0);
        assert_eq!(receipt.estimated_value, None);
    }

    #[test]
    fn test_buy_validation() {
        let (_dir, ledger) = ledger();
        let user = ledger.register("alice", "pass1234").unwrap();

        let err = ledger.buy(user.user_id, "BTC", 0.0).unwrap_err();
        assert_eq!(ledger_error(&err), &LedgerError::InvalidAmount(0.0));
        let err = ledger.buy(user.user_id, "DOGE", 1.0).unwrap_err();
        assert_eq!(
            ledger_error(&err),
            &LedgerError::CurrencyNotFound("DOGE".to_string())
        );
        assert!(ledger.load_portfolio(user.user_id).unwrap().wallets().is_empty());
    }

    #[test]
    fn test_sell_paths() {
        let (_dir, ledger) = ledger();
        let user = ledger.register("alice", "pass1234").unwrap();
        seed_rates(&ledger, Utc::now(), &[("USD", "EUR", 0.5)]);

        let err = ledger.sell(user.user_id, "EUR", 1.0).unwrap_err();
        assert_eq!(ledger_error(&err), &LedgerError::NoWallet("EUR".to_string()));

        ledger.buy(user.user_id, "EUR", 10.0).unwrap();
        let err = ledger.sell(user.user_id, "EUR", 25.0).unwrap_err();
        assert_eq!(
            ledger_error(&err),
            &LedgerError::InsufficientFunds {
                available: 10.0,
                required: 25.0,
                code: "EUR".to_string()
            }
        );

        let receipt = ledger.sell(user.user_id, "eur", 4.0).unwrap();
        assert_eq!(receipt.action, TradeAction::Sell);
        assert_eq!(receipt.old_balance, 10.0);
        assert_eq!(receipt.new_balance, 6.0);
        // EUR -> USD comes from inverting USD_EUR.
        assert_eq!(receipt.rate, 2.0);
        assert_eq!(receipt.estimated_value, Some(8.0));
    }

    #[test]
    fn test_get_rate_direct_and_derived() {
        let (_dir, ledger) = ledger();
        let now = Utc::now();
        seed_rates(&ledger, now, &[("EUR", "USD", 1.1), ("USD", "GBP", 0.8)]);

        let quote = ledger.get_rate_at("eur", "usd", now).unwrap();
        assert_eq!(quote.from, "EUR");
        assert_eq!(quote.to, "USD");
        assert_eq!(quote.rate, 1.1);
        assert_eq!(quote.source, "test");
        assert_eq!(quote.updated_at, Some(now));

        let quote = ledger.get_rate_at("EUR", "GBP", now).unwrap();
        assert!((quote.rate - 0.88).abs() < 1e-9);
        assert_eq!(quote.source, DERIVED_SOURCE);
        assert!((quote.reverse_rate().unwrap() - 1.0 / 0.88).abs() < 1e-9);
    }

    #[test]
    fn test_get_rate_errors() {
        let (_dir, ledger) = ledger();
        let now = Utc::now();
        seed_rates(&ledger, now, &[("EUR", "USD", 1.1)]);

        let err = ledger.get_rate_at("EUR", "XYZ", now).unwrap_err();
        assert_eq!(
            ledger_error(&err),
            &LedgerError::CurrencyNotFound("XYZ".to_string())
        );

        let err = ledger.get_rate_at("EUR", "RUB", now).unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            LedgerError::RateUnavailable { .. }
        ));

        let later = now + Duration::seconds(301);
        let err = ledger.get_rate_at("EUR", "USD", later).unwrap_err();
        assert!(matches!(ledger_error(&err), LedgerError::StaleRate(_)));
        assert!(ledger.get_rate_at("EUR", "USD", now + Duration::seconds(299)).is_ok());
    }

    #[test]
    fn test_huge_ttl_never_goes_stale() {
        for ttl in [10_000_000_000_000_000, u64::MAX] {
            let dir = TempDir::new().unwrap();
            let config = AppConfig::default().with_overrides(|key| {
                (key == "VALUTA_RATES_TTL_SECONDS").then(|| ttl.to_string())
            });
            let ledger = Ledger::new(JsonStore::new(dir.path()), &config);
            assert_eq!(ledger.rates_ttl, Duration::MAX);

            let now = Utc::now();
            seed_rates(&ledger, now, &[("EUR", "USD", 1.1)]);
            let quote = ledger
                .get_rate_at("EUR", "USD", now + Duration::days(365))
                .unwrap();
            assert_eq!(quote.rate, 1.1);
        }
        assert_eq!(ttl_duration(300), Duration::seconds(300));
    }

    #[test]
    fn test_valuate_account() {
        let (_dir, ledger) = ledger();
        let user = ledger.register("alice", "pass1234").unwrap();
        seed_rates(&ledger, Utc::now(), &[("EUR", "USD", 1.1)]);
        ledger.buy(user.user_id, "EUR", 10.0).unwrap();
        ledger.buy(user.user_id, "USD", 5.0).unwrap();

        let valuation = ledger.valuate(user.user_id, "usd").unwrap();
        assert_eq!(valuation.base_currency, "USD");
        assert_eq!(valuation.rows.len(), 2);
        assert!((valuation.total - 16.0).abs() < 1e-9);
    }
}
