//! Accounts, wallets and portfolios as they are persisted in the data dir.

use crate::core::currency::validate_code;
use crate::core::error::LedgerError;
use crate::core::rates::PairTable;
use crate::core::valuation::{self, Valuation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub username: String,
    hashed_password: String,
    salt: String,
    pub registration_date: DateTime<Utc>,
}

/// Public view of a [`User`], without credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: u64,
    pub username: String,
    pub registration_date: DateTime<Utc>,
}

fn new_salt() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

fn check_password(password: &str) -> Result<(), LedgerError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LedgerError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}

impl User {
    pub fn create(user_id: u64, username: &str, password: &str) -> Result<Self, LedgerError> {
        if username.trim().is_empty() {
            return Err(LedgerError::EmptyUsername);
        }
        check_password(password)?;

        let salt = new_salt();
        Ok(Self {
            user_id,
            username: username.to_string(),
            hashed_password: hash_password(password, &salt),
            salt,
            registration_date: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        hash_password(password, &self.salt) == self.hashed_password
    }

    /// Replaces the password, rotating the salt.
    pub fn change_password(&mut self, new_password: &str) -> Result<(), LedgerError> {
        check_password(new_password)?;
        self.salt = new_salt();
        self.hashed_password = hash_password(new_password, &self.salt);
        Ok(())
    }

    pub fn info(&self) -> UserInfo {
        UserInfo {
            user_id: self.user_id,
            username: self.username.clone(),
            registration_date: self.registration_date,
        }
    }
}

/// Balance held in a single currency.
///
/// The code is always a valid currency code and the balance never negative,
/// including for wallets read back from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WalletRecord")]
pub struct Wallet {
    pub currency_code: String,
    balance: f64,
}

#[derive(Deserialize)]
struct WalletRecord {
    currency_code: String,
    #[serde(default)]
    balance: f64,
}

impl TryFrom<WalletRecord> for Wallet {
    type Error = LedgerError;

    fn try_from(record: WalletRecord) -> Result<Self, Self::Error> {
        Wallet::with_balance(&record.currency_code, record.balance)
    }
}

impl Wallet {
    pub fn new(currency_code: &str) -> Result<Self, LedgerError> {
        let currency_code = currency_code.trim().to_uppercase();
        validate_code(&currency_code)?;
        Ok(Self {
            currency_code,
            balance: 0.0,
        })
    }

    pub fn with_balance(currency_code: &str, balance: f64) -> Result<Self, LedgerError> {
        let mut wallet = Self::new(currency_code)?;
        wallet.set_balance(balance)?;
        Ok(wallet)
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn set_balance(&mut self, value: f64) -> Result<(), LedgerError> {
        if value < 0.0 || value.is_nan() {
            return Err(LedgerError::NegativeBalance);
        }
        self.balance = value;
        Ok(())
    }

    pub fn deposit(&mut self, amount: f64) -> Result<(), LedgerError> {
        if amount.is_nan() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.balance += amount;
        Ok(())
    }

    pub fn withdraw(&mut self, amount: f64) -> Result<(), LedgerError> {
        if amount.is_nan() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                available: self.balance,
                required: amount,
                code: self.currency_code.clone(),
            });
        }
        self.balance -= amount;
        Ok(())
    }

    pub fn balance_info(&self) -> String {
        format!("{}: {:.4}", self.currency_code, self.balance)
    }
}

/// All wallets owned by one account.
///
/// Wallets are kept in a `BTreeMap`, so iteration (and therefore every
/// valuation row) is in ascending currency-code order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PortfolioRecord")]
pub struct Portfolio {
    pub user_id: u64,
    wallets: BTreeMap<String, Wallet>,
}

#[derive(Deserialize)]
struct PortfolioRecord {
    user_id: u64,
    #[serde(default)]
    wallets: BTreeMap<String, Wallet>,
}

impl TryFrom<PortfolioRecord> for Portfolio {
    type Error = LedgerError;

    /// Re-keys wallets by their own code so lookups match what they hold.
    fn try_from(record: PortfolioRecord) -> Result<Self, Self::Error> {
        let mut portfolio = Portfolio::new(record.user_id);
        for wallet in record.wallets.into_values() {
            let code = wallet.currency_code.clone();
            if portfolio.wallets.insert(code.clone(), wallet).is_some() {
                return Err(LedgerError::DuplicateWallet(code));
            }
        }
        Ok(portfolio)
    }
}

impl Portfolio {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            wallets: BTreeMap::new(),
        }
    }

    pub fn wallets(&self) -> &BTreeMap<String, Wallet> {
        &self.wallets
    }

    pub fn add_currency(&mut self, currency_code: &str) -> Result<&mut Wallet, LedgerError> {
        let wallet = Wallet::new(currency_code)?;
        if self.wallets.contains_key(&wallet.currency_code) {
            return Err(LedgerError::DuplicateWallet(wallet.currency_code));
        }
        Ok(self
            .wallets
            .entry(wallet.currency_code.clone())
            .or_insert(wallet))
    }

    /// Returns the wallet for `currency_code`, creating an empty one if needed.
    pub fn wallet_entry(&mut self, currency_code: &str) -> Result<&mut Wallet, LedgerError> {
        let wallet = Wallet::new(currency_code)?;
        Ok(self
            .wallets
            .entry(wallet.currency_code.clone())
            .or_insert(wallet))
    }

    pub fn wallet(&self, currency_code: &str) -> Option<&Wallet> {
        self.wallets.get(&currency_code.to_uppercase())
    }

    pub fn wallet_mut(&mut self, currency_code: &str) -> Option<&mut Wallet> {
        self.wallets.get_mut(&currency_code.to_uppercase())
    }

    pub fn total_value(&self, pairs: &PairTable, base_currency: &str) -> f64 {
        self.valuate(pairs, base_currency).total
    }

    pub fn valuate(&self, pairs: &PairTable, base_currency: &str) -> Valuation {
        valuation::valuate(pairs, &self.wallets, base_currency)
    }
}
