pub mod disk;

use crate::core::config::AppConfig;
use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};

pub const USERS_FILE: &str = "users.json";
pub const PORTFOLIOS_FILE: &str = "portfolios.json";
pub const RATES_FILE: &str = "rates.json";
pub const HISTORY_FILE: &str = "exchange_rates.json";
pub const SESSION_FILE: &str = "session.json";

/// JSON documents kept under a single data directory.
///
/// Constructed explicitly and passed to whoever needs it; every call goes
/// straight to disk, so two stores over the same directory see each other's
/// writes.
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(config.data_dir()?))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        disk::read_json(&self.path(file))
    }

    pub fn write<T: Serialize + ?Sized>(&self, file: &str, data: &T) -> Result<()> {
        disk::write_json(&self.path(file), data)
    }

    pub fn remove(&self, file: &str) -> Result<()> {
        let path = self.path(file);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}
