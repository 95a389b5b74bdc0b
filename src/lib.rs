pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::ledger::Ledger;
use crate::store::JsonStore;
use anyhow::Result;
use clap::Subcommand;
use tracing::{debug, info};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Create default configuration
    Setup,
    /// Create a new account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and remember the session
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show wallets and their value in a base currency
    ShowPortfolio {
        /// Base currency, defaults to the configured one
        #[arg(long)]
        base: Option<String>,
    },
    /// Buy a currency into its wallet
    Buy {
        #[arg(long)]
        currency: String,
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },
    /// Sell a currency from its wallet
    Sell {
        #[arg(long)]
        currency: String,
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },
    /// Show the cached rate between two currencies
    GetRate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Refresh the rates cache from the configured providers
    UpdateRates,
    /// List supported currencies
    Currencies,
    /// Start an interactive session
    Shell,
}

/// Loaded configuration plus the ledger built from it.
pub struct App {
    config: AppConfig,
    ledger: Ledger,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = JsonStore::from_config(&config)?;
        debug!("Using data directory {}", store.data_dir().display());
        let ledger = Ledger::new(store, &config);
        Ok(Self { config, ledger })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs a single command. `setup` and `shell` are handled by
    /// [`run_command`] and rejected here.
    pub async fn dispatch(&self, cmd: AppCommand) -> Result<()> {
        match cmd {
            AppCommand::Register { username, password } => {
                cli::account::register(&self.ledger, &username, &password)
            }
            AppCommand::Login { username, password } => {
                cli::account::login(&self.ledger, &username, &password)
            }
            AppCommand::Logout => cli::account::logout(&self.ledger),
            AppCommand::ShowPortfolio { base } => cli::portfolio::run(&self.ledger, base.as_deref()),
            AppCommand::Buy { currency, amount } => {
                cli::trade::buy(&self.ledger, &currency, amount)
            }
            AppCommand::Sell { currency, amount } => {
                cli::trade::sell(&self.ledger, &currency, amount)
            }
            AppCommand::GetRate { from, to } => cli::rates::get_rate(&self.ledger, &from, &to),
            AppCommand::UpdateRates => {
                cli::rates::update_rates(&self.config, self.ledger.store()).await
            }
            AppCommand::Currencies => {
                cli::rates::currencies();
                Ok(())
            }
            AppCommand::Setup | AppCommand::Shell => {
                anyhow::bail!("This command is not available here")
            }
        }
    }
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?.with_env_overrides(),
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(cmd: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("valuta starting...");

    if cmd == AppCommand::Setup {
        return match config_path {
            Some(path) => cli::setup::setup_at_path(path),
            None => cli::setup::setup(),
        };
    }

    let app = App::new(load_config(config_path)?)?;
    match cmd {
        AppCommand::Shell => cli::shell::run(&app, tokio::io::BufReader::new(tokio::io::stdin())).await,
        cmd => app.dispatch(cmd).await,
    }
}
