use anyhow::Result;
use clap::{CommandFactory, Parser};
use valuta::AppCommand;
use valuta::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<AppCommand>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let actions_log = valuta::load_config(cli.config_path.as_deref())
        .and_then(|config| config.actions_log_path())
        .ok();
    init_logging(cli.verbose, actions_log.as_deref());

    let result = match cli.command {
        Some(cmd) => valuta::run_command(cmd, cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
