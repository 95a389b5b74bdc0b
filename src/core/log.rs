use anyhow::{Context, Result};
use std::path::Path;
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    registry::LookupSpan, util::SubscriberInitExt,
};

/// Target used for the buy/sell audit trail.
pub const ACTIONS_TARGET: &str = "valuta::actions";

const MAX_ACTION_LOG_FILES: usize = 5;

/// File layer that records every event on [`ACTIONS_TARGET`], independent of
/// `--verbose` and `RUST_LOG`. Files rotate daily, keeping the last five.
pub fn actions_layer<S>(log_file: &Path) -> Result<impl Layer<S> + use<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let prefix = log_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("actions");
    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(MAX_ACTION_LOG_FILES);
    if let Some(ext) = log_file.extension().and_then(|e| e.to_str()) {
        builder = builder.filename_suffix(ext);
    }
    let appender = builder
        .build(dir)
        .with_context(|| format!("Failed to open action log in {}", dir.display()))?;

    Ok(fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_target(false)
        .with_filter(Targets::new().with_target(ACTIONS_TARGET, LevelFilter::INFO)))
}

pub fn init_logging(verbose: bool, actions_log: Option<&Path>) {
    let (app_level, actions_level, default_directive) = if verbose {
        (LevelFilter::DEBUG, LevelFilter::INFO, "debug")
    } else {
        (LevelFilter::OFF, LevelFilter::OFF, "off")
    };
    let app_filter = Targets::new()
        .with_target("valuta", app_level)
        .with_target(ACTIONS_TARGET, actions_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // Logging is not up yet, so this is the only place to report the problem.
    let actions = actions_log.and_then(|path| match actions_layer(path) {
        Ok(layer) => Some(layer),
        Err(e) => {
            eprintln!("Warning: action log disabled: {e:#}");
            None
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr)
                .with_filter(app_filter)
                .with_filter(env_filter),
        )
        .with(actions)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AppConfig;
    use crate::core::ledger::Ledger;
    use crate::store::JsonStore;
    use tempfile::TempDir;

    fn read_logs(dir: &Path) -> String {
        let mut contents = String::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if name.starts_with("actions") && name.ends_with("log") {
                contents.push_str(&std::fs::read_to_string(&path).unwrap());
            }
        }
        contents
    }

    #[test]
    fn test_trades_are_written_to_action_log() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let ledger = Ledger::new(JsonStore::new(dir.path().join("data")), &AppConfig::default());

        let subscriber =
            tracing_subscriber::registry().with(actions_layer(&log_dir.join("actions.log")).unwrap());
        tracing::subscriber::with_default(subscriber, || {
            let user = ledger.register("alice", "pass1234").unwrap();
            ledger.buy(user.user_id, "BTC", 0.5).unwrap();
            ledger.sell(user.user_id, "BTC", 2.0).unwrap_err();
            tracing::info!("unrelated event");
        });

        let contents = read_logs(&log_dir);
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2, "{contents}");

        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("BUY"));
        assert!(lines[0].contains("OK"));

        assert!(lines[1].contains("ERROR"));
        assert!(lines[1].contains("SELL"));
        assert!(lines[1].contains("Insufficient funds"));
    }
}
