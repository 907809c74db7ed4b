//! CLEARWIN: near-certain outcome trading bot for Polymarket
//!
//! Entry point. Loads configuration, initialises structured logging and
//! runs the scan→size→execute loop, either once or until Ctrl+C.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use clearwin::config::AppConfig;
use clearwin::engine::executor::Executor;
use clearwin::platforms::polymarket::PolymarketClient;
use clearwin::platforms::MarketGateway;
use clearwin::storage::{CsvTradeJournal, DEFAULT_TRADES_FILE};
use clearwin::types::TradingMode;

const BANNER: &str = r#"
  ____ _     _____    _    ______        _____ _   _
 / ___| |   | ____|  / \  |  _ \ \      / /_ _| \ | |
| |   | |   |  _|   / _ \ | |_) \ \ /\ / / | ||  \| |
| |___| |___| |___ / ___ \|  _ < \ V  V /  | || |\  |
 \____|_____|_____/_/   \_\_| \_\ \_/\_/  |___|_| \_|

  Buys near-certain outcomes close to resolution
"#;

const DEFAULT_LOG_FILE: &str = "bot.log";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Paper,
    Live,
}

impl From<ModeArg> for TradingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Paper => TradingMode::Paper,
            ModeArg::Live => TradingMode::Live,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "clearwin", version, about = "Polymarket clear-win trading bot")]
struct Args {
    /// Trading mode; overrides the config file and MODE.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Config file (TOML or JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Trade ledger CSV path.
    #[arg(long, default_value = DEFAULT_TRADES_FILE)]
    trades_file: PathBuf,

    /// Log file written alongside stdout.
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let args = Args::parse();

    // Held until exit so buffered file logs are flushed.
    let _guard = init_logging(&args.log_file)?;

    let (mut cfg, source) = AppConfig::resolve(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        cfg.mode = mode.into();
    }

    println!("{BANNER}");

    let client = PolymarketClient::from_config(&cfg)?;
    let journal = CsvTradeJournal::new(args.trades_file);
    info!(
        mode = %cfg.mode,
        config = %source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string()),
        platform = client.name(),
        trades_file = %journal.path().display(),
        log_file = %args.log_file.display(),
        "CLEARWIN starting up"
    );
    if cfg.mode == TradingMode::Live && cfg.private_key.is_none() {
        warn!("Live mode without PRIVATE_KEY; orders are posted unsigned");
    }

    let mut executor = Executor::new(
        Box::new(client),
        Box::new(journal),
        cfg.mode,
        cfg.trading.clone(),
    );

    if args.once {
        executor.run_cycle().await?.log();
        info!(positions = executor.ledger().len(), "Single pass complete");
        return Ok(());
    }

    info!(
        interval_secs = cfg.trading.scan_interval_seconds,
        "Entering main loop. Press Ctrl+C to stop."
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        result = executor.run_forever() => result?,
        _ = &mut shutdown => info!("Shutdown signal received."),
    }

    info!(
        cycles = executor.cycle_count(),
        positions = executor.ledger().len(),
        exposure = %executor.ledger().open_exposure(),
        "CLEARWIN shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber: stdout (plain or JSON) plus a
/// plain-text log file.
fn init_logging(log_file: &Path) -> Result<WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let (dir, file_name) = split_log_path(log_file)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clearwin=info"));

    let json_logging = std::env::var("CLEARWIN_LOG_JSON").is_ok();

    let stdout_layer = if json_logging {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Directory and file name for the file appender. A bare name lands in `.`.
fn split_log_path(log_file: &Path) -> Result<(&Path, &OsStr)> {
    let file_name = log_file
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", log_file.display()))?;
    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_defaults_to_bot_log() {
        let args = Args::parse_from(["clearwin"]);
        assert_eq!(args.log_file, PathBuf::from("bot.log"));
        assert_eq!(args.trades_file, PathBuf::from(DEFAULT_TRADES_FILE));
        assert!(!args.once);
    }

    #[test]
    fn test_log_file_flag() {
        let args = Args::parse_from(["clearwin", "--log-file", "logs/run.log", "--mode", "live"]);
        assert_eq!(args.log_file, PathBuf::from("logs/run.log"));
        assert!(matches!(args.mode, Some(ModeArg::Live)));
    }

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("bot.log")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert_eq!(name, "bot.log");

        let (dir, name) = split_log_path(Path::new("logs/run.log")).unwrap();
        assert_eq!(dir, Path::new("logs"));
        assert_eq!(name, "run.log");

        assert!(split_log_path(Path::new("/")).is_err());
    }
}
