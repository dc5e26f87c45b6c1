//! CLI Command Handlers
//!
//! `serve` runs the control API with the strategy runner behind it,
//! `run` drives the loop headless, `historical` prints the backtest report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::api::{self, AppState, BroadcastObserver, DEFAULT_HISTORY_WINDOW};
use crate::adapters::market_data::{SimulatedMarketData, YahooFinanceClient};
use crate::application::report::HistoricalReport;
use crate::application::runner::{RunnerConfig, StrategyRunner};
use crate::config::{load_config, Config, ProviderKind};
use crate::ports::market_data::MarketDataProvider;
use crate::ports::observer::{LoggingObserver, StrategyObserver};

/// Brent/WTI cointegrated spread trader
#[derive(Parser, Debug)]
#[command(
    name = "spread-arb",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Brent/WTI cointegrated spread trader",
    long_about = "Fits an OLS hedge ratio between Brent and WTI, tracks the rolling z-score \
                  of the spread and drives a long/flat/short position from live prices."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the control API and WebSocket stream
    Serve(ServeCmd),

    /// Initialize and run the strategy loop until Ctrl+C
    Run(RunCmd),

    /// Initialize and print the historical spread/PnL report
    Historical(HistoricalCmd),
}

#[derive(Parser, Debug)]
pub struct ServeCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Initialize and start the strategy immediately
    #[arg(long)]
    pub auto_start: bool,

    /// Override listen port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,
}

#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Use the simulated provider regardless of config
    #[arg(long)]
    pub simulated: bool,
}

#[derive(Parser, Debug)]
pub struct HistoricalCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Number of most recent bars to report
    #[arg(short, long, value_name = "BARS", default_value_t = DEFAULT_HISTORY_WINDOW)]
    pub window: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Use the simulated provider regardless of config
    #[arg(long)]
    pub simulated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    match app.command {
        Command::Serve(cmd) => serve_command(cmd, app.verbose, app.debug).await,
        Command::Run(cmd) => run_command(cmd, app.verbose, app.debug).await,
        Command::Historical(cmd) => historical_command(cmd, app.verbose, app.debug).await,
    }
}

/// Initialize logging system.
/// Flags win over `RUST_LOG`, which wins over the config file level.
fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn load(path: &std::path::Path) -> Result<Config> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
    load_config(&expanded).with_context(|| format!("Failed to load configuration from {}", expanded))
}

fn build_provider(config: &Config, force_simulated: bool) -> Result<Arc<dyn MarketDataProvider>> {
    let kind = if force_simulated {
        ProviderKind::Simulated
    } else {
        config.market_data.provider
    };

    match kind {
        ProviderKind::Yahoo => {
            let client = YahooFinanceClient::with_config(config.yahoo_config())
                .context("Failed to create Yahoo Finance client")?;
            tracing::info!(base_url = client.base_url(), "Using Yahoo Finance market data");
            Ok(Arc::new(client))
        }
        ProviderKind::Simulated => {
            let sim = SimulatedMarketData::new(config.simulation_config())
                .context("Failed to create simulated market data")?;
            tracing::warn!(seed = config.market_data.seed, "Using SIMULATED market data");
            Ok(Arc::new(sim))
        }
    }
}

fn build_runner(
    config: &Config,
    provider: Arc<dyn MarketDataProvider>,
    observer: Arc<dyn StrategyObserver>,
) -> Result<StrategyRunner> {
    StrategyRunner::new(RunnerConfig::from(config), provider, observer)
        .context("Invalid strategy configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Handle serve command
async fn serve_command(cmd: ServeCmd, verbose: bool, debug: bool) -> Result<()> {
    let config = load(&cmd.config)?;
    init_logging(verbose, debug, &config.logging.level)?;

    let provider = build_provider(&config, false)?;
    let updates = BroadcastObserver::default();
    let runner = build_runner(&config, provider, Arc::new(updates.clone()))?;

    if cmd.auto_start {
        match runner.initialize().await {
            Ok(_) => runner.start().await?,
            Err(e) => tracing::error!(error = %e, "Auto-start failed; initialize via the API"),
        }
    }

    let addr = config.server.socket_addr_for(cmd.port)?;
    let state = AppState::new(runner.clone(), updates);
    api::serve(addr, state, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    runner.stop().await;
    tracing::info!("spread-arb stopped");
    Ok(())
}

/// Handle run command
async fn run_command(cmd: RunCmd, verbose: bool, debug: bool) -> Result<()> {
    let config = load(&cmd.config)?;
    init_logging(verbose, debug, &config.logging.level)?;
    tracing::info!("Config: {}", cmd.config.display());

    let provider = build_provider(&config, cmd.simulated)?;
    let runner = build_runner(&config, provider, Arc::new(LoggingObserver))?;

    runner
        .initialize()
        .await
        .context("Strategy initialization failed")?;
    runner.start().await?;

    shutdown_signal().await;
    runner.stop().await;

    let status = runner.status().await;
    tracing::info!(position = %status.position, "spread-arb stopped");
    Ok(())
}

/// Handle historical command
async fn historical_command(cmd: HistoricalCmd, verbose: bool, debug: bool) -> Result<()> {
    let config = load(&cmd.config)?;
    init_logging(verbose, debug, &config.logging.level)?;

    let provider = build_provider(&config, cmd.simulated)?;
    let runner = build_runner(&config, provider, Arc::new(LoggingObserver))?;

    let fit = runner
        .initialize()
        .await
        .context("Strategy initialization failed")?;
    let report = runner.historical(cmd.window).await?;

    match cmd.format {
        OutputFormat::Json => {
            let body = serde_json::json!({ "hedge_ratio": fit, "report": report });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => print_report(&config, fit, &report),
    }

    Ok(())
}

fn print_report(config: &Config, fit: crate::strategy::hedge_ratio::HedgeRatio, report: &HistoricalReport) {
    let first = report.dates.first().map(|d| d.format("%Y-%m-%d").to_string());
    let last = report.dates.last().map(|d| d.format("%Y-%m-%d").to_string());

    println!(
        "{} vs {}",
        config.instruments.dependent_symbol, config.instruments.independent_symbol
    );
    println!("  Beta:          {:.4}", fit.beta);
    println!("  Intercept:     {:.4}", fit.intercept);
    println!("  R-squared:     {:.4}", fit.r_squared);
    println!(
        "  Period:        {} to {} ({} bars)",
        first.unwrap_or_default(),
        last.unwrap_or_default(),
        report.len()
    );
    println!("  Trades:        {}", report.trade_count);
    println!("  Cumulative PnL: {:.4}", report.total_pnl());
    if let (Some(spread), Some(z), Some(position)) = (
        report.spread.last(),
        report.z_score.last(),
        report.position.last(),
    ) {
        println!("  Last spread:   {:.4} (z = {:.3})", spread, z);
        println!("  Position:      {}", position);
    }
}
