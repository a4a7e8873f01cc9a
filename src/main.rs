mod output;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use configuration::{Config, Logging};
use core_types::OrderSide;
use executor::{Broker, Ledger, OrderOutcome, PortfolioQuery};
use portfolio_backtester::{BacktestDriver, QuoteMatrix};
use portfolio_parser::{
    PortfolioParser, PortfolioVisualizerParser, load_holdings, load_prices, load_quote_series,
};
use rebalance::{OrderGenerator, RebalanceOptions};
use rust_decimal::Decimal;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the rebalancer application.
fn main() -> Result<()> {
    // Load REBALANCER_* overrides from a .env file, if there is one.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = configuration::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Backtest(args) => handle_backtest(args, &config),
        Commands::Rebalance(args) => handle_rebalance(args, &config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Keeps a portfolio at its target weights and measures what that is worth.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults to ./config.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare holding the initial allocation with rebalancing every period.
    Backtest(BacktestArgs),
    /// Plan and execute the orders that bring an account back to its target weights.
    Rebalance(RebalanceArgs),
}

#[derive(Parser)]
struct BacktestArgs {
    /// PortfolioVisualizer export with the target allocation.
    #[arg(long)]
    weights: PathBuf,

    /// Directory holding one `<SYMBOL>.csv` file of daily closes per asset.
    #[arg(long)]
    quotes_dir: PathBuf,

    /// Write `equity.csv` and `report.json` into this directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Overrides `backtest.starting_cash`.
    #[arg(long)]
    starting_cash: Option<Decimal>,
}

#[derive(Parser)]
struct RebalanceArgs {
    /// PortfolioVisualizer export with the target allocation.
    #[arg(long)]
    weights: PathBuf,

    /// Current prices as `symbol,price`.
    #[arg(long)]
    prices: PathBuf,

    /// Cash available in the account.
    #[arg(long)]
    cash: Decimal,

    /// Current holdings as `symbol,quantity,avg_buy_price`.
    #[arg(long)]
    holdings: Option<PathBuf>,

    /// Execute without asking for confirmation.
    #[arg(long)]
    yes: bool,
}

// ==============================================================================
// Logging
// ==============================================================================

/// Logs to stderr, and additionally to a daily rolling file when `logging.directory` is set.
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(settings: &Logging) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .context("Invalid log filter")?;

    match &settings.directory {
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(None)
        }
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "rebalancer.log");
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::io::stderr.and(file_writer))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(Some(guard))
        }
    }
}

// ==============================================================================
// Backtest Command Logic
// ==============================================================================

fn handle_backtest(args: BacktestArgs, config: &Config) -> Result<()> {
    let target = PortfolioVisualizerParser::new()
        .parse_file(&args.weights)
        .with_context(|| format!("Failed to read weights from {}", args.weights.display()))?;
    if target.assets.is_empty() {
        bail!("{} lists no assets", args.weights.display());
    }

    let series = load_quote_series(&args.quotes_dir, &target.assets)?;
    let quotes = QuoteMatrix::from_unaligned_series(target.assets.clone(), series)?;
    println!(
        "Simulating {} assets over {} periods...",
        quotes.assets().len(),
        quotes.len()
    );

    let mut driver = BacktestDriver::from_config(config);
    if let Some(cash) = args.starting_cash {
        if cash <= Decimal::ZERO {
            bail!("--starting-cash must be greater than 0, got {}", cash);
        }
        driver = driver.with_starting_cash(cash);
    }

    let comparison = driver.compare(&target.weights, &quotes)?;
    let summary = output::BacktestSummary::new(&target, driver.starting_cash(), &comparison)?;
    println!("{}", output::report_table(&summary));

    if let Some(directory) = &args.output {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create {}", directory.display()))?;
        output::write_equity_csv(&directory.join("equity.csv"), &summary)?;
        output::write_report_json(&directory.join("report.json"), &summary)?;
        println!("Saved results to {}", directory.display());
    }
    Ok(())
}

// ==============================================================================
// Rebalance Command Logic
// ==============================================================================

fn handle_rebalance(args: RebalanceArgs, config: &Config) -> Result<()> {
    if args.cash < Decimal::ZERO {
        bail!("--cash must not be negative, got {}", args.cash);
    }
    let target = PortfolioVisualizerParser::new()
        .parse_file(&args.weights)
        .with_context(|| format!("Failed to read weights from {}", args.weights.display()))?;
    let prices = load_prices(&args.prices, Utc::now())?;
    let holdings = args
        .holdings
        .as_deref()
        .map(load_holdings)
        .transpose()?
        .unwrap_or_default();

    let mut ledger = Ledger::from_holdings(args.cash, holdings)
        .with_cost_basis(config.account.cost_basis);
    ledger.set_quotes(prices);

    let generator = OrderGenerator::new(RebalanceOptions::from(&config.rebalance));
    let orders = generator.rebalance(&ledger, &target.weights, &target.assets)?;
    if orders.is_empty() {
        println!("The portfolio is already on target. Nothing to do.");
        return Ok(());
    }

    println!("{}", output::orders_table(&orders));
    let spend: Decimal = orders
        .iter()
        .filter(|o| o.side == OrderSide::Buy)
        .map(|o| o.value())
        .sum();
    println!("Total purchases: {} of {} available cash", spend, args.cash);

    if !args.yes && !confirm(&format!("Execute {} orders?", orders.len()))? {
        println!("Aborted.");
        return Ok(());
    }

    let outcomes = ledger.execute(&orders);
    println!("{}", output::outcomes_table(&orders, &outcomes));

    let snapshot = ledger.portfolio(&target.assets)?;
    println!("{}", output::holdings_table(&snapshot, &target.weights));
    println!("Cash left: {}", ledger.available_cash()?);

    ensure_all_executed(&outcomes)
}

/// Turns any rejected order into an error so the process exits non-zero.
fn ensure_all_executed(outcomes: &[OrderOutcome]) -> Result<()> {
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
        bail!("{}/{} orders failed", failed, outcomes.len());
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
