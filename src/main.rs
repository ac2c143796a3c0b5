//! Trading account simulator CLI.
//!
//! Replays scripted price ticks and orders against a simulated account and
//! prints a performance report.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use algosim::{Account, AccountConfig, Scenario};

/// Simulated trading account CLI.
#[derive(Parser)]
#[command(name = "algosim")]
#[command(about = "Simulate a trading account against scripted prices", long_about = None)]
struct Cli {
    /// Starting funds
    #[arg(long, env = "ALGOSIM_FUNDS", default_value = "100000")]
    funds: Decimal,

    /// Flat fee per executed trade
    #[arg(long, env = "ALGOSIM_FEE", default_value = "6.99")]
    fee: Decimal,

    /// Record the first price of every ticker seen, not only the updating one
    #[arg(long, env = "ALGOSIM_RECORD_ALL_PRICES")]
    record_all_prices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON scenario and print the final report
    Replay {
        /// Scenario file
        path: PathBuf,

        /// List each holding in the report
        #[arg(short, long)]
        verbose: bool,

        /// Stop at the first rejected action
        #[arg(long)]
        strict: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AccountConfig::new(cli.funds, cli.fee)
        .with_all_original_prices(cli.record_all_prices);

    match cli.command {
        Commands::Replay {
            path,
            verbose,
            strict,
            json,
        } => {
            let scenario = Scenario::load(&path)?;
            info!(path = %path.display(), ticks = scenario.ticks.len(), "Loaded scenario");

            let mut account = Account::with_config(config);
            let summary = scenario.replay(&mut account, strict)?;

            if !summary.rejections.is_empty() {
                println!("\n--- Rejected Actions ({}) ---", summary.rejections.len());
                for rejection in &summary.rejections {
                    println!("  tick {}: {}", rejection.tick, rejection.error);
                }
            }

            let report = account.report(verbose)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
                println!("{}", account);
            }
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
