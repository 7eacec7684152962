mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::pricing::{OptionArgs, ProductArgs, StrategyArgs};

/// Multi-leg option pricing and finite-difference greeks
#[derive(Parser)]
#[command(
    name = "optstack",
    version,
    about = "Multi-leg option pricing and finite-difference greeks",
    long_about = "Prices European option structures (spreads, straddles, butterflies, \
                  condors, calendars) under Black-Scholes and reports delta, gamma, \
                  theta and vega by finite differencing. Spot may be a single level \
                  or an array of levels."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "optstack_core=trace")
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a custom multi-leg product from JSON
    Product(ProductArgs),
    /// Price a named strategy (bull spread, butterfly, condor, ...) from JSON
    Strategy(StrategyArgs),
    /// Price a single call or put leg
    Option(OptionArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Product(args) => commands::pricing::run_product(args),
        Commands::Strategy(args) => commands::pricing::run_strategy(args),
        Commands::Option(args) => commands::pricing::run_option(args),
        Commands::Version => {
            println!("optstack {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
