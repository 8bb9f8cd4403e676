mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::allocation::OptimizeArgs;
use commands::estimation::{PairwiseArgs, TwoAssetArgs};
use commands::risk::RiskTargetArgs;

/// Risk-targeted portfolio allocation
#[derive(Parser)]
#[command(
    name = "spread",
    version,
    about = "Risk-targeted portfolio allocation",
    long_about = "Spread an investment across selected stocks: minimum-variance or \
                  return-maximizing weights under a volatility ceiling chosen on a \
                  1-100 risk scale, with pairwise covariance diagnostics from daily \
                  change histories."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Optimizer configuration (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a portfolio request against a dataset
    Optimize(OptimizeArgs),
    /// Pairwise covariance and correlation of change histories
    Pairwise(PairwiseArgs),
    /// Closed-form two-asset minimum-variance portfolios for every pair
    TwoAsset(TwoAssetArgs),
    /// Map between the 1-100 risk scale and a target standard deviation
    RiskTarget(RiskTargetArgs),
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

fn main() {
    // Logs go to stderr so stdout stays machine readable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match input::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Optimize(args) => commands::allocation::run_optimize(args, &config),
        Commands::Pairwise(args) => commands::estimation::run_pairwise(args),
        Commands::TwoAsset(args) => commands::estimation::run_two_asset(args),
        Commands::RiskTarget(args) => commands::risk::run_risk_target(args, &config),
        Commands::Version => {
            println!("spread {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
