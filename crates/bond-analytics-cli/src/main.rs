mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::bond::{ScheduleArgs, ValueArgs, ValueBatchArgs, YtmArgs};
use commands::correlation::CorrelateArgs;
use commands::moex::{ParseHistoryArgs, ParseSecuritiesArgs};

/// Bond valuation and price-correlation analytics
#[derive(Parser)]
#[command(
    name = "bonds",
    version,
    about = "Bond valuation and price-correlation analytics",
    long_about = "A CLI for valuing exchange-traded bonds with decimal precision: \
                  cash-flow schedules, fair value at a target rate, yield to maturity, \
                  current yield, and correlation analysis of two price histories. \
                  Also parses saved Moscow Exchange ISS responses into inputs."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log solver and analyzer diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the remaining cash-flow schedule of a bond
    Schedule(ScheduleArgs),
    /// Value a bond: fair value, YTM, current yield, conclusion
    Value(ValueArgs),
    /// Value many bonds in parallel at one target rate
    ValueBatch(ValueBatchArgs),
    /// Solve yield to maturity for a price
    Ytm(YtmArgs),
    /// Correlate two price histories and recommend a measure
    Correlate(CorrelateArgs),
    /// Convert an ISS securities response into bond snapshots
    ParseSecurities(ParseSecuritiesArgs),
    /// Convert ISS history pages into a price series
    ParseHistory(ParseHistoryArgs),
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

fn init_logging(verbose: bool) {
    let default = if verbose {
        "bond_analytics_core=debug,bonds=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stdout carries the result; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Schedule(args) => commands::bond::run_schedule(args),
        Commands::Value(args) => commands::bond::run_value(args),
        Commands::ValueBatch(args) => commands::bond::run_value_batch(args),
        Commands::Ytm(args) => commands::bond::run_ytm(args),
        Commands::Correlate(args) => commands::correlation::run_correlate(args),
        Commands::ParseSecurities(args) => commands::moex::run_parse_securities(args),
        Commands::ParseHistory(args) => commands::moex::run_parse_history(args),
        Commands::Version => {
            println!("bonds {}", env!("CARGO_PKG_VERSION"));
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
