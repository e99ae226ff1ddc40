use clap::Args;
use serde_json::Value;

use bond_analytics_core::correlation::analyzer::{analyze_correlation, CorrelationInput};
use bond_analytics_core::correlation::series::HistoricalPriceSeries;

use crate::input;

/// Arguments for price correlation
#[derive(Args)]
pub struct CorrelateArgs {
    /// Path to input: first and second price series, optional config
    #[arg(long)]
    pub input: Option<String>,
    /// First series file (used with --second instead of --input)
    #[arg(long, requires = "second", conflicts_with = "input")]
    pub first: Option<String>,
    /// Second series file
    #[arg(long, requires = "first", conflicts_with = "input")]
    pub second: Option<String>,
    /// Override the minimum number of aligned observations
    #[arg(long)]
    pub min_observations: Option<usize>,
}

pub fn run_correlate(args: CorrelateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: CorrelationInput = match (&args.first, &args.second) {
        (Some(first), Some(second)) => {
            let first: HistoricalPriceSeries = input::file::read_document(first)?;
            let second: HistoricalPriceSeries = input::file::read_document(second)?;
            CorrelationInput {
                first,
                second,
                config: Default::default(),
            }
        }
        _ => input::read_input(args.input.as_deref(), "correlation")?,
    };
    if let Some(min) = args.min_observations {
        request.config.min_observations = min;
    }
    let result = analyze_correlation(&request)?;
    Ok(serde_json::to_value(result)?)
}
