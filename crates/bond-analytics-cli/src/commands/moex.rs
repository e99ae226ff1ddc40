use chrono::{Local, NaiveDate};
use clap::Args;
use serde_json::Value;

use bond_analytics_core::moex::fx::FxRates;
use bond_analytics_core::moex::history::parse_history;
use bond_analytics_core::moex::securities::{parse_securities, parse_snapshots};

use crate::input;

/// Arguments for ISS securities parsing
#[derive(Args)]
pub struct ParseSecuritiesArgs {
    /// Saved ISS securities.json response
    #[arg(long)]
    pub input: Option<String>,
    /// Currency rates into roubles: {"USD": "92.1"} or a list of CBR quotes
    #[arg(long)]
    pub fx: Option<String>,
    /// Valuation date stamped on every snapshot (default: today)
    #[arg(long)]
    pub loading_date: Option<NaiveDate>,
    /// Emit every parsed row instead of valuation-ready snapshots
    #[arg(long)]
    pub raw: bool,
}

pub fn run_parse_securities(args: ParseSecuritiesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let payload: Value = input::read_input(args.input.as_deref(), "securities parsing")?;
    let fx: FxRates = match args.fx {
        Some(ref path) => FxRates::from_json(&input::file::read_json_value(path)?)?,
        None => FxRates::new(),
    };
    let loading_date = args.loading_date.unwrap_or_else(|| Local::now().date_naive());

    if args.raw {
        let rows = parse_securities(&payload, &fx, loading_date)?;
        return Ok(serde_json::to_value(rows)?);
    }

    let (snapshots, skipped) = parse_snapshots(&payload, &fx, loading_date)?;
    Ok(serde_json::json!({
        "result": snapshots,
        "warnings": skipped,
    }))
}

/// Arguments for ISS history parsing
#[derive(Args)]
pub struct ParseHistoryArgs {
    /// Ticker the pages belong to
    #[arg(long)]
    pub ticker: String,
    /// Saved ISS history page; repeat for start=0,100,200...
    #[arg(long = "page")]
    pub pages: Vec<String>,
}

pub fn run_parse_history(args: ParseHistoryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pages: Vec<Value> = if args.pages.is_empty() {
        vec![input::read_input(None, "history parsing")?]
    } else {
        args.pages
            .iter()
            .map(|p| input::file::read_json_value(p))
            .collect::<Result<_, _>>()?
    };
    let series = parse_history(&args.ticker, &pages)?;
    Ok(serde_json::to_value(series)?)
}
