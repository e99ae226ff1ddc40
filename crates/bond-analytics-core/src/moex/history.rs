use serde_json::Value;

use super::table::{date, float, upstream, IssTable};
use crate::correlation::series::{HistoricalPriceSeries, PricePoint};
use crate::BondAnalyticsResult;

/// Positions within an ISS `history` row.
const TRADE_DATE_COLUMN: usize = 1;
const CLOSE_COLUMN: usize = 9;

/// Build a price series from one or more `history` pages, in the order given.
pub fn parse_history(ticker: &str, pages: &[Value]) -> BondAnalyticsResult<HistoricalPriceSeries> {
    let mut points = Vec::new();
    for (page_no, page) in pages.iter().enumerate() {
        let table = IssTable::from_payload(page, "history")
            .map_err(|e| upstream(format!("{ticker} page {page_no}: {e}")))?;
        for row in &table.data {
            let trade_date = date(row, TRADE_DATE_COLUMN)?
                .ok_or_else(|| upstream(format!("{ticker}: history row without a trade date")))?;
            points.push(PricePoint {
                trade_date,
                close_price: float(row, CLOSE_COLUMN)?,
            });
        }
    }

    let series = HistoricalPriceSeries::new(ticker, points);
    series.validate()?;
    tracing::debug!(
        ticker,
        pages = pages.len(),
        days = series.points.len(),
        priced = series.priced_len(),
        "parsed ISS history"
    );
    Ok(series)
}
