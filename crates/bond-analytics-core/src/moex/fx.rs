use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BondAnalyticsError;
use crate::types::Money;
use crate::BondAnalyticsResult;

/// ISS code of the settlement currency.
pub const SETTLEMENT_CURRENCY: &str = "SUR";

/// Exchange rates into the settlement currency, keyed by ISS currency code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FxRates {
    rates: BTreeMap<String, Decimal>,
}

impl Default for FxRates {
    fn default() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(SETTLEMENT_CURRENCY.to_string(), Decimal::ONE);
        Self { rates }
    }
}

/// One `Valute` record of the Bank of Russia daily rates feed, decoded from
/// its XML. `Value` is roubles per `Nominal` units, written with a decimal
/// comma.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CbrQuote {
    #[serde(rename = "CharCode")]
    pub char_code: String,
    #[serde(rename = "Nominal", default = "unit_nominal")]
    pub nominal: u32,
    #[serde(rename = "Value")]
    pub value: String,
}

fn unit_nominal() -> u32 {
    1
}

impl FxRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table from the central bank's daily quotes, plus SUR = 1.
    pub fn from_cbr_quotes(quotes: &[CbrQuote]) -> BondAnalyticsResult<Self> {
        let mut fx = Self::new();
        for quote in quotes {
            if quote.nominal == 0 {
                return Err(BondAnalyticsError::UpstreamData(format!(
                    "CBR quote for {} has zero nominal",
                    quote.char_code
                )));
            }
            let value = Decimal::from_str(&quote.value.trim().replace(',', ".")).map_err(|e| {
                BondAnalyticsError::UpstreamData(format!(
                    "CBR quote for {}: '{}' is not a number: {e}",
                    quote.char_code, quote.value
                ))
            })?;
            fx.rates
                .insert(quote.char_code.clone(), value / Decimal::from(quote.nominal));
        }
        Ok(fx)
    }

    /// Accepts either a code-to-rate object or a list of CBR quotes.
    pub fn from_json(value: &Value) -> BondAnalyticsResult<Self> {
        match value {
            Value::Array(_) => {
                let quotes: Vec<CbrQuote> = serde_json::from_value(value.clone())?;
                Self::from_cbr_quotes(&quotes)
            }
            _ => Ok(serde_json::from_value(value.clone())?),
        }
    }

    pub fn with_rate(mut self, code: impl Into<String>, rate: Decimal) -> Self {
        self.rates.insert(code.into(), rate);
        self
    }

    /// Rate for `code`. The settlement currency is always 1 even if a
    /// deserialized table omits it.
    pub fn rate(&self, code: &str) -> Option<Decimal> {
        match self.rates.get(code) {
            Some(rate) => Some(*rate),
            None if code == SETTLEMENT_CURRENCY => Some(Decimal::ONE),
            None => None,
        }
    }

    /// Convert `amount` quoted in `code`. Unknown currencies and zero
    /// amounts have no settlement value.
    pub fn convert(&self, amount: Decimal, code: &str) -> Option<Money> {
        if amount.is_zero() {
            return None;
        }
        self.rate(code).map(|rate| amount * rate)
    }
}
