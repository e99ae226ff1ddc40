use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::{Money, Percent};

/// Fair value relative to the market price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationVerdict {
    /// Fair value above the market price.
    Undervalued,
    FairlyPriced,
    /// Fair value below the market price.
    Overvalued,
}

/// Yield to maturity relative to the investor's target rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractivenessVerdict {
    AboveTarget,
    AtTarget,
    BelowTarget,
}

/// Qualitative verdict on a bond valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conclusion {
    pub valuation: ValuationVerdict,
    pub attractiveness: AttractivenessVerdict,
    pub text: String,
    /// The conclusion is not individualized investment advice. Always set.
    pub disclaimer: bool,
}

pub const DISCLAIMER_TEXT: &str =
    "This is not an individual investment recommendation.";

pub fn valuation_verdict(fair_value: Money, market_price: Money) -> ValuationVerdict {
    match fair_value.cmp(&market_price) {
        Ordering::Greater => ValuationVerdict::Undervalued,
        Ordering::Equal => ValuationVerdict::FairlyPriced,
        Ordering::Less => ValuationVerdict::Overvalued,
    }
}

pub fn attractiveness_verdict(ytm: Percent, target_rate: Percent) -> AttractivenessVerdict {
    match ytm.cmp(&target_rate) {
        Ordering::Greater => AttractivenessVerdict::AboveTarget,
        Ordering::Equal => AttractivenessVerdict::AtTarget,
        Ordering::Less => AttractivenessVerdict::BelowTarget,
    }
}

/// Classify fair value against price and YTM against the target rate, and
/// render the verdict pair as text.
pub fn compose_conclusion(
    fair_value: Money,
    market_price: Money,
    ytm: Percent,
    target_rate: Percent,
) -> Conclusion {
    let valuation = valuation_verdict(fair_value, market_price);
    let attractiveness = attractiveness_verdict(ytm, target_rate);

    let valuation_text = match valuation {
        ValuationVerdict::Undervalued => format!(
            "At a {target_rate}% discount rate the fair value {fair_value} exceeds the market price {market_price}: the bond looks undervalued."
        ),
        ValuationVerdict::FairlyPriced => format!(
            "At a {target_rate}% discount rate the fair value equals the market price {market_price}: the bond is fairly priced."
        ),
        ValuationVerdict::Overvalued => format!(
            "At a {target_rate}% discount rate the fair value {fair_value} is below the market price {market_price}: the bond looks overvalued."
        ),
    };
    let attractiveness_text = match attractiveness {
        AttractivenessVerdict::AboveTarget => format!(
            "Its yield to maturity of {ytm}% is above the target rate, so holding to maturity beats the target."
        ),
        AttractivenessVerdict::AtTarget => format!(
            "Its yield to maturity of {ytm}% matches the target rate."
        ),
        AttractivenessVerdict::BelowTarget => format!(
            "Its yield to maturity of {ytm}% is below the target rate, so holding to maturity falls short of the target."
        ),
    };

    Conclusion {
        valuation,
        attractiveness,
        text: format!("{valuation_text} {attractiveness_text} {DISCLAIMER_TEXT}"),
        disclaimer: true,
    }
}
