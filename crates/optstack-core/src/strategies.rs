use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::options::{MarketParams, OptionElement, OptionKind};
use crate::products::StructuredProduct;
use crate::types::*;
use crate::PricingResult;

pub const DEFAULT_TIME_TO_EXPIRY: Years = 0.125;
pub const DEFAULT_FAR_TIME_TO_EXPIRY: Years = 0.25;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Expiry and market shared by every leg a builder creates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyTerms {
    pub time_to_expiry: Years,
    pub market: MarketParams,
}

impl Default for StrategyTerms {
    fn default() -> Self {
        Self {
            time_to_expiry: DEFAULT_TIME_TO_EXPIRY,
            market: MarketParams::default(),
        }
    }
}

/// A named strategy and its strikes, as read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategySpec {
    SyntheticForward {
        forward_price: Money,
    },
    BullSpread {
        lower_strike: Money,
        upper_strike: Money,
    },
    BearSpread {
        lower_strike: Money,
        upper_strike: Money,
    },
    Straddle {
        strike: Money,
    },
    Strangle {
        lower_strike: Money,
        upper_strike: Money,
    },
    Butterfly {
        width: Money,
        center_strike: Money,
    },
    Condor {
        width: Money,
        lower_strike: Money,
        upper_strike: Money,
    },
    CallChristmasTree {
        lower_strike: Money,
        center_strike: Money,
        upper_strike: Money,
    },
    PutChristmasTree {
        lower_strike: Money,
        center_strike: Money,
        upper_strike: Money,
    },
    /// Ignores `StrategyTerms::time_to_expiry`; each leg has its own expiry.
    CalendarSpread {
        strike: Money,
        #[serde(default = "default_near_expiry")]
        near_time_to_expiry: Years,
        #[serde(default = "default_far_expiry")]
        far_time_to_expiry: Years,
    },
}

fn default_near_expiry() -> Years {
    DEFAULT_TIME_TO_EXPIRY
}

fn default_far_expiry() -> Years {
    DEFAULT_FAR_TIME_TO_EXPIRY
}

impl StrategySpec {
    pub fn name(&self) -> &'static str {
        match self {
            StrategySpec::SyntheticForward { .. } => "Synthetic Forward",
            StrategySpec::BullSpread { .. } => "Bull Spread",
            StrategySpec::BearSpread { .. } => "Bear Spread",
            StrategySpec::Straddle { .. } => "Straddle",
            StrategySpec::Strangle { .. } => "Strangle",
            StrategySpec::Butterfly { .. } => "Butterfly",
            StrategySpec::Condor { .. } => "Condor",
            StrategySpec::CallChristmasTree { .. } => "Call Christmas Tree",
            StrategySpec::PutChristmasTree { .. } => "Put Christmas Tree",
            StrategySpec::CalendarSpread { .. } => "Calendar Spread",
        }
    }

    pub fn build(&self, terms: &StrategyTerms) -> PricingResult<StructuredProduct> {
        match *self {
            StrategySpec::SyntheticForward { forward_price } => {
                synthetic_forward(forward_price, terms)
            }
            StrategySpec::BullSpread {
                lower_strike,
                upper_strike,
            } => bull_spread(lower_strike, upper_strike, terms),
            StrategySpec::BearSpread {
                lower_strike,
                upper_strike,
            } => bear_spread(lower_strike, upper_strike, terms),
            StrategySpec::Straddle { strike } => straddle(strike, terms),
            StrategySpec::Strangle {
                lower_strike,
                upper_strike,
            } => strangle(lower_strike, upper_strike, terms),
            StrategySpec::Butterfly {
                width,
                center_strike,
            } => butterfly(width, center_strike, terms),
            StrategySpec::Condor {
                width,
                lower_strike,
                upper_strike,
            } => condor(width, lower_strike, upper_strike, terms),
            StrategySpec::CallChristmasTree {
                lower_strike,
                center_strike,
                upper_strike,
            } => call_christmas_tree(lower_strike, center_strike, upper_strike, terms),
            StrategySpec::PutChristmasTree {
                lower_strike,
                center_strike,
                upper_strike,
            } => put_christmas_tree(lower_strike, center_strike, upper_strike, terms),
            StrategySpec::CalendarSpread {
                strike,
                near_time_to_expiry,
                far_time_to_expiry,
            } => calendar_spread(strike, near_time_to_expiry, far_time_to_expiry, &terms.market),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_ordered(
    lower_field: &str,
    lower: f64,
    upper_field: &str,
    upper: f64,
) -> PricingResult<()> {
    if lower >= upper {
        return Err(PricingError::parameter(
            lower_field,
            format!("{lower_field} ({lower}) must be below {upper_field} ({upper})"),
        ));
    }
    Ok(())
}

fn check_width(width: f64) -> PricingResult<()> {
    if !width.is_finite() || width <= 0.0 {
        return Err(PricingError::parameter("width", "must be positive"));
    }
    Ok(())
}

fn leg(kind: OptionKind, strike: Money, terms: &StrategyTerms) -> PricingResult<OptionElement> {
    OptionElement::with_market(kind, strike, terms.time_to_expiry, terms.market)
}

fn assemble(
    legs: Vec<(OptionElement, f64)>,
    market: &MarketParams,
) -> PricingResult<StructuredProduct> {
    StructuredProduct::from_legs(legs, *market)
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Long call, short put at the forward price.
pub fn synthetic_forward(
    forward_price: Money,
    terms: &StrategyTerms,
) -> PricingResult<StructuredProduct> {
    assemble(
        vec![
            (leg(OptionKind::Call, forward_price, terms)?, 1.0),
            (leg(OptionKind::Put, forward_price, terms)?, -1.0),
        ],
        &terms.market,
    )
}

/// Long the lower call, short the upper call.
pub fn bull_spread(
    lower_strike: Money,
    upper_strike: Money,
    terms: &StrategyTerms,
) -> PricingResult<StructuredProduct> {
    check_ordered("lower_strike", lower_strike, "upper_strike", upper_strike)?;
    assemble(
        vec![
            (leg(OptionKind::Call, lower_strike, terms)?, 1.0),
            (leg(OptionKind::Call, upper_strike, terms)?, -1.0),
        ],
        &terms.market,
    )
}

/// Short the lower put, long the upper put.
pub fn bear_spread(
    lower_strike: Money,
    upper_strike: Money,
    terms: &StrategyTerms,
) -> PricingResult<StructuredProduct> {
    check_ordered("lower_strike", lower_strike, "upper_strike", upper_strike)?;
    assemble(
        vec![
            (leg(OptionKind::Put, lower_strike, terms)?, -1.0),
            (leg(OptionKind::Put, upper_strike, terms)?, 1.0),
        ],
        &terms.market,
    )
}

pub fn straddle(strike: Money, terms: &StrategyTerms) -> PricingResult<StructuredProduct> {
    assemble(
        vec![
            (leg(OptionKind::Call, strike, terms)?, 1.0),
            (leg(OptionKind::Put, strike, terms)?, 1.0),
        ],
        &terms.market,
    )
}

/// Long put at the lower strike, long call at the upper strike.
pub fn strangle(
    lower_strike: Money,
    upper_strike: Money,
    terms: &StrategyTerms,
) -> PricingResult<StructuredProduct> {
    check_ordered("lower_strike", lower_strike, "upper_strike", upper_strike)?;
    assemble(
        vec![
            (leg(OptionKind::Put, lower_strike, terms)?, 1.0),
            (leg(OptionKind::Call, upper_strike, terms)?, 1.0),
        ],
        &terms.market,
    )
}

/// Calls at center -/+ width/2 bought, two calls at the center sold.
pub fn butterfly(
    width: Money,
    center_strike: Money,
    terms: &StrategyTerms,
) -> PricingResult<StructuredProduct> {
    check_width(width)?;
    let half = width / 2.0;
    assemble(
        vec![
            (leg(OptionKind::Call, center_strike - half, terms)?, 1.0),
            (leg(OptionKind::Call, center_strike, terms)?, -2.0),
            (leg(OptionKind::Call, center_strike + half, terms)?, 1.0),
        ],
        &terms.market,
    )
}

/// Short put at the lower strike and short call at the upper strike, with
/// long wings width/2 further out.
pub fn condor(
    width: Money,
    lower_strike: Money,
    upper_strike: Money,
    terms: &StrategyTerms,
) -> PricingResult<StructuredProduct> {
    check_width(width)?;
    check_ordered("lower_strike", lower_strike, "upper_strike", upper_strike)?;
    let half = width / 2.0;
    assemble(
        vec![
            (leg(OptionKind::Put, lower_strike - half, terms)?, 1.0),
            (leg(OptionKind::Put, lower_strike, terms)?, -1.0),
            (leg(OptionKind::Call, upper_strike, terms)?, -1.0),
            (leg(OptionKind::Call, upper_strike + half, terms)?, 1.0),
        ],
        &terms.market,
    )
}

/// Long the lower call, short the center and upper calls.
pub fn call_christmas_tree(
    lower_strike: Money,
    center_strike: Money,
    upper_strike: Money,
    terms: &StrategyTerms,
) -> PricingResult<StructuredProduct> {
    check_ordered("lower_strike", lower_strike, "center_strike", center_strike)?;
    check_ordered("center_strike", center_strike, "upper_strike", upper_strike)?;
    assemble(
        vec![
            (leg(OptionKind::Call, lower_strike, terms)?, 1.0),
            (leg(OptionKind::Call, center_strike, terms)?, -1.0),
            (leg(OptionKind::Call, upper_strike, terms)?, -1.0),
        ],
        &terms.market,
    )
}

/// Short the lower and center puts, long the upper put.
pub fn put_christmas_tree(
    lower_strike: Money,
    center_strike: Money,
    upper_strike: Money,
    terms: &StrategyTerms,
) -> PricingResult<StructuredProduct> {
    check_ordered("lower_strike", lower_strike, "center_strike", center_strike)?;
    check_ordered("center_strike", center_strike, "upper_strike", upper_strike)?;
    assemble(
        vec![
            (leg(OptionKind::Put, lower_strike, terms)?, -1.0),
            (leg(OptionKind::Put, center_strike, terms)?, -1.0),
            (leg(OptionKind::Put, upper_strike, terms)?, 1.0),
        ],
        &terms.market,
    )
}

/// Short the near-dated call, long the far-dated call, same strike.
pub fn calendar_spread(
    strike: Money,
    near_time_to_expiry: Years,
    far_time_to_expiry: Years,
    market: &MarketParams,
) -> PricingResult<StructuredProduct> {
    check_ordered(
        "near_time_to_expiry",
        near_time_to_expiry,
        "far_time_to_expiry",
        far_time_to_expiry,
    )?;
    assemble(
        vec![
            (
                OptionElement::with_market(OptionKind::Call, strike, near_time_to_expiry, *market)?,
                -1.0,
            ),
            (
                OptionElement::with_market(OptionKind::Call, strike, far_time_to_expiry, *market)?,
                1.0,
            ),
        ],
        market,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
