use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::types::Rate;
use crate::PricingResult;

pub const DEFAULT_VOLATILITY: Rate = 0.25;
pub const DEFAULT_INT_RATE: Rate = 0.05;
pub const DEFAULT_DIV_YIELD: Rate = 0.025;

/// Market parameters shared by every leg of a product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParams {
    /// Annualised volatility of the underlying.
    pub volatility: Rate,
    /// Risk-free rate, continuously compounded.
    pub int_rate: Rate,
    /// Dividend yield, continuously compounded.
    pub div_yield: Rate,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            volatility: DEFAULT_VOLATILITY,
            int_rate: DEFAULT_INT_RATE,
            div_yield: DEFAULT_DIV_YIELD,
        }
    }
}

impl MarketParams {
    pub fn new(volatility: Rate, int_rate: Rate, div_yield: Rate) -> PricingResult<Self> {
        let params = Self {
            volatility,
            int_rate,
            div_yield,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> PricingResult<()> {
        check_non_negative("volatility", self.volatility)?;
        check_non_negative("int_rate", self.int_rate)?;
        check_non_negative("div_yield", self.div_yield)?;
        Ok(())
    }
}

/// Construction-time guard shared by elements, products and strategies.
pub(crate) fn check_non_negative(field: &str, value: f64) -> PricingResult<()> {
    if !value.is_finite() {
        return Err(PricingError::parameter(field, "must be finite"));
    }
    if value < 0.0 {
        return Err(PricingError::parameter(field, "must be non-negative"));
    }
    Ok(())
}
