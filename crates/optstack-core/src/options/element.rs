use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use std::fmt;
use std::str::FromStr;

use crate::error::PricingError;
use crate::options::market::{check_non_negative, MarketParams};
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Payoff sign: +1 for a call, -1 for a put.
    pub fn sign(self) -> f64 {
        match self {
            OptionKind::Call => 1.0,
            OptionKind::Put => -1.0,
        }
    }
}

impl FromStr for OptionKind {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(OptionKind::Call),
            "put" => Ok(OptionKind::Put),
            other => Err(PricingError::parameter(
                "kind",
                format!("'{other}' is not 'call' or 'put'"),
            )),
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Call => write!(f, "call"),
            OptionKind::Put => write!(f, "put"),
        }
    }
}

/// A single European call or put leg.
///
/// Kind, strike and expiry are fixed once built. The market parameters are
/// only rewritten by the product that owns the leg.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionElement {
    kind: OptionKind,
    sign: f64,
    strike: Money,
    time_to_expiry: Years,
    market: MarketParams,
}

// ---------------------------------------------------------------------------
// Normal CDF
// ---------------------------------------------------------------------------

/// Standard normal CDF: Phi(x) = erfc(-x / sqrt(2)) / 2
pub(crate) fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

fn check_spot(spot: f64) -> PricingResult<()> {
    if !spot.is_finite() {
        return Err(PricingError::input("spot", "must be finite"));
    }
    if spot < 0.0 {
        return Err(PricingError::input(
            "spot",
            format!("must be non-negative, got {spot}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Construction and accessors
// ---------------------------------------------------------------------------

impl OptionElement {
    /// Build a leg with the default market (25% vol, 5% rate, 2.5% yield).
    pub fn new(kind: OptionKind, strike: Money, time_to_expiry: Years) -> PricingResult<Self> {
        Self::with_market(kind, strike, time_to_expiry, MarketParams::default())
    }

    pub fn with_market(
        kind: OptionKind,
        strike: Money,
        time_to_expiry: Years,
        market: MarketParams,
    ) -> PricingResult<Self> {
        check_non_negative("strike", strike)?;
        check_non_negative("time_to_expiry", time_to_expiry)?;
        market.validate()?;
        Ok(Self {
            kind,
            sign: kind.sign(),
            strike,
            time_to_expiry,
            market,
        })
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    pub fn strike(&self) -> Money {
        self.strike
    }

    pub fn time_to_expiry(&self) -> Years {
        self.time_to_expiry
    }

    pub fn market(&self) -> &MarketParams {
        &self.market
    }

    /// Overwrite the market parameters. Only the owning product calls this.
    pub(crate) fn configure(&mut self, market: MarketParams) {
        self.market = market;
    }

    pub(crate) fn bump_volatility(&mut self, dv: Rate) {
        self.market.volatility += dv;
    }

    // -----------------------------------------------------------------------
    // Pricing
    // -----------------------------------------------------------------------

    /// Black-Scholes price at every spot value, `valuation_time` years after
    /// inception. The result has the shape of `spot`.
    pub fn price(&self, spot: &Spot, valuation_time: Years) -> PricingResult<Spot> {
        let remaining = self.remaining(valuation_time)?;
        tracing::trace!(
            kind = %self.kind,
            strike = self.strike,
            remaining,
            points = spot.len(),
            "pricing leg"
        );
        spot.try_map(|s| self.price_point(s, remaining))
    }

    /// Scalar convenience over [`OptionElement::price`].
    pub fn price_at(&self, spot: Money, valuation_time: Years) -> PricingResult<Money> {
        let remaining = self.remaining(valuation_time)?;
        self.price_point(spot, remaining)
    }

    /// Payoff at expiry: max(sign * (spot - strike), 0).
    pub fn intrinsic_value(&self, spot: Money) -> Money {
        (self.sign * (spot - self.strike)).max(0.0)
    }

    /// Years left to expiry at `valuation_time`.
    pub fn remaining(&self, valuation_time: Years) -> PricingResult<Years> {
        if !valuation_time.is_finite() {
            return Err(PricingError::input("valuation_time", "must be finite"));
        }
        if valuation_time > self.time_to_expiry {
            return Err(PricingError::input(
                "valuation_time",
                format!(
                    "{valuation_time} is past time_to_expiry {}",
                    self.time_to_expiry
                ),
            ));
        }
        Ok(self.time_to_expiry - valuation_time)
    }

    fn price_point(&self, spot: Money, remaining: Years) -> PricingResult<Money> {
        check_spot(spot)?;

        if remaining == 0.0 {
            return Ok(self.intrinsic_value(spot));
        }
        if self.strike == 0.0 {
            return Err(PricingError::degeneracy(
                "option_element.price",
                "zero strike before expiry leaves log-moneyness undefined",
            ));
        }

        let m = &self.market;
        let discount = (-m.int_rate * remaining).exp();
        let forward = spot * ((m.int_rate - m.div_yield) * remaining).exp();
        let total_vol = m.volatility * remaining.sqrt();

        let price = if spot == 0.0 || total_vol == 0.0 {
            // The terminal distribution collapses onto the forward.
            discount * (self.sign * (forward - self.strike)).max(0.0)
        } else {
            let d1 = (forward / self.strike).ln() / total_vol + 0.5 * total_vol;
            let d2 = d1 - total_vol;
            self.sign
                * discount
                * (forward * norm_cdf(self.sign * d1) - self.strike * norm_cdf(self.sign * d2))
        };

        if !price.is_finite() {
            return Err(PricingError::degeneracy(
                "option_element.price",
                format!("non-finite price at spot {spot}"),
            ));
        }
        Ok(price)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
