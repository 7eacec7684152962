use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PricingError;
use crate::options::{MarketParams, OptionElement, OptionKind};
use crate::products::structured::{
    StructuredProduct, DELTA_BUMP_FRACTION, GAMMA_BUMP_FRACTION, THETA_STEP, VEGA_BUMP,
};
use crate::strategies::{StrategySpec, StrategyTerms};
use crate::types::*;
use crate::PricingResult;

const MAX_PROFILE_STEPS: u32 = 10_000;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegInput {
    pub kind: OptionKind,
    pub strike: Money,
    pub time_to_expiry: Years,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Spot grid evaluated in one array query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRange {
    pub low: Money,
    pub high: Money,
    #[serde(default = "default_profile_steps")]
    pub steps: u32,
}

fn default_profile_steps() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInput {
    pub legs: Vec<LegInput>,
    #[serde(default)]
    pub market: MarketParams,
    pub spot: Spot,
    #[serde(default)]
    pub valuation_time: Years,
    #[serde(default)]
    pub profile: Option<ProfileRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInput {
    #[serde(flatten)]
    pub spec: StrategySpec,
    #[serde(default)]
    pub terms: StrategyTerms,
    pub spot: Spot,
    #[serde(default)]
    pub valuation_time: Years,
    #[serde(default)]
    pub profile: Option<ProfileRange>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilePoint {
    pub spot: Money,
    pub price: Money,
    pub intrinsic_value: Money,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAnalysis {
    pub product_name: String,
    pub leg_count: usize,
    pub earliest_expiry: Years,
    pub valuation_time: Years,
    pub spot: Spot,
    pub price: Spot,
    pub delta: Spot,
    pub gamma: Spot,
    pub theta: Spot,
    pub vega: Spot,
    pub intrinsic_value: Spot,
    pub time_value: Spot,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub profile: Vec<ProfilePoint>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ProductInput {
    pub fn build(&self) -> PricingResult<StructuredProduct> {
        let legs = self
            .legs
            .iter()
            .map(|l| {
                OptionElement::with_market(l.kind, l.strike, l.time_to_expiry, self.market)
                    .map(|e| (e, l.weight))
            })
            .collect::<PricingResult<Vec<_>>>()?;
        StructuredProduct::from_legs(legs, self.market)
    }
}

fn profile_grid(range: &ProfileRange) -> PricingResult<Vec<Money>> {
    if !range.low.is_finite() || range.low < 0.0 {
        return Err(PricingError::input("profile.low", "must be non-negative"));
    }
    if !range.high.is_finite() || range.high <= range.low {
        return Err(PricingError::input("profile.high", "must exceed profile.low"));
    }
    if range.steps == 0 || range.steps > MAX_PROFILE_STEPS {
        return Err(PricingError::input(
            "profile.steps",
            format!("must be between 1 and {MAX_PROFILE_STEPS}"),
        ));
    }
    let step = (range.high - range.low) / f64::from(range.steps);
    Ok((0..=range.steps)
        .map(|i| range.low + step * f64::from(i))
        .collect())
}

fn build_profile(
    product: &mut StructuredProduct,
    range: &ProfileRange,
    valuation_time: Years,
    warnings: &mut Vec<String>,
) -> PricingResult<Vec<ProfilePoint>> {
    let grid = profile_grid(range)?;
    // Spot greeks have no finite-difference step at zero.
    let usable: Vec<Money> = grid.into_iter().filter(|s| *s > 0.0).collect();
    if usable.len() < range.steps as usize + 1 {
        warnings.push("Profile point at zero spot skipped (no finite-difference step)".into());
    }

    let spot = Spot::Array(usable);
    let greeks = product.greeks(&spot, valuation_time)?;
    let intrinsic = product.intrinsic(&spot);

    Ok(spot
        .values()
        .iter()
        .enumerate()
        .map(|(i, s)| ProfilePoint {
            spot: *s,
            price: greeks.price.values()[i],
            intrinsic_value: intrinsic.values()[i],
            delta: greeks.delta.values()[i],
            gamma: greeks.gamma.values()[i],
            theta: greeks.theta.values()[i],
            vega: greeks.vega.values()[i],
        })
        .collect())
}

fn analyze(
    mut product: StructuredProduct,
    product_name: &str,
    spot: &Spot,
    valuation_time: Years,
    profile: Option<&ProfileRange>,
    start: Instant,
) -> PricingResult<ComputationOutput<ProductAnalysis>> {
    let mut warnings = Vec::new();
    for (i, leg) in product.legs().iter().enumerate() {
        if leg.time_to_expiry() == valuation_time {
            warnings.push(format!(
                "Leg {i} expires at the valuation time; priced at intrinsic value"
            ));
        }
    }

    let greeks = product.greeks(spot, valuation_time)?;
    let intrinsic = product.intrinsic(spot);
    let time_value = greeks.price.zip_with(&intrinsic, |p, iv| p - iv);

    let profile_points = match profile {
        Some(range) => build_profile(&mut product, range, valuation_time, &mut warnings)?,
        None => Vec::new(),
    };

    let market = *product.market();
    let output = ProductAnalysis {
        product_name: product_name.to_string(),
        leg_count: product.len(),
        earliest_expiry: product.earliest_expiry(),
        valuation_time,
        spot: spot.clone(),
        price: greeks.price,
        delta: greeks.delta,
        gamma: greeks.gamma,
        theta: greeks.theta,
        vega: greeks.vega,
        intrinsic_value: intrinsic,
        time_value,
        profile: profile_points,
    };

    let assumptions = serde_json::json!({
        "model": "Black-Scholes (closed-form per leg)",
        "volatility": market.volatility,
        "int_rate": market.int_rate,
        "div_yield": market.div_yield,
        "delta_step": format!("spot * {DELTA_BUMP_FRACTION}"),
        "gamma_step": format!("spot * {GAMMA_BUMP_FRACTION}"),
        "theta_step_years": THETA_STEP,
        "vega_bump": VEGA_BUMP,
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Black-Scholes legs with finite-difference greeks",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn analyze_product(
    input: &ProductInput,
) -> PricingResult<ComputationOutput<ProductAnalysis>> {
    let start = Instant::now();
    let product = input.build()?;
    analyze(
        product,
        "Custom",
        &input.spot,
        input.valuation_time,
        input.profile.as_ref(),
        start,
    )
}

pub fn analyze_strategy(
    input: &StrategyInput,
) -> PricingResult<ComputationOutput<ProductAnalysis>> {
    let start = Instant::now();
    let product = input.spec.build(&input.terms)?;
    analyze(
        product,
        input.spec.name(),
        &input.spot,
        input.valuation_time,
        input.profile.as_ref(),
        start,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
