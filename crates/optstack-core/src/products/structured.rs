use serde::{Deserialize, Serialize};
use std::ops::Deref;

use crate::error::PricingError;
use crate::options::{MarketParams, OptionElement};
use crate::types::*;
use crate::PricingResult;

/// Delta spot step as a fraction of spot.
pub const DELTA_BUMP_FRACTION: f64 = 1.0 / 1000.0;
/// Gamma spot step as a fraction of spot.
pub const GAMMA_BUMP_FRACTION: f64 = 1.0 / 100.0;
/// Theta step: one trading day.
pub const THETA_STEP: Years = 1.0 / 250.0;
/// Vega step: one basis point of volatility.
pub const VEGA_BUMP: Rate = 0.0001;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Weighted collection of option legs priced under one set of market
/// parameters.
///
/// The product holds the canonical volatility, rate and yield and pushes them
/// into every leg at construction, on [`StructuredProduct::set_market`] and
/// after each vega bump.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredProduct {
    elements: Vec<OptionElement>,
    weights: Vec<f64>,
    market: MarketParams,
}

/// Price and finite-difference greeks, each shaped like the spot input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductGreeks {
    pub price: Spot,
    pub delta: Spot,
    pub gamma: Spot,
    pub theta: Spot,
    pub vega: Spot,
}

// ---------------------------------------------------------------------------
// Volatility bump guard
// ---------------------------------------------------------------------------

/// Every leg's volatility shifted by a constant while the guard lives.
/// Dropping it re-synchronises the legs with the product, on every exit path.
struct VolatilityBump<'a> {
    product: &'a mut StructuredProduct,
}

impl<'a> VolatilityBump<'a> {
    fn apply(product: &'a mut StructuredProduct, dv: Rate) -> Self {
        for element in &mut product.elements {
            element.bump_volatility(dv);
        }
        Self { product }
    }
}

impl Deref for VolatilityBump<'_> {
    type Target = StructuredProduct;

    fn deref(&self) -> &StructuredProduct {
        &*self.product
    }
}

impl Drop for VolatilityBump<'_> {
    fn drop(&mut self) {
        self.product.reset_parameters();
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Per-point spot step for the spot greeks. Zero spot has no usable step.
fn spot_steps(spot: &Spot, fraction: f64, context: &str) -> PricingResult<Spot> {
    spot.try_map(|s| {
        if s == 0.0 {
            Err(PricingError::degeneracy(
                context,
                "zero spot gives a zero finite-difference step",
            ))
        } else {
            Ok(s * fraction)
        }
    })
}

fn shifted(spot: &Spot, steps: &Spot, multiple: f64) -> Spot {
    spot.zip_with(steps, |s, ds| s + multiple * ds)
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl StructuredProduct {
    pub fn new(
        elements: Vec<OptionElement>,
        weights: Vec<f64>,
        market: MarketParams,
    ) -> PricingResult<Self> {
        if elements.is_empty() {
            return Err(PricingError::parameter(
                "elements",
                "at least one leg is required",
            ));
        }
        if elements.len() != weights.len() {
            return Err(PricingError::parameter(
                "weights",
                format!("{} weights for {} legs", weights.len(), elements.len()),
            ));
        }
        for (i, w) in weights.iter().enumerate() {
            if !w.is_finite() {
                return Err(PricingError::parameter(
                    "weights",
                    format!("weight {i} must be finite"),
                ));
            }
            if *w == 0.0 {
                return Err(PricingError::parameter(
                    "weights",
                    format!("weight {i} cannot be zero"),
                ));
            }
        }
        market.validate()?;

        let mut product = Self {
            elements,
            weights,
            market,
        };
        product.reset_parameters();
        tracing::debug!(
            legs = product.elements.len(),
            volatility = market.volatility,
            int_rate = market.int_rate,
            div_yield = market.div_yield,
            "structured product built"
        );
        Ok(product)
    }

    /// Build from `(leg, weight)` pairs.
    pub fn from_legs(
        legs: impl IntoIterator<Item = (OptionElement, f64)>,
        market: MarketParams,
    ) -> PricingResult<Self> {
        let (elements, weights): (Vec<_>, Vec<_>) = legs.into_iter().unzip();
        Self::new(elements, weights, market)
    }

    pub fn legs(&self) -> &[OptionElement] {
        &self.elements
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn market(&self) -> &MarketParams {
        &self.market
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always false: construction requires at least one leg.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Shortest time to expiry across the legs. Valuation times beyond it
    /// are rejected.
    pub fn earliest_expiry(&self) -> Years {
        self.elements
            .iter()
            .map(OptionElement::time_to_expiry)
            .fold(f64::INFINITY, f64::min)
    }

    /// Replace the canonical market parameters and push them into every leg.
    pub fn set_market(&mut self, market: MarketParams) -> PricingResult<()> {
        market.validate()?;
        self.market = market;
        self.reset_parameters();
        tracing::debug!(
            volatility = market.volatility,
            int_rate = market.int_rate,
            div_yield = market.div_yield,
            "market parameters updated"
        );
        Ok(())
    }

    fn reset_parameters(&mut self) {
        let market = self.market;
        for element in &mut self.elements {
            element.configure(market);
        }
    }

    // -----------------------------------------------------------------------
    // Pricing
    // -----------------------------------------------------------------------

    /// Weighted sum of leg prices, shaped like `spot`.
    pub fn price(&self, spot: &Spot, valuation_time: Years) -> PricingResult<Spot> {
        let mut total = spot.zeros_like();
        for (element, weight) in self.elements.iter().zip(&self.weights) {
            let leg = element.price(spot, valuation_time)?;
            total = total.zip_with(&leg, |acc, p| acc + weight * p);
        }
        Ok(total)
    }

    /// Weighted payoff at expiry, shaped like `spot`.
    pub fn intrinsic(&self, spot: &Spot) -> Spot {
        spot.map(|s| {
            self.elements
                .iter()
                .zip(&self.weights)
                .fold(0.0, |acc, (element, weight)| {
                    acc + weight * element.intrinsic_value(s)
                })
        })
    }

    // -----------------------------------------------------------------------
    // Greeks (finite differences)
    // -----------------------------------------------------------------------

    /// Forward difference in spot with step spot/1000.
    pub fn delta(&self, spot: &Spot, valuation_time: Years) -> PricingResult<Spot> {
        tracing::debug!(points = spot.len(), valuation_time, "computing delta");
        let ds = spot_steps(spot, DELTA_BUMP_FRACTION, "delta")?;
        let p0 = self.price(spot, valuation_time)?;
        let p1 = self.price(&shifted(spot, &ds, 1.0), valuation_time)?;
        let diff = p1.zip_with(&p0, |up, base| up - base);
        Ok(diff.zip_with(&ds, |d, h| d / h))
    }

    /// Three-point forward second difference with step spot/100.
    pub fn gamma(&self, spot: &Spot, valuation_time: Years) -> PricingResult<Spot> {
        tracing::debug!(points = spot.len(), valuation_time, "computing gamma");
        let ds = spot_steps(spot, GAMMA_BUMP_FRACTION, "gamma")?;
        let p0 = self.price(spot, valuation_time)?;
        let p1 = self.price(&shifted(spot, &ds, 1.0), valuation_time)?;
        let p2 = self.price(&shifted(spot, &ds, 2.0), valuation_time)?;
        let second = p2
            .zip_with(&p1, |two, one| two - 2.0 * one)
            .zip_with(&p0, |acc, base| acc + base);
        Ok(second.zip_with(&ds, |d, h| d / (h * h)))
    }

    /// Change in value over the trading day ending at `valuation_time`, per
    /// year.
    pub fn theta(&self, spot: &Spot, valuation_time: Years) -> PricingResult<Spot> {
        tracing::debug!(points = spot.len(), valuation_time, "computing theta");
        let p_now = self.price(spot, valuation_time)?;
        let p_before = self.price(spot, valuation_time - THETA_STEP)?;
        Ok(p_now.zip_with(&p_before, |now, before| (now - before) / THETA_STEP))
    }

    /// Forward difference in volatility with a one basis point bump on every
    /// leg. Takes the product exclusively for the whole batch; the legs are
    /// re-synchronised before this returns, whether or not pricing failed.
    pub fn vega(&mut self, spot: &Spot, valuation_time: Years) -> PricingResult<Spot> {
        tracing::debug!(points = spot.len(), valuation_time, "computing vega");
        let p0 = self.price(spot, valuation_time)?;
        let p1 = {
            let bumped = VolatilityBump::apply(self, VEGA_BUMP);
            bumped.price(spot, valuation_time)?
        };
        Ok(p1.zip_with(&p0, |up, base| (up - base) / VEGA_BUMP))
    }

    /// Price and all four greeks at the same spot and time.
    pub fn greeks(&mut self, spot: &Spot, valuation_time: Years) -> PricingResult<ProductGreeks> {
        Ok(ProductGreeks {
            price: self.price(spot, valuation_time)?,
            delta: self.delta(spot, valuation_time)?,
            gamma: self.gamma(spot, valuation_time)?,
            theta: self.theta(spot, valuation_time)?,
            vega: self.vega(spot, valuation_time)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::element::norm_cdf;
    use crate::options::OptionKind;
    use pretty_assertions::assert_eq;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn textbook_market() -> MarketParams {
        MarketParams::new(0.20, 0.05, 0.0).unwrap()
    }

    fn single_call() -> StructuredProduct {
        let call = OptionElement::new(OptionKind::Call, 100.0, 1.0).unwrap();
        StructuredProduct::new(vec![call], vec![1.0], textbook_market()).unwrap()
    }

    fn straddle() -> StructuredProduct {
        let call = OptionElement::new(OptionKind::Call, 100.0, 0.5).unwrap();
        let put = OptionElement::new(OptionKind::Put, 100.0, 0.5).unwrap();
        StructuredProduct::new(vec![call, put], vec![1.0, 1.0], MarketParams::default()).unwrap()
    }

    fn scalar(s: Spot) -> f64 {
        s.as_scalar().unwrap()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn test_mismatched_weights_rejected() {
        let call = OptionElement::new(OptionKind::Call, 100.0, 1.0).unwrap();
        let err = StructuredProduct::new(vec![call], vec![1.0, -1.0], MarketParams::default())
            .unwrap_err();
        assert!(matches!(err, PricingError::InvalidParameter { .. }));
    }

    #[test]
    fn test_zero_weight_rejected() {
        let call = OptionElement::new(OptionKind::Call, 100.0, 1.0).unwrap();
        let put = OptionElement::new(OptionKind::Put, 100.0, 1.0).unwrap();
        let err = StructuredProduct::new(vec![call, put], vec![1.0, 0.0], MarketParams::default())
            .unwrap_err();
        match err {
            PricingError::InvalidParameter { field, reason } => {
                assert_eq!(field, "weights");
                assert!(reason.contains("weight 1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_product_rejected() {
        assert!(StructuredProduct::new(vec![], vec![], MarketParams::default()).is_err());
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let call = OptionElement::new(OptionKind::Call, 100.0, 1.0).unwrap();
        let result = StructuredProduct::new(vec![call], vec![f64::NAN], MarketParams::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_construction_synchronises_legs() {
        let own = MarketParams::new(0.9, 0.2, 0.1).unwrap();
        let call = OptionElement::with_market(OptionKind::Call, 100.0, 1.0, own).unwrap();
        let product = StructuredProduct::new(vec![call], vec![2.0], textbook_market()).unwrap();
        assert_eq!(*product.legs()[0].market(), textbook_market());
    }

    #[test]
    fn test_set_market_resynchronises_legs() {
        let mut product = straddle();
        let new_market = MarketParams::new(0.4, 0.01, 0.0).unwrap();
        product.set_market(new_market).unwrap();
        assert_eq!(*product.market(), new_market);
        for leg in product.legs() {
            assert_eq!(*leg.market(), new_market);
        }
    }

    #[test]
    fn test_set_market_rejects_invalid_and_keeps_state() {
        let mut product = straddle();
        let bad = MarketParams {
            volatility: -0.1,
            ..MarketParams::default()
        };
        assert!(product.set_market(bad).is_err());
        assert_eq!(*product.market(), MarketParams::default());
    }

    #[test]
    fn test_from_legs_and_earliest_expiry() {
        let near = OptionElement::new(OptionKind::Call, 100.0, 0.125).unwrap();
        let far = OptionElement::new(OptionKind::Call, 100.0, 0.25).unwrap();
        let product =
            StructuredProduct::from_legs([(near, -1.0), (far, 1.0)], MarketParams::default())
                .unwrap();
        assert_eq!(product.len(), 2);
        assert_eq!(product.weights(), &[-1.0, 1.0]);
        assert_eq!(product.earliest_expiry(), 0.125);
    }

    // -----------------------------------------------------------------------
    // Pricing
    // -----------------------------------------------------------------------

    #[test]
    fn test_price_is_weighted_sum() {
        let product = straddle();
        let spot = Spot::from(95.0);
        let expected: f64 = product
            .legs()
            .iter()
            .zip(product.weights())
            .map(|(leg, w)| w * leg.price_at(95.0, 0.1).unwrap())
            .sum();
        assert!(approx_eq(scalar(product.price(&spot, 0.1).unwrap()), expected, 1e-12));
    }

    #[test]
    fn test_fractional_short_weights() {
        let call = OptionElement::new(OptionKind::Call, 100.0, 1.0).unwrap();
        let single =
            StructuredProduct::new(vec![call.clone()], vec![1.0], MarketParams::default()).unwrap();
        let scaled =
            StructuredProduct::new(vec![call], vec![-0.5], MarketParams::default()).unwrap();
        let spot = Spot::from(100.0);
        let a = scalar(single.price(&spot, 0.0).unwrap());
        let b = scalar(scaled.price(&spot, 0.0).unwrap());
        assert!(approx_eq(b, -0.5 * a, 1e-12));
    }

    #[test]
    fn test_price_past_expiry_rejected() {
        let err = straddle().price(&Spot::from(100.0), 0.6).unwrap_err();
        assert!(matches!(err, PricingError::InvalidInput { .. }));
    }

    #[test]
    fn test_intrinsic_weighted_payoff() {
        let out = straddle().intrinsic(&Spot::from([90.0, 100.0, 115.0]));
        assert_eq!(out, Spot::Array(vec![10.0, 0.0, 15.0]));
    }

    // -----------------------------------------------------------------------
    // Greeks against closed form
    // -----------------------------------------------------------------------

    #[test]
    fn test_delta_close_to_closed_form() {
        // d1 = (0.05 + 0.02) / 0.2 = 0.35
        let delta = scalar(single_call().delta(&Spot::from(100.0), 0.0).unwrap());
        assert!(approx_eq(delta, norm_cdf(0.35), 5e-3), "delta {delta}");
    }

    #[test]
    fn test_gamma_close_to_closed_form() {
        // n(0.35) / (S * sigma * sqrt(T)) ~ 0.01876
        let gamma = scalar(single_call().gamma(&Spot::from(100.0), 0.0).unwrap());
        assert!(approx_eq(gamma, 0.01876, 1.5e-3), "gamma {gamma}");
    }

    #[test]
    fn test_vega_close_to_closed_form() {
        // S * n(0.35) * sqrt(T) ~ 37.524
        let mut product = single_call();
        let vega = scalar(product.vega(&Spot::from(100.0), 0.0).unwrap());
        assert!(approx_eq(vega, 37.524, 0.05), "vega {vega}");
    }

    #[test]
    fn test_theta_close_to_closed_form() {
        // -S n(d1) sigma / (2 sqrt(T)) - r K e^(-rT) N(d2) ~ -6.414
        let theta = scalar(single_call().theta(&Spot::from(100.0), 0.0).unwrap());
        assert!(approx_eq(theta, -6.414, 0.05), "theta {theta}");
    }

    #[test]
    fn test_zero_spot_delta_is_degenerate() {
        let err = single_call().delta(&Spot::from(0.0), 0.0).unwrap_err();
        assert!(matches!(err, PricingError::NumericDegeneracy { .. }));
        let err = single_call()
            .gamma(&Spot::from([100.0, 0.0]), 0.0)
            .unwrap_err();
        assert!(matches!(err, PricingError::NumericDegeneracy { .. }));
    }

    #[test]
    fn test_negative_spot_delta_is_invalid_input() {
        let err = single_call().delta(&Spot::from(-10.0), 0.0).unwrap_err();
        assert!(matches!(err, PricingError::InvalidInput { .. }));
    }

    // -----------------------------------------------------------------------
    // Vega bump scope
    // -----------------------------------------------------------------------

    #[test]
    fn test_vega_restores_state() {
        let mut product = straddle();
        let before = product.clone();
        product.vega(&Spot::from([90.0, 100.0]), 0.1).unwrap();
        assert_eq!(product, before);
    }

    #[test]
    fn test_vega_rejected_spot_leaves_product_unchanged() {
        let mut product = straddle();
        let before = product.clone();
        assert!(product.vega(&Spot::from(-1.0), 0.0).is_err());
        assert_eq!(product, before);
    }

    #[test]
    fn test_bump_guard_restores_on_early_return() {
        fn price_under_bump(product: &mut StructuredProduct) -> PricingResult<Spot> {
            let bumped = VolatilityBump::apply(product, 0.5);
            assert!(approx_eq(bumped.legs()[0].market().volatility, 0.75, 1e-12));
            bumped.price(&Spot::from(-1.0), 0.0)
        }

        let mut product = straddle();
        assert!(price_under_bump(&mut product).is_err());
        for leg in product.legs() {
            assert_eq!(leg.market().volatility, 0.25);
        }
    }

    #[test]
    fn test_bump_guard_restores_on_panic() {
        let mut product = straddle();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _bumped = VolatilityBump::apply(&mut product, 0.5);
            panic!("pricing blew up");
        }));
        assert!(result.is_err());
        for leg in product.legs() {
            assert_eq!(leg.market().volatility, 0.25);
        }
    }

    #[test]
    fn test_greeks_bundle_shapes() {
        let mut product = straddle();
        let g = product.greeks(&Spot::from([95.0, 100.0, 105.0]), 0.0).unwrap();
        for s in [&g.price, &g.delta, &g.gamma, &g.theta, &g.vega] {
            assert_eq!(s.len(), 3);
            assert!(!s.is_scalar());
        }
    }
}
