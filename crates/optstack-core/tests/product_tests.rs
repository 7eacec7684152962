use optstack_core::strategies::{self, StrategyTerms};
use optstack_core::{MarketParams, OptionElement, OptionKind, Spot, StructuredProduct};
use pretty_assertions::assert_eq;

// ===========================================================================
// Structured product properties: aggregation, greeks and state handling
// ===========================================================================

fn scalar(s: Spot) -> f64 {
    s.as_scalar().unwrap()
}

fn terms() -> StrategyTerms {
    StrategyTerms::default()
}

// ---------------------------------------------------------------------------
// Synthetic forward
// ---------------------------------------------------------------------------

#[test]
fn test_synthetic_forward_prices_discounted_carry() {
    let m = MarketParams::default();
    let mut fwd = strategies::synthetic_forward(100.0, &terms()).unwrap();
    let spot = Spot::from(100.0);
    let tau = 0.125;
    let expected = 100.0 * (-m.div_yield * tau).exp() - 100.0 * (-m.int_rate * tau).exp();
    let price = scalar(fwd.price(&spot, 0.0).unwrap());
    assert!((price - expected).abs() < 1e-9, "forward price {price}");

    let vega = scalar(fwd.vega(&spot, 0.0).unwrap());
    assert!(vega.abs() < 1e-6, "forward vega {vega}");
}

#[test]
fn test_synthetic_forward_independent_of_volatility() {
    let spot = Spot::from(100.0);
    let mut fwd = strategies::synthetic_forward(100.0, &terms()).unwrap();
    let base = scalar(fwd.price(&spot, 0.0).unwrap());
    fwd.set_market(MarketParams::new(0.8, 0.05, 0.025).unwrap())
        .unwrap();
    let high_vol = scalar(fwd.price(&spot, 0.0).unwrap());
    assert!((base - high_vol).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Straddle greek signs
// ---------------------------------------------------------------------------

#[test]
fn test_straddle_gamma_and_vega_positive() {
    let mut straddle = strategies::straddle(100.0, &terms()).unwrap();
    let spot = Spot::from([90.0, 95.0, 100.0, 105.0, 110.0]);
    for &t in &[0.0, 0.05, 0.1] {
        let gamma = straddle.gamma(&spot, t).unwrap();
        let vega = straddle.vega(&spot, t).unwrap();
        for (g, v) in gamma.values().iter().zip(vega.values()) {
            assert!(*g > 0.0, "gamma {g} at t={t}");
            assert!(*v > 0.0, "vega {v} at t={t}");
        }
    }
}

#[test]
fn test_straddle_theta_negative_near_expiry() {
    let straddle = strategies::straddle(100.0, &terms()).unwrap();
    let spot = Spot::from([98.0, 100.0, 102.0]);
    let theta = straddle.theta(&spot, 0.12).unwrap();
    for th in theta.values() {
        assert!(*th < 0.0, "theta {th}");
    }
}

// ---------------------------------------------------------------------------
// Shape preservation
// ---------------------------------------------------------------------------

#[test]
fn test_array_results_match_scalar_results() {
    let mut product = strategies::condor(10.0, 95.0, 105.0, &terms()).unwrap();
    let points = [85.0, 97.5, 100.0, 112.0];
    let spot = Spot::from(points);
    let t = 0.05;

    let prices = product.price(&spot, t).unwrap();
    let deltas = product.delta(&spot, t).unwrap();
    let gammas = product.gamma(&spot, t).unwrap();
    let thetas = product.theta(&spot, t).unwrap();
    let vegas = product.vega(&spot, t).unwrap();
    assert_eq!(prices.len(), points.len());

    for (i, s) in points.iter().enumerate() {
        let one = Spot::from(*s);
        assert_eq!(prices.values()[i], scalar(product.price(&one, t).unwrap()));
        assert_eq!(deltas.values()[i], scalar(product.delta(&one, t).unwrap()));
        assert_eq!(gammas.values()[i], scalar(product.gamma(&one, t).unwrap()));
        assert_eq!(thetas.values()[i], scalar(product.theta(&one, t).unwrap()));
        assert_eq!(vegas.values()[i], scalar(product.vega(&one, t).unwrap()));
    }
}

#[test]
fn test_empty_spot_array() {
    let product = strategies::straddle(100.0, &terms()).unwrap();
    let out = product.price(&Spot::Array(vec![]), 0.0).unwrap();
    assert_eq!(out, Spot::Array(vec![]));
}

// ---------------------------------------------------------------------------
// Bull spread scenario
// ---------------------------------------------------------------------------

#[test]
fn test_bull_spread_scenario() {
    let bull = strategies::bull_spread(95.0, 105.0, &terms()).unwrap();
    let spot = Spot::from(100.0);
    let price = scalar(bull.price(&spot, 0.0).unwrap());

    let lower_call = OptionElement::new(OptionKind::Call, 95.0, 0.125).unwrap();
    let lower_premium = lower_call.price_at(100.0, 0.0).unwrap();

    assert!(price > 0.0, "bull spread price {price}");
    assert!(price < 10.0, "bull spread price {price}");
    assert!(price < lower_premium, "{price} vs lower call {lower_premium}");
}

// ---------------------------------------------------------------------------
// Vega leaves the product untouched
// ---------------------------------------------------------------------------

#[test]
fn test_vega_restoration() {
    let mut product = strategies::butterfly(10.0, 100.0, &terms()).unwrap();
    let spot = Spot::from([95.0, 100.0, 105.0]);
    let before = product.price(&spot, 0.02).unwrap();
    product.vega(&spot, 0.02).unwrap();
    let after = product.price(&spot, 0.02).unwrap();
    assert_eq!(before, after);
    for leg in product.legs() {
        assert_eq!(*leg.market(), MarketParams::default());
    }
}

#[test]
fn test_vega_rejected_valuation_time_leaves_product_untouched() {
    let mut product = strategies::straddle(100.0, &terms()).unwrap();
    let snapshot = product.clone();
    assert!(product.vega(&Spot::from(100.0), 1.0).is_err());
    assert_eq!(product, snapshot);
}

// ---------------------------------------------------------------------------
// Calendar spread mixes expiries
// ---------------------------------------------------------------------------

#[test]
fn test_calendar_spread_rejects_valuation_past_near_leg() {
    let cal = strategies::calendar_spread(100.0, 0.125, 0.25, &MarketParams::default()).unwrap();
    assert_eq!(cal.earliest_expiry(), 0.125);
    assert!(cal.price(&Spot::from(100.0), 0.2).is_err());
    // Long the far leg, short the near leg: positive premium.
    assert!(scalar(cal.price(&Spot::from(100.0), 0.0).unwrap()) > 0.0);
}

#[test]
fn test_product_built_directly_matches_factory() {
    let call = OptionElement::new(OptionKind::Call, 100.0, 0.125).unwrap();
    let put = OptionElement::new(OptionKind::Put, 100.0, 0.125).unwrap();
    let direct =
        StructuredProduct::new(vec![call, put], vec![1.0, 1.0], MarketParams::default()).unwrap();
    let factory = strategies::straddle(100.0, &terms()).unwrap();
    assert_eq!(direct, factory);
}
