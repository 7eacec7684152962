use clap::Args;
use serde_json::Value;

use optstack_core::analysis::{self, LegInput, ProductInput, StrategyInput};
use optstack_core::{MarketParams, OptionKind, Spot};

use crate::input;

/// Arguments for custom product pricing
#[derive(Args)]
pub struct ProductArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_product(args: ProductArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let product_input: ProductInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for product pricing".into());
    };
    let result = analysis::analyze_product(&product_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for named strategy pricing
#[derive(Args)]
pub struct StrategyArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_strategy(args: StrategyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let strategy_input: StrategyInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for strategy pricing".into());
    };
    let result = analysis::analyze_strategy(&strategy_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for single-leg pricing
#[derive(Args)]
pub struct OptionArgs {
    /// Option kind: call or put
    #[arg(long)]
    pub kind: String,
    /// Strike price
    #[arg(long)]
    pub strike: f64,
    /// Time to expiry in years
    #[arg(long)]
    pub expiry: f64,
    /// Spot level, or a comma-separated list of levels
    #[arg(long, required = true, value_delimiter = ',', num_args = 1..)]
    pub spot: Vec<f64>,
    /// Valuation time in years
    #[arg(long, default_value_t = 0.0)]
    pub time: f64,
    /// Annualised volatility
    #[arg(long, default_value_t = optstack_core::options::market::DEFAULT_VOLATILITY)]
    pub volatility: f64,
    /// Continuously compounded risk-free rate
    #[arg(long, default_value_t = optstack_core::options::market::DEFAULT_INT_RATE)]
    pub rate: f64,
    /// Continuous dividend yield
    #[arg(long, default_value_t = optstack_core::options::market::DEFAULT_DIV_YIELD)]
    pub dividend_yield: f64,
}

pub fn run_option(args: OptionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let kind: OptionKind = args.kind.parse()?;
    let spot = match args.spot.as_slice() {
        [] => return Err("--spot requires at least one level".into()),
        [single] => Spot::Scalar(*single),
        _ => Spot::Array(args.spot),
    };
    let product_input = ProductInput {
        legs: vec![LegInput {
            kind,
            strike: args.strike,
            time_to_expiry: args.expiry,
            weight: 1.0,
        }],
        market: MarketParams {
            volatility: args.volatility,
            int_rate: args.rate,
            div_yield: args.dividend_yield,
        },
        spot,
        valuation_time: args.time,
        profile: None,
    };
    let result = analysis::analyze_product(&product_input)?;
    Ok(serde_json::to_value(result)?)
}
