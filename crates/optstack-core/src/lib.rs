pub mod error;
pub mod options;
pub mod products;
pub mod types;

#[cfg(feature = "strategies")]
pub mod strategies;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use error::PricingError;
pub use options::{MarketParams, OptionElement, OptionKind};
pub use products::{ProductGreeks, StructuredProduct};
pub use types::*;

/// Standard result type for all pricing operations
pub type PricingResult<T> = Result<T, PricingError>;
