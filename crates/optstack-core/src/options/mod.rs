pub mod element;
pub mod market;

pub use element::{OptionElement, OptionKind};
pub use market::MarketParams;
