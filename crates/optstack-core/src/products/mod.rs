pub mod structured;

pub use structured::{ProductGreeks, StructuredProduct};
