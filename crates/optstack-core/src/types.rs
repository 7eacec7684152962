use serde::{Deserialize, Serialize};

/// Prices and strikes.
pub type Money = f64;

/// Continuously compounded rates and volatilities as decimals (0.05 = 5%).
pub type Rate = f64;

/// Year fractions.
pub type Years = f64;

/// Underlying spot input: a single level or a one-dimensional grid of levels.
///
/// Every query result has the same shape as the spot it was computed from.
/// Serialises untagged, so JSON accepts `100.0` or `[95.0, 100.0, 105.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Spot {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Spot {
    /// Flat view over the spot values.
    pub fn values(&self) -> &[f64] {
        match self {
            Spot::Scalar(v) => std::slice::from_ref(v),
            Spot::Array(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Spot::Scalar(_))
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Spot::Scalar(v) => Some(*v),
            Spot::Array(_) => None,
        }
    }

    /// Apply `f` to every value, keeping the shape.
    pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Spot {
        match self {
            Spot::Scalar(v) => Spot::Scalar(f(*v)),
            Spot::Array(v) => Spot::Array(v.iter().map(|x| f(*x)).collect()),
        }
    }

    /// Fallible elementwise map; stops at the first error.
    pub fn try_map<E>(&self, mut f: impl FnMut(f64) -> Result<f64, E>) -> Result<Spot, E> {
        match self {
            Spot::Scalar(v) => Ok(Spot::Scalar(f(*v)?)),
            Spot::Array(v) => Ok(Spot::Array(
                v.iter().map(|x| f(*x)).collect::<Result<Vec<_>, E>>()?,
            )),
        }
    }

    /// Combine two same-shaped values elementwise. The shape of `self` wins.
    pub(crate) fn zip_with(&self, other: &Spot, mut f: impl FnMut(f64, f64) -> f64) -> Spot {
        debug_assert_eq!(self.len(), other.len());
        match self {
            Spot::Scalar(a) => Spot::Scalar(f(*a, other.values()[0])),
            Spot::Array(a) => Spot::Array(
                a.iter()
                    .zip(other.values())
                    .map(|(x, y)| f(*x, *y))
                    .collect(),
            ),
        }
    }

    pub(crate) fn zeros_like(&self) -> Spot {
        self.map(|_| 0.0)
    }
}

impl From<f64> for Spot {
    fn from(v: f64) -> Self {
        Spot::Scalar(v)
    }
}

impl From<Vec<f64>> for Spot {
    fn from(v: Vec<f64>) -> Self {
        Spot::Array(v)
    }
}

impl From<&[f64]> for Spot {
    fn from(v: &[f64]) -> Self {
        Spot::Array(v.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Spot {
    fn from(v: [f64; N]) -> Self {
        Spot::Array(v.to_vec())
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}
