use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Invalid parameter: {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Numeric degeneracy in {context}: {reason}")]
    NumericDegeneracy { context: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PricingError {
    pub(crate) fn parameter(field: &str, reason: impl Into<String>) -> Self {
        PricingError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn input(field: &str, reason: impl Into<String>) -> Self {
        PricingError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn degeneracy(context: &str, reason: impl Into<String>) -> Self {
        PricingError::NumericDegeneracy {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::SerializationError(e.to_string())
    }
}
