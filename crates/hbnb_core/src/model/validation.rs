//! Field-level validation errors shared by every record.

use crate::model::kind::Kind;
use thiserror::Error;

/// Reason a record cannot be written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{kind}.{field} must not be blank")]
    BlankField { kind: Kind, field: &'static str },
    #[error("invalid email address: `{0}`")]
    InvalidEmail(String),
    #[error("invalid country code `{0}`; expected two uppercase ASCII letters")]
    InvalidCountryCode(String),
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

pub(crate) fn require_non_blank(
    kind: Kind,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField { kind, field });
    }
    Ok(())
}

pub(crate) fn require_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::OutOfRange { field, value });
    }
    Ok(())
}
