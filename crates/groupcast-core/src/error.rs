//! Error types for grouped forecasting.
//!
//! Three scopes, per the propagation policy: specification errors abort the
//! whole batch, fit errors are captured per group key, and missing-regressor
//! errors abort the single decompose/simulate call that needed the value.

use thiserror::Error;

/// Result type for groupcast operations.
pub type Result<T> = std::result::Result<T, GroupcastError>;

/// Errors raised while building or validating a model specification.
///
/// These indicate a caller mistake that applies to every group key, so they
/// propagate immediately and stop the batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecificationError {
    #[error("Duplicate growth term: a model specification holds exactly one")]
    DuplicateGrowth,

    #[error("Duplicate term name: '{0}'")]
    DuplicateTerm(String),

    #[error("Unknown column: '{0}' is not present in the table schema")]
    UnknownColumn(String),

    #[error("Invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },
}

/// Errors raised while fitting a single series.
///
/// Scoped to one group key: the orchestrator records these in the key's
/// container slot and keeps fitting sibling keys.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Logistic growth domain: {0}")]
    LogisticDomain(String),

    #[error("Optimizer failed: {0}")]
    OptimizerFailed(String),

    #[error("Regressor column '{0}' was not supplied with the training data")]
    MissingRegressorColumn(String),

    #[error("Fit timed out and was discarded")]
    Timeout,
}

/// Top-level error for the groupcast library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupcastError {
    #[error(transparent)]
    Specification(#[from] SpecificationError),

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error("Missing regressor '{column}' value at timestamp {timestamp}")]
    MissingRegressor { column: String, timestamp: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown group key")]
    UnknownKey,
}

impl GroupcastError {
    /// Whether the error is systemic (aborts a batch) rather than scoped to
    /// one series.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            GroupcastError::Specification(_) | GroupcastError::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpecificationError::UnknownColumn("temp".into());
        assert_eq!(
            format!("{}", err),
            "Unknown column: 'temp' is not present in the table schema"
        );

        let err = FitError::InsufficientData { needed: 3, got: 1 };
        assert_eq!(
            format!("{}", err),
            "Insufficient data: need at least 3 observations, got 1"
        );

        let err = GroupcastError::MissingRegressor {
            column: "price".into(),
            timestamp: 86_400_000_000,
        };
        assert_eq!(
            format!("{}", err),
            "Missing regressor 'price' value at timestamp 86400000000"
        );
    }

    #[test]
    fn test_transparent_conversion() {
        let err: GroupcastError = SpecificationError::DuplicateGrowth.into();
        assert!(matches!(err, GroupcastError::Specification(_)));
        assert!(err.is_systemic());

        let err: GroupcastError = FitError::Timeout.into();
        assert!(matches!(err, GroupcastError::Fit(_)));
        assert!(!err.is_systemic());
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = SpecificationError::InvalidParameter {
            param: "prior_scale".into(),
            value: "-1".into(),
            reason: "must be positive".into(),
        };
        assert_eq!(
            format!("{}", err),
            "Invalid parameter 'prior_scale' = '-1': must be positive"
        );
    }
}
