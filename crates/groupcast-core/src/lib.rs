//! Core forecasting library for groupcast.
//!
//! This crate provides formula-driven trend/seasonal decomposition models
//! fitted independently per group key over a tabular dataset, with
//! simulation-based predictive distributions.

pub mod batch;
pub mod decompose;
pub mod error;
pub mod fit;
pub mod series;
pub mod simulate;
pub mod spec;

mod design;

// Re-exports for convenience
pub use batch::{fit_all, FitSummary, KeyedModels};
pub use decompose::{decompose, decompose_all, ComponentRow, ComponentTable};
pub use error::{FitError, GroupcastError, Result, SpecificationError};
pub use fit::{
    fit, fit_with_regressors, FittedModel, RegressorCoefficients, TermCoefficients,
    MIN_OBSERVATIONS,
};
pub use series::{
    detect_interval, GroupKey, KeyedFrames, ObservationTable, Partition, RegressorFrame,
    TimeSeries,
};
pub use simulate::{simulate, simulate_all, ForecastRow, ForecastTable};
pub use spec::{Growth, GrowthKind, Holiday, ModelSpec, Regressor, Season, Term, TermMode};
