//! Multi-series orchestrator: one independent fit per group key.
//!
//! Partitions share no mutable state, so fits run on parallel workers. A key
//! whose series cannot be fitted gets its failure recorded in the container;
//! only specification or table-invariant errors abort the whole batch.

use crate::error::{FitError, Result};
use crate::fit::{fit_with_regressors, FittedModel};
use crate::series::{GroupKey, ObservationTable};
use crate::spec::ModelSpec;
use rayon::prelude::*;

/// Diagnostic summary of one `fit_all` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitSummary {
    pub n_fitted: usize,
    pub n_failed: usize,
}

/// Keyed container: one fitted model or recorded failure per group key, in
/// key discovery order.
#[derive(Debug)]
pub struct KeyedModels {
    entries: Vec<(GroupKey, std::result::Result<FittedModel, FitError>)>,
}

impl KeyedModels {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for one key: fitted model or recorded failure.
    pub fn get(&self, key: &GroupKey) -> Option<&std::result::Result<FittedModel, FitError>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    /// All entries in discovery order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&GroupKey, &std::result::Result<FittedModel, FitError>)> {
        self.entries.iter().map(|(k, r)| (k, r))
    }

    /// Successfully fitted models in discovery order.
    pub fn models(&self) -> impl Iterator<Item = (&GroupKey, &FittedModel)> {
        self.entries
            .iter()
            .filter_map(|(k, r)| r.as_ref().ok().map(|m| (k, m)))
    }

    /// Failed keys with their recorded reasons, in discovery order.
    pub fn failures(&self) -> Vec<(&GroupKey, &FitError)> {
        self.entries
            .iter()
            .filter_map(|(k, r)| r.as_ref().err().map(|e| (k, e)))
            .collect()
    }

    pub fn summary(&self) -> FitSummary {
        let n_failed = self.entries.iter().filter(|(_, r)| r.is_err()).count();
        FitSummary {
            n_fitted: self.entries.len() - n_failed,
            n_failed,
        }
    }
}

/// Fit one independent model per group key in the table.
///
/// The specification is validated against the table schema up front;
/// specification errors abort the batch before any fitting. Per-key fit
/// failures are recorded in the key's slot and never abort sibling keys.
/// Output order matches key discovery order (first appearance in the table);
/// computation order across keys is unspecified.
pub fn fit_all(table: &ObservationTable, spec: &ModelSpec) -> Result<KeyedModels> {
    spec.validate(&table.schema_columns())?;
    let partitions = table.partition()?;

    let entries = partitions
        .par_iter()
        .map(|partition| {
            let result = fit_with_regressors(&partition.series, spec, &partition.regressors);
            (partition.key.clone(), result)
        })
        .collect();

    Ok(KeyedModels { entries })
}
