//! Forecast simulator: stochastic trend extension beyond the training range.
//!
//! Future changepoints are drawn at the historical changepoint density
//! (count ~ Poisson, locations uniform over the forecast span, slope changes
//! ~ Laplace with the scale estimated from the fitted slope changes), and each
//! path carries observation noise at the fitted residual scale. Seasonal,
//! holiday and regressor components extend deterministically. The point
//! forecast is the per-timestamp median across paths; the full ensemble is
//! retained. All sampling is driven by a caller-supplied seed, so identical
//! inputs reproduce identical ensembles.

use crate::batch::KeyedModels;
use crate::error::{GroupcastError, Result};
use crate::fit::{trend_scaled, FittedModel};
use crate::series::{GroupKey, KeyedFrames, RegressorFrame};
use crate::spec::TermMode;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use statrs::distribution::{Laplace, Normal, Poisson};

/// One forecast timestamp: the median point forecast and the simulated
/// ensemble it was derived from.
#[derive(Debug, Clone)]
pub struct ForecastRow {
    pub key: Option<GroupKey>,
    pub timestamp: i64,
    /// Per-timestamp median across paths.
    pub point: f64,
    /// One simulated total per path, in path order.
    pub paths: Vec<f64>,
}

/// Forecast table, one row per (key, timestamp).
#[derive(Debug, Clone)]
pub struct ForecastTable {
    pub path_count: usize,
    pub rows: Vec<ForecastRow>,
}

impl ForecastTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Simulate forecast paths for one fitted model.
///
/// Regressor lookups follow the same rule as decomposition: supplied frame
/// first, then the retained training frame, otherwise `MissingRegressor`
/// with no partial output.
pub fn simulate(
    model: &FittedModel,
    future_timestamps: &[i64],
    path_count: usize,
    seed: u64,
    regressors: Option<&RegressorFrame>,
) -> Result<ForecastTable> {
    simulate_keyed(model, future_timestamps, path_count, seed, regressors, None)
}

/// Simulate every fitted model in a keyed container; failed keys are skipped.
///
/// Each key derives its own seed from `seed` plus its discovery index, so the
/// result is deterministic regardless of parallel scheduling.
pub fn simulate_all(
    models: &KeyedModels,
    future_timestamps: &[i64],
    path_count: usize,
    seed: u64,
    regressors: Option<&KeyedFrames>,
) -> Result<ForecastTable> {
    let tables: Vec<ForecastTable> = models
        .models()
        .enumerate()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(idx, (key, model))| {
            let frame = regressors.and_then(|frames| frames.get(key));
            simulate_keyed(
                model,
                future_timestamps,
                path_count,
                seed.wrapping_add(idx as u64),
                frame,
                Some(key.clone()),
            )
        })
        .collect::<Result<_>>()?;

    let rows = tables.into_iter().flat_map(|t| t.rows).collect();
    Ok(ForecastTable { path_count, rows })
}

fn simulate_keyed(
    model: &FittedModel,
    future_timestamps: &[i64],
    path_count: usize,
    seed: u64,
    regressors: Option<&RegressorFrame>,
    key: Option<GroupKey>,
) -> Result<ForecastTable> {
    if path_count == 0 {
        return Err(GroupcastError::InvalidInput(
            "path_count must be at least 1".to_string(),
        ));
    }

    // Deterministic parts first: regressor misses must fail before any
    // sampling produces output.
    let deterministic: Vec<Deterministic> = future_timestamps
        .iter()
        .map(|&ts| deterministic_parts(model, ts, regressors))
        .collect::<Result<_>>()?;

    let growth = model.spec().growth_term();
    let y_scale = model.y_scale();
    let sigma_obs = model.sigma_obs();
    let t_scaled: Vec<f64> = future_timestamps
        .iter()
        .map(|&ts| model.scale_time(ts))
        .collect();
    let horizon_end = t_scaled.iter().cloned().fold(1.0_f64, f64::max);

    // Future changepoint process matched to the historical density.
    let n_historical = model.changepoints().len();
    let changepoint_rate = n_historical as f64 * (horizon_end - 1.0).max(0.0);
    let delta_scale =
        model.deltas().iter().map(|d| d.abs()).sum::<f64>() / (n_historical.max(1) as f64) + 1e-8;

    let laplace = Laplace::new(0.0, delta_scale)
        .map_err(|e| GroupcastError::InvalidInput(format!("invalid slope prior: {}", e)))?;
    let noise = if sigma_obs > 0.0 {
        Some(
            Normal::new(0.0, sigma_obs)
                .map_err(|e| GroupcastError::InvalidInput(format!("invalid noise scale: {}", e)))?,
        )
    } else {
        None
    };
    let poisson = if changepoint_rate > 0.0 {
        Some(
            Poisson::new(changepoint_rate)
                .map_err(|e| GroupcastError::InvalidInput(format!("invalid rate: {}", e)))?,
        )
    } else {
        None
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let mut paths_by_ts: Vec<Vec<f64>> = vec![Vec::with_capacity(path_count); t_scaled.len()];

    for _ in 0..path_count {
        // Extended changepoint set for this path.
        let mut changepoints = model.changepoints().to_vec();
        let mut deltas = model.deltas().to_vec();
        if let Some(poisson) = &poisson {
            let n_new = Distribution::<u64>::sample(poisson, &mut rng) as usize;
            for _ in 0..n_new {
                changepoints.push(1.0 + rng.gen::<f64>() * (horizon_end - 1.0));
                deltas.push(laplace.sample(&mut rng));
            }
        }

        for (slot, (&t, det)) in paths_by_ts
            .iter_mut()
            .zip(t_scaled.iter().zip(&deterministic))
        {
            let trend_s = trend_scaled(
                growth.kind,
                model.capacity_scaled(),
                model.k(),
                model.m(),
                &changepoints,
                &deltas,
                t,
            );
            let mut total = (trend_s * (1.0 + det.multiplicative) + det.additive) * y_scale;
            if let Some(noise) = &noise {
                total += noise.sample(&mut rng);
            }
            slot.push(total);
        }
    }

    let rows = future_timestamps
        .iter()
        .zip(paths_by_ts)
        .map(|(&ts, paths)| ForecastRow {
            key: key.clone(),
            timestamp: ts,
            point: median(&paths),
            paths,
        })
        .collect();

    Ok(ForecastTable { path_count, rows })
}

struct Deterministic {
    additive: f64,
    multiplicative: f64,
}

fn deterministic_parts(
    model: &FittedModel,
    timestamp: i64,
    regressors: Option<&RegressorFrame>,
) -> Result<Deterministic> {
    let mut additive = 0.0;
    let mut multiplicative = 0.0;

    for (i, season) in model.spec().seasons().iter().enumerate() {
        let effect = model.season_effect(i, timestamp);
        match season.mode {
            TermMode::Additive => additive += effect,
            TermMode::Multiplicative => multiplicative += effect,
        }
    }
    for i in 0..model.spec().holidays().len() {
        additive += model.holiday_effect(i, timestamp);
    }
    for (i, reg) in model.regressor_coefficients().iter().enumerate() {
        let raw = model.regressor_raw(&reg.column, timestamp, regressors)?;
        let effect = model.regressor_effect(i, raw);
        match reg.mode {
            TermMode::Additive => additive += effect,
            TermMode::Multiplicative => multiplicative += effect,
        }
    }

    Ok(Deterministic {
        additive,
        multiplicative,
    })
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
