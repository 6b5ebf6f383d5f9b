//! Per-series fit engine.
//!
//! Assembles the design matrix for one series' term list and delegates
//! coefficient estimation to the regression backend (penalized least squares
//! via ridge augmentation: each prior scale contributes a pseudo-row weighted
//! `1/prior_scale`, so larger scales regularize less). The engine interprets
//! the solve as trend parameters, component coefficient groups and a residual
//! scale; it never panics across a series boundary.

use crate::design::{
    changepoint_grid, fourier_columns, hinge, holiday_columns, standardize, trend_columns,
};
use crate::error::{FitError, GroupcastError, Result};
use crate::series::{detect_interval, RegressorFrame, TimeSeries};
use crate::spec::{GrowthKind, ModelSpec, TermMode};
use anofox_regression::prelude::*;

/// Minimum observations required to fit a series.
pub const MIN_OBSERVATIONS: usize = 3;

/// Coefficient group for one season or holiday term, in basis-column order.
#[derive(Debug, Clone)]
pub struct TermCoefficients {
    pub name: String,
    pub mode: TermMode,
    pub coefficients: Vec<f64>,
}

/// Coefficient and standardization stats for one regressor term.
#[derive(Debug, Clone)]
pub struct RegressorCoefficients {
    pub column: String,
    pub mode: TermMode,
    pub mean: f64,
    pub std: f64,
    pub beta: f64,
}

/// The immutable result of fitting one series: estimated changepoints and
/// slopes, per-term coefficient groups, residual scale, and the resolved term
/// list plus training time range used to produce it.
#[derive(Debug, Clone)]
pub struct FittedModel {
    spec: ModelSpec,
    t_start: i64,
    t_end: i64,
    y_scale: f64,
    capacity_scaled: Option<f64>,
    k: f64,
    m: f64,
    changepoints: Vec<f64>,
    deltas: Vec<f64>,
    seasons: Vec<TermCoefficients>,
    holidays: Vec<TermCoefficients>,
    regressors: Vec<RegressorCoefficients>,
    sigma_obs: f64,
    n_obs: usize,
    training_regressors: RegressorFrame,
}

impl FittedModel {
    /// The resolved term list this model was fitted under.
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Training time range (first and last observed timestamp, micros).
    pub fn train_range(&self) -> (i64, i64) {
        (self.t_start, self.t_end)
    }

    /// Estimated changepoint locations on scaled time in [0, 1].
    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    /// Estimated slope changes per changepoint (scaled units).
    pub fn deltas(&self) -> &[f64] {
        &self.deltas
    }

    /// Residual scale in response units.
    pub fn sigma_obs(&self) -> f64 {
        self.sigma_obs
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    pub fn season_coefficients(&self) -> &[TermCoefficients] {
        &self.seasons
    }

    pub fn holiday_coefficients(&self) -> &[TermCoefficients] {
        &self.holidays
    }

    pub fn regressor_coefficients(&self) -> &[RegressorCoefficients] {
        &self.regressors
    }

    /// Trend value at an arbitrary timestamp, in response units. Beyond the
    /// training range the final (or initial) slope extends deterministically.
    pub fn trend_at(&self, timestamp: i64) -> f64 {
        self.trend_scaled_at(self.scale_time(timestamp)) * self.y_scale
    }

    pub(crate) fn y_scale(&self) -> f64 {
        self.y_scale
    }

    pub(crate) fn k(&self) -> f64 {
        self.k
    }

    pub(crate) fn m(&self) -> f64 {
        self.m
    }

    pub(crate) fn capacity_scaled(&self) -> Option<f64> {
        self.capacity_scaled
    }

    pub(crate) fn scale_time(&self, timestamp: i64) -> f64 {
        (timestamp - self.t_start) as f64 / (self.t_end - self.t_start) as f64
    }

    pub(crate) fn trend_scaled_at(&self, t: f64) -> f64 {
        trend_scaled(
            self.spec.growth_term().kind,
            self.capacity_scaled,
            self.k,
            self.m,
            &self.changepoints,
            &self.deltas,
            t,
        )
    }

    /// One season term's effect at a timestamp (scaled units for additive
    /// terms, dimensionless ratio for multiplicative terms).
    pub(crate) fn season_effect(&self, index: usize, timestamp: i64) -> f64 {
        let season = &self.spec.seasons()[index];
        let basis = fourier_columns(&[timestamp], season);
        basis
            .iter()
            .zip(&self.seasons[index].coefficients)
            .map(|(col, beta)| col[0] * beta)
            .sum()
    }

    /// One holiday term's effect at a timestamp.
    pub(crate) fn holiday_effect(&self, index: usize, timestamp: i64) -> f64 {
        let holiday = &self.spec.holidays()[index];
        let basis = holiday_columns(&[timestamp], holiday);
        basis
            .iter()
            .zip(&self.holidays[index].coefficients)
            .map(|(col, beta)| col[0] * beta)
            .sum()
    }

    /// One regressor term's effect given its raw value.
    pub(crate) fn regressor_effect(&self, index: usize, raw: f64) -> f64 {
        let reg = &self.regressors[index];
        reg.beta * (raw - reg.mean) / reg.std
    }

    /// Raw regressor value at a timestamp: a caller-supplied frame takes
    /// precedence, then the retained training frame. A miss is an error, never
    /// a silent zero.
    pub(crate) fn regressor_raw(
        &self,
        column: &str,
        timestamp: i64,
        supplied: Option<&RegressorFrame>,
    ) -> Result<f64> {
        supplied
            .and_then(|frame| frame.lookup(column, timestamp))
            .or_else(|| self.training_regressors.lookup(column, timestamp))
            .ok_or_else(|| GroupcastError::MissingRegressor {
                column: column.to_string(),
                timestamp,
            })
    }
}

/// Piecewise trend on scaled time: slope `k`, offset `m`, and one slope
/// change `delta_j` activating at each changepoint. Logistic growth saturates
/// the same piecewise path at the scaled capacity.
pub(crate) fn trend_scaled(
    kind: GrowthKind,
    capacity_scaled: Option<f64>,
    k: f64,
    m: f64,
    changepoints: &[f64],
    deltas: &[f64],
    t: f64,
) -> f64 {
    match kind {
        GrowthKind::Flat => m,
        GrowthKind::Linear => piecewise(k, m, changepoints, deltas, t),
        GrowthKind::Logistic => {
            let cap = capacity_scaled.unwrap_or(1.0);
            cap * sigmoid(piecewise(k, m, changepoints, deltas, t))
        }
    }
}

fn piecewise(k: f64, m: f64, changepoints: &[f64], deltas: &[f64], t: f64) -> f64 {
    let mut value = k * t + m;
    for (&s, &delta) in changepoints.iter().zip(deltas) {
        value += delta * hinge(t, s);
    }
    value
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Fit one series without exogenous regressors.
pub fn fit(series: &TimeSeries, spec: &ModelSpec) -> std::result::Result<FittedModel, FitError> {
    fit_with_regressors(series, spec, &RegressorFrame::default())
}

/// Fit one series against a resolved or automatic model specification.
///
/// Failures are returned as values; specification validation is the caller's
/// concern (see [`ModelSpec::validate`] and the orchestrator).
pub fn fit_with_regressors(
    series: &TimeSeries,
    spec: &ModelSpec,
    regressors: &RegressorFrame,
) -> std::result::Result<FittedModel, FitError> {
    let n = series.len();
    if n < MIN_OBSERVATIONS {
        return Err(FitError::InsufficientData {
            needed: MIN_OBSERVATIONS,
            got: n,
        });
    }

    let timestamps = series.timestamps();
    let values = series.values();
    let interval = detect_interval(timestamps).unwrap_or(series.span_micros());
    let resolved = spec.resolve(series.span_micros(), interval);
    let growth = resolved.growth_term();

    // Scale time to [0, 1] and the response by its max magnitude.
    let t_start = timestamps[0];
    let t_end = timestamps[n - 1];
    let span = (t_end - t_start) as f64;
    let t_scaled: Vec<f64> = timestamps
        .iter()
        .map(|&ts| (ts - t_start) as f64 / span)
        .collect();

    let y_scale = values
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1e-10);
    let y_s: Vec<f64> = values.iter().map(|v| v / y_scale).collect();

    let capacity_scaled = match growth.kind {
        GrowthKind::Logistic => {
            let cap = growth.capacity.ok_or_else(|| {
                FitError::LogisticDomain("logistic growth requires a capacity".to_string())
            })?;
            if let Some(bad) = values.iter().find(|&&v| v <= 0.0 || v >= cap) {
                return Err(FitError::LogisticDomain(format!(
                    "observed value {} outside (0, capacity={})",
                    bad, cap
                )));
            }
            Some(cap / y_scale)
        }
        _ => None,
    };

    let changepoints = match growth.kind {
        GrowthKind::Flat => Vec::new(),
        _ => changepoint_grid(&t_scaled, growth.n_changepoints, growth.changepoint_range),
    };

    // Component basis blocks in term order, with their prior scales.
    let mut blocks: Vec<Block> = Vec::new();
    for season in resolved.seasons() {
        blocks.push(Block {
            mode: season.mode,
            columns: fourier_columns(timestamps, season),
            prior_scale: season.prior_scale,
        });
    }
    for holiday in resolved.holidays() {
        // Holiday effects are additive on the response scale.
        blocks.push(Block {
            mode: TermMode::Additive,
            columns: holiday_columns(timestamps, holiday),
            prior_scale: holiday.prior_scale,
        });
    }
    let mut regressor_stats = Vec::new();
    for regressor in resolved.regressors() {
        let raw = regressors
            .column(&regressor.column)
            .ok_or_else(|| FitError::MissingRegressorColumn(regressor.column.clone()))?;
        let (mean, std, standardized) = standardize(raw);
        regressor_stats.push((mean, std));
        blocks.push(Block {
            mode: regressor.mode,
            columns: vec![standardized],
            prior_scale: regressor.prior_scale,
        });
    }
    let has_multiplicative = blocks.iter().any(|b| b.mode == TermMode::Multiplicative);

    // Trend columns and penalties: slope and offset are unpenalized,
    // slope changes carry the changepoint prior.
    let trend_cols = trend_columns(&t_scaled, growth.kind, &changepoints);
    let n_trend = trend_cols.len();
    let mut trend_penalties = vec![0.0; n_trend];
    for p in trend_penalties
        .iter_mut()
        .skip(if growth.kind == GrowthKind::Flat { 1 } else { 2 })
    {
        *p = 1.0 / growth.changepoint_prior_scale;
    }

    let k: f64;
    let m: f64;
    let deltas: Vec<f64>;
    let coefs: Vec<f64>;
    let trend_s: Vec<f64>;

    match growth.kind {
        GrowthKind::Logistic => {
            // Fit the piecewise trend on the logit scale, then the components
            // on the residual with the trend level fixed.
            let cap_s = capacity_scaled.unwrap_or(1.0);
            let z: Vec<f64> = y_s.iter().map(|&v| logit(v / cap_s)).collect();
            let trend_params = solve_penalized(&trend_cols, &trend_penalties, &z)?;
            k = trend_params[0];
            m = trend_params[1];
            deltas = trend_params[2..].to_vec();
            trend_s = t_scaled
                .iter()
                .map(|&t| {
                    trend_scaled(growth.kind, capacity_scaled, k, m, &changepoints, &deltas, t)
                })
                .collect();

            let residual: Vec<f64> = y_s.iter().zip(&trend_s).map(|(y, tr)| y - tr).collect();
            let (cols, penalties) = flatten_blocks(&blocks, &trend_s);
            coefs = if cols.is_empty() {
                Vec::new()
            } else {
                solve_penalized(&cols, &penalties, &residual)?
            };
        }
        GrowthKind::Linear | GrowthKind::Flat => {
            // Multiplicative columns scale with the trend level, which is not
            // known before the solve; a provisional trend-only fit supplies it,
            // then one joint solve estimates everything.
            let trend_level = if has_multiplicative {
                let provisional = solve_penalized(&trend_cols, &trend_penalties, &y_s)?;
                let (pk, pm, pd) = split_trend(growth.kind, &provisional);
                t_scaled
                    .iter()
                    .map(|&t| trend_scaled(growth.kind, None, pk, pm, &changepoints, &pd, t))
                    .collect()
            } else {
                vec![1.0; n]
            };

            let (comp_cols, comp_penalties) = flatten_blocks(&blocks, &trend_level);
            let mut cols = trend_cols.clone();
            cols.extend(comp_cols);
            let mut penalties = trend_penalties.clone();
            penalties.extend(comp_penalties);

            let solution = solve_penalized(&cols, &penalties, &y_s)?;
            let (sk, sm, sd) = split_trend(growth.kind, &solution[..n_trend]);
            k = sk;
            m = sm;
            deltas = sd;
            coefs = solution[n_trend..].to_vec();
            trend_s = t_scaled
                .iter()
                .map(|&t| {
                    trend_scaled(growth.kind, None, k, m, &changepoints, &deltas, t)
                })
                .collect();
        }
    }

    // Slice the flat coefficient vector back into per-term groups.
    let mut offset = 0;
    let mut seasons = Vec::with_capacity(resolved.seasons().len());
    for season in resolved.seasons() {
        let width = 2 * season.fourier_order;
        seasons.push(TermCoefficients {
            name: season.name.clone(),
            mode: season.mode,
            coefficients: coefs[offset..offset + width].to_vec(),
        });
        offset += width;
    }
    let mut holidays = Vec::with_capacity(resolved.holidays().len());
    for holiday in resolved.holidays() {
        let width = (holiday.window.1 - holiday.window.0 + 1) as usize;
        holidays.push(TermCoefficients {
            name: holiday.name.clone(),
            mode: TermMode::Additive,
            coefficients: coefs[offset..offset + width].to_vec(),
        });
        offset += width;
    }
    let mut regressor_coefs = Vec::with_capacity(resolved.regressors().len());
    for (regressor, &(mean, std)) in resolved.regressors().iter().zip(&regressor_stats) {
        regressor_coefs.push(RegressorCoefficients {
            column: regressor.column.clone(),
            mode: regressor.mode,
            mean,
            std,
            beta: coefs[offset],
        });
        offset += 1;
    }

    let model = FittedModel {
        spec: resolved,
        t_start,
        t_end,
        y_scale,
        capacity_scaled,
        k,
        m,
        changepoints,
        deltas,
        seasons,
        holidays,
        regressors: regressor_coefs,
        sigma_obs: 0.0,
        n_obs: n,
        training_regressors: regressors.clone(),
    };

    // Residual scale from the reconciled in-sample fit, in response units.
    let mut sq_sum = 0.0;
    for (i, &ts) in timestamps.iter().enumerate() {
        let fitted = reconcile_at(&model, ts, trend_s[i]);
        let residual = values[i] - fitted;
        sq_sum += residual * residual;
    }
    let sigma_obs = (sq_sum / n as f64).sqrt();

    Ok(FittedModel { sigma_obs, ..model })
}

/// Reconciled total at one training timestamp given the scaled trend value.
fn reconcile_at(model: &FittedModel, timestamp: i64, trend_s: f64) -> f64 {
    let mut additive = 0.0;
    let mut multiplicative = 0.0;
    for (i, season) in model.spec.seasons().iter().enumerate() {
        let effect = model.season_effect(i, timestamp);
        match season.mode {
            TermMode::Additive => additive += effect,
            TermMode::Multiplicative => multiplicative += effect,
        }
    }
    for (i, _) in model.spec.holidays().iter().enumerate() {
        additive += model.holiday_effect(i, timestamp);
    }
    for (i, reg) in model.regressors.iter().enumerate() {
        // In-sample timestamps always come from the training frame.
        let raw = model.training_regressors.lookup(&reg.column, timestamp);
        debug_assert!(
            raw.is_some(),
            "training frame must cover every in-sample timestamp"
        );
        let raw = raw.unwrap_or(reg.mean);
        let effect = model.regressor_effect(i, raw);
        match reg.mode {
            TermMode::Additive => additive += effect,
            TermMode::Multiplicative => multiplicative += effect,
        }
    }
    (trend_s * (1.0 + multiplicative) + additive) * model.y_scale
}

struct Block {
    mode: TermMode,
    columns: Vec<Vec<f64>>,
    prior_scale: f64,
}

/// Flatten term blocks into design columns and per-column penalties,
/// multiplying multiplicative basis columns by the current trend level.
fn flatten_blocks(blocks: &[Block], trend_level: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut cols = Vec::new();
    let mut penalties = Vec::new();
    for block in blocks {
        for col in &block.columns {
            let col = match block.mode {
                TermMode::Additive => col.clone(),
                TermMode::Multiplicative => col
                    .iter()
                    .zip(trend_level)
                    .map(|(v, tr)| v * tr)
                    .collect(),
            };
            cols.push(col);
            penalties.push(1.0 / block.prior_scale);
        }
    }
    (cols, penalties)
}

fn split_trend(kind: GrowthKind, params: &[f64]) -> (f64, f64, Vec<f64>) {
    match kind {
        GrowthKind::Flat => (0.0, params[0], Vec::new()),
        _ => (params[0], params[1], params[2..].to_vec()),
    }
}

/// Penalized least squares via the regression backend.
///
/// Ridge priors enter as augmentation pseudo-rows: column `j` with penalty
/// `p_j > 0` contributes one extra row with `p_j` at column `j` and a zero
/// response, which makes the augmented system full rank whenever every
/// column is penalized or linearly independent.
fn solve_penalized(
    columns: &[Vec<f64>],
    penalties: &[f64],
    y: &[f64],
) -> std::result::Result<Vec<f64>, FitError> {
    let n = y.len();
    let n_cols = columns.len();
    debug_assert_eq!(n_cols, penalties.len());

    let augmented: Vec<(usize, f64)> = penalties
        .iter()
        .enumerate()
        .filter(|(_, &p)| p > 0.0)
        .map(|(j, &p)| (j, p))
        .collect();
    let rows = n + augmented.len();

    let x_mat = faer::Mat::from_fn(rows, n_cols, |i, j| {
        if i < n {
            columns[j][i]
        } else {
            let (col, weight) = augmented[i - n];
            if j == col {
                weight
            } else {
                0.0
            }
        }
    });
    let y_col = faer::Col::from_fn(rows, |i| if i < n { y[i] } else { 0.0 });

    let fitted = OlsRegressor::builder()
        .with_intercept(false)
        // The augmented system is full rank by construction; a positive
        // tolerance would alias the explicit all-ones offset column as
        // "constant" in the no-intercept path and NaN its coefficient.
        .rank_tolerance(0.0)
        .build()
        .fit(&x_mat, &y_col)
        .map_err(|_| {
            FitError::OptimizerFailed("penalized least squares solve failed".to_string())
        })?;

    let coeffs_col = fitted.coefficients();
    let mut coeffs = Vec::with_capacity(n_cols);
    for i in 0..coeffs_col.nrows() {
        coeffs.push(coeffs_col[i]);
    }
    if coeffs.len() != n_cols {
        return Err(FitError::OptimizerFailed(format!(
            "expected {} coefficients, got {}",
            n_cols,
            coeffs.len()
        )));
    }
    if coeffs.iter().any(|c| !c.is_finite()) {
        return Err(FitError::OptimizerFailed(
            "non-finite coefficients returned".to_string(),
        ));
    }
    Ok(coeffs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MICROS_PER_DAY;
    use crate::spec::{Growth, Season};
    use approx::assert_relative_eq;

    fn daily_series(values: Vec<f64>) -> TimeSeries {
        let timestamps = (0..values.len() as i64).map(|i| i * MICROS_PER_DAY).collect();
        TimeSeries::new(timestamps, values).unwrap()
    }

    #[test]
    fn test_insufficient_data() {
        let series = daily_series(vec![1.0, 2.0]);
        let err = fit(&series, &ModelSpec::new("y")).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { needed: 3, got: 2 });
    }

    #[test]
    fn test_linear_trend_recovery() {
        let series = daily_series((0..60).map(|i| 2.0 + 3.0 * i as f64).collect());
        let spec = ModelSpec::new("y").growth(Growth::linear().with_changepoints(5));
        let model = fit(&series, &spec).unwrap();

        // Recovered trend matches the generating line at both ends
        assert_relative_eq!(model.trend_at(0), 2.0, epsilon = 0.5);
        assert_relative_eq!(model.trend_at(59 * MICROS_PER_DAY), 2.0 + 3.0 * 59.0, epsilon = 1.0);
        assert!(model.sigma_obs() < 1.0);
    }

    #[test]
    fn test_flat_growth_is_constant() {
        let series = daily_series(vec![5.0, 5.2, 4.8, 5.1, 4.9, 5.0]);
        let spec = ModelSpec::new("y").growth(Growth::flat());
        let model = fit(&series, &spec).unwrap();

        assert!(model.changepoints().is_empty());
        let t0 = model.trend_at(0);
        let t5 = model.trend_at(5 * MICROS_PER_DAY);
        assert_relative_eq!(t0, t5, epsilon = 1e-9);
        assert_relative_eq!(t0, 5.0, epsilon = 0.2);
    }

    #[test]
    fn test_logistic_requires_domain() {
        let series = daily_series(vec![1.0, 5.0, 12.0, 9.0]);
        let spec = ModelSpec::new("y").growth(Growth::logistic(10.0));
        let err = fit(&series, &spec).unwrap_err();
        assert!(matches!(err, FitError::LogisticDomain(_)));
    }

    #[test]
    fn test_logistic_saturates_below_capacity() {
        // Sigmoid-shaped series approaching capacity 100
        let series = daily_series(
            (0..80)
                .map(|i| 100.0 / (1.0 + (-0.15 * (i as f64 - 40.0)).exp()))
                .collect(),
        );
        let spec = ModelSpec::new("y").growth(Growth::logistic(100.0).with_changepoints(0));
        let model = fit(&series, &spec).unwrap();

        // Far future trend stays bounded by the capacity
        let far = model.trend_at(400 * MICROS_PER_DAY);
        assert!(far <= 100.0 + 1e-6, "trend {} exceeded capacity", far);
        assert!(far > 90.0);
    }

    #[test]
    fn test_missing_training_regressor_column() {
        let series = daily_series(vec![1.0, 2.0, 3.0, 4.0]);
        let spec = ModelSpec::new("y").regressor(crate::spec::Regressor::additive("temp"));
        let err = fit(&series, &spec).unwrap_err();
        assert_eq!(err, FitError::MissingRegressorColumn("temp".into()));
    }

    #[test]
    fn test_seasonal_fit_reduces_residual() {
        let n = 70;
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64;
                10.0 + 0.5 * t + 4.0 * (2.0 * std::f64::consts::PI * t / 7.0).sin()
            })
            .collect();
        let series = daily_series(values);

        let plain = fit(
            &series,
            &ModelSpec::new("y").growth(Growth::linear().with_changepoints(0)),
        )
        .unwrap();
        let seasonal = fit(
            &series,
            &ModelSpec::new("y")
                .growth(Growth::linear().with_changepoints(0))
                .season(Season::weekly()),
        )
        .unwrap();

        assert!(seasonal.sigma_obs() < plain.sigma_obs() / 2.0);
        assert_eq!(seasonal.season_coefficients().len(), 1);
        assert_eq!(seasonal.season_coefficients()[0].coefficients.len(), 6);
    }

    #[test]
    fn test_holiday_effect_is_additive() {
        use chrono::NaiveDate;
        // Day 10 (1970-01-11) carries a +8 spike over a flat level
        let values: Vec<f64> = (0..30).map(|i| if i == 10 { 28.0 } else { 20.0 }).collect();
        let series = daily_series(values);
        let holiday = crate::spec::Holiday::new(
            "spike",
            vec![NaiveDate::from_ymd_opt(1970, 1, 11).unwrap()],
        );
        let spec = ModelSpec::new("y")
            .growth(Growth::flat())
            .holiday(holiday);
        let model = fit(&series, &spec).unwrap();

        assert_eq!(model.holiday_coefficients().len(), 1);
        // The spike is absorbed additively, so the fit is near exact and the
        // effect on the holiday recovers the +8 in response units
        assert!(model.sigma_obs() < 0.5, "sigma {} too large", model.sigma_obs());
        let on = model.holiday_effect(0, 10 * MICROS_PER_DAY) * model.y_scale();
        assert!((on - 8.0).abs() < 1.0, "holiday effect {} far from 8", on);
        assert_eq!(model.holiday_effect(0, 5 * MICROS_PER_DAY), 0.0);
    }

    #[test]
    fn test_regressor_fit_covers_training_timestamps() {
        // Response fully explained by the regressor: sigma_obs must come out
        // near zero, which requires every in-sample lookup to hit the
        // retained training frame rather than a fallback value.
        let temps: Vec<f64> = (0..40).map(|i| 10.0 + ((i * 7) % 13) as f64).collect();
        let values: Vec<f64> = temps.iter().map(|t| 5.0 + 3.0 * t).collect();
        let timestamps: Vec<i64> = (0..40).map(|i| i * MICROS_PER_DAY).collect();
        let series = TimeSeries::new(timestamps.clone(), values).unwrap();
        let frame = RegressorFrame::new(timestamps)
            .with_column("temp", temps)
            .unwrap();

        let spec = ModelSpec::new("y")
            .growth(Growth::flat())
            .regressor(crate::spec::Regressor::additive("temp").with_prior_scale(100.0));
        let model = fit_with_regressors(&series, &spec, &frame).unwrap();
        assert!(
            model.sigma_obs() < 0.5,
            "sigma {} suggests training lookups missed",
            model.sigma_obs()
        );
    }

    #[test]
    fn test_fitted_model_is_reusable() {
        let series = daily_series((0..30).map(|i| i as f64).collect());
        let model = fit(&series, &ModelSpec::new("y")).unwrap();
        // The model is a plain value: cloning and re-reading accessors is safe
        let copy = model.clone();
        assert_eq!(copy.n_obs(), 30);
        assert_eq!(copy.train_range(), (0, 29 * MICROS_PER_DAY));
    }
}
