//! Decomposition engine: reconstructs per-term component values over
//! historical and/or future timestamps and reconciles them into a total.
//!
//! Additive terms are reported in response units; multiplicative terms are
//! reported as dimensionless ratios of the trend level. The reconciled total
//! is `trend * (1 + sum of multiplicative) + sum of additive`, with each
//! term's mode fixed at fit time.

use crate::batch::KeyedModels;
use crate::error::Result;
use crate::fit::FittedModel;
use crate::series::{GroupKey, KeyedFrames, RegressorFrame};
use crate::spec::TermMode;

/// One decomposed timestamp: trend, named per-term components, and the
/// reconciled total.
#[derive(Debug, Clone)]
pub struct ComponentRow {
    pub key: Option<GroupKey>,
    pub timestamp: i64,
    pub trend: f64,
    /// Named component values: season and holiday terms by term name,
    /// regressor terms by column name.
    pub components: Vec<(String, f64)>,
    pub total: f64,
}

impl ComponentRow {
    /// Component value by term name.
    pub fn component(&self, name: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Read-only component table, one row per (key, timestamp).
#[derive(Debug, Clone, Default)]
pub struct ComponentTable {
    pub rows: Vec<ComponentRow>,
}

impl ComponentTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decompose a fitted model over the requested timestamps.
///
/// Regressor values are looked up first in the supplied frame, then in the
/// training data retained by the model; a miss fails the whole call with
/// `MissingRegressor` and produces no partial rows.
pub fn decompose(
    model: &FittedModel,
    timestamps: &[i64],
    regressors: Option<&RegressorFrame>,
) -> Result<ComponentTable> {
    let mut rows = Vec::with_capacity(timestamps.len());
    for &ts in timestamps {
        rows.push(decompose_one(model, ts, regressors, None)?);
    }
    Ok(ComponentTable { rows })
}

/// Decompose every fitted model in a keyed container; failed keys are
/// skipped. Future regressor frames are looked up per key.
pub fn decompose_all(
    models: &KeyedModels,
    timestamps: &[i64],
    regressors: Option<&KeyedFrames>,
) -> Result<ComponentTable> {
    let mut rows = Vec::new();
    for (key, model) in models.models() {
        let frame = regressors.and_then(|frames| frames.get(key));
        for &ts in timestamps {
            rows.push(decompose_one(model, ts, frame, Some(key.clone()))?);
        }
    }
    Ok(ComponentTable { rows })
}

fn decompose_one(
    model: &FittedModel,
    timestamp: i64,
    regressors: Option<&RegressorFrame>,
    key: Option<GroupKey>,
) -> Result<ComponentRow> {
    let y_scale = model.y_scale();
    let trend = model.trend_at(timestamp);

    let mut components = Vec::new();
    let mut additive = 0.0;
    let mut multiplicative = 0.0;

    for (i, season) in model.spec().seasons().iter().enumerate() {
        let effect = model.season_effect(i, timestamp);
        match season.mode {
            TermMode::Additive => {
                additive += effect;
                components.push((season.name.clone(), effect * y_scale));
            }
            TermMode::Multiplicative => {
                multiplicative += effect;
                components.push((season.name.clone(), effect));
            }
        }
    }

    for (i, holiday) in model.spec().holidays().iter().enumerate() {
        let effect = model.holiday_effect(i, timestamp);
        additive += effect;
        components.push((holiday.name.clone(), effect * y_scale));
    }

    for (i, reg) in model.regressor_coefficients().iter().enumerate() {
        let raw = model.regressor_raw(&reg.column, timestamp, regressors)?;
        let effect = model.regressor_effect(i, raw);
        match reg.mode {
            TermMode::Additive => {
                additive += effect;
                components.push((reg.column.clone(), effect * y_scale));
            }
            TermMode::Multiplicative => {
                multiplicative += effect;
                components.push((reg.column.clone(), effect));
            }
        }
    }

    let total = trend * (1.0 + multiplicative) + additive * y_scale;

    Ok(ComponentRow {
        key,
        timestamp,
        trend,
        components,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{fit, fit_with_regressors};
    use crate::series::{TimeSeries, MICROS_PER_DAY};
    use crate::spec::{Growth, ModelSpec, Regressor, Season, TermMode};
    use approx::assert_relative_eq;

    fn daily_series(values: Vec<f64>) -> TimeSeries {
        let timestamps = (0..values.len() as i64).map(|i| i * MICROS_PER_DAY).collect();
        TimeSeries::new(timestamps, values).unwrap()
    }

    #[test]
    fn test_additive_reconciliation_identity() {
        // Two years of daily data with a yearly cycle
        let n = 750;
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64;
                100.0 + 0.2 * t + 12.0 * (2.0 * std::f64::consts::PI * t / 365.25).sin()
            })
            .collect();
        let series = daily_series(values);
        let spec = ModelSpec::new("y")
            .growth(Growth::linear().with_changepoints(0))
            .season(Season::yearly());
        let model = fit(&series, &spec).unwrap();

        let table = decompose(&model, series.timestamps(), None).unwrap();
        assert_eq!(table.len(), n);
        for row in &table.rows {
            let season = row.component("yearly").unwrap();
            assert_relative_eq!(row.total, row.trend + season, epsilon = 1e-9);
        }

        // The fitted seasonal amplitude is close to the generating one
        let max_season = table
            .rows
            .iter()
            .map(|r| r.component("yearly").unwrap())
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(
            (max_season - 12.0).abs() < 2.0,
            "seasonal peak {} far from 12",
            max_season
        );
    }

    #[test]
    fn test_multiplicative_reconciliation() {
        // Trend scaled by a +-20% monthly factor
        let n = 240;
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64;
                let trend = 50.0 + 0.3 * t;
                trend * (1.0 + 0.2 * (2.0 * std::f64::consts::PI * t / 30.0).sin())
            })
            .collect();
        let series = daily_series(values);
        let spec = ModelSpec::new("y")
            .growth(Growth::linear().with_changepoints(0))
            .season(Season::new("monthly", 30.0, 5).with_mode(TermMode::Multiplicative));
        let model = fit(&series, &spec).unwrap();

        let table = decompose(&model, series.timestamps(), None).unwrap();
        for row in &table.rows {
            let ratio = row.component("monthly").unwrap();
            assert_relative_eq!(row.total, row.trend * (1.0 + ratio), epsilon = 1e-9);
        }

        // Peak seasonal factor near the generating 1.2x / trough near 0.8x
        let max_ratio = table
            .rows
            .iter()
            .map(|r| r.component("monthly").unwrap())
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(
            (max_ratio - 0.2).abs() < 0.07,
            "peak ratio {} far from 0.2",
            max_ratio
        );
    }

    #[test]
    fn test_missing_future_regressor_fails_without_partial_rows() {
        let n = 40;
        let temps: Vec<f64> = (0..n).map(|i| 15.0 + (i % 7) as f64).collect();
        let values: Vec<f64> = temps.iter().enumerate().map(|(i, t)| i as f64 + 2.0 * t).collect();
        let series = daily_series(values);
        let frame = RegressorFrame::new(series.timestamps().to_vec())
            .with_column("temp", temps)
            .unwrap();

        let spec = ModelSpec::new("y").regressor(Regressor::additive("temp"));
        let model = fit_with_regressors(&series, &spec, &frame).unwrap();

        // Historical decompose works from the retained training frame
        assert!(decompose(&model, series.timestamps(), None).is_ok());

        // Future timestamps without supplied values fail, with no rows
        let future = vec![(n as i64) * MICROS_PER_DAY, (n as i64 + 1) * MICROS_PER_DAY];
        let err = decompose(&model, &future, None).unwrap_err();
        assert!(matches!(
            err,
            crate::error::GroupcastError::MissingRegressor { .. }
        ));

        // Supplying the values makes the same call succeed
        let future_frame = RegressorFrame::new(future.clone())
            .with_column("temp", vec![18.0, 19.0])
            .unwrap();
        let table = decompose(&model, &future, Some(&future_frame)).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_future_trend_extends_deterministically() {
        let series = daily_series((0..50).map(|i| 1.0 + 2.0 * i as f64).collect());
        let spec = ModelSpec::new("y").growth(Growth::linear().with_changepoints(0));
        let model = fit(&series, &spec).unwrap();

        let future = vec![60 * MICROS_PER_DAY, 70 * MICROS_PER_DAY];
        let table = decompose(&model, &future, None).unwrap();
        assert_relative_eq!(table.rows[0].total, 121.0, epsilon = 1.0);
        assert_relative_eq!(table.rows[1].total, 141.0, epsilon = 1.0);
    }
}
