//! Basis construction for the per-series fit: changepoint grid, trend basis,
//! Fourier seasonality columns, holiday indicators and regressor scaling.

use crate::series::{micros_to_datetime, MICROS_PER_DAY};
use crate::spec::{GrowthKind, Holiday, Season};
use chrono::Days;

/// Candidate changepoint locations on scaled time.
///
/// Candidates are placed at observed times, evenly spaced over the first
/// `range` fraction of the training span, excluding the very first
/// observation. The grid shrinks when the series has fewer interior points
/// than requested.
pub(crate) fn changepoint_grid(t_scaled: &[f64], n_changepoints: usize, range: f64) -> Vec<f64> {
    if n_changepoints == 0 || t_scaled.len() < 3 {
        return Vec::new();
    }

    // Observations inside the changepoint window, first point excluded.
    let hist_size = ((t_scaled.len() as f64) * range).floor() as usize;
    let hist = &t_scaled[..hist_size.min(t_scaled.len())];
    if hist.len() < 2 {
        return Vec::new();
    }

    let n = n_changepoints.min(hist.len() - 1);
    let mut grid = Vec::with_capacity(n);
    for j in 1..=n {
        let idx = (j as f64 * (hist.len() - 1) as f64 / n as f64).round() as usize;
        let s = hist[idx.clamp(1, hist.len() - 1)];
        if grid.last() != Some(&s) {
            grid.push(s);
        }
    }
    grid
}

/// Hinge basis value for one changepoint: slope-change contribution at `t`.
pub(crate) fn hinge(t: f64, changepoint: f64) -> f64 {
    (t - changepoint).max(0.0)
}

/// Trend basis columns on scaled time.
///
/// Linear and logistic use `[t, 1, hinge_j(t)...]` (slope, offset, slope
/// changes); flat growth is offset-only.
pub(crate) fn trend_columns(
    t_scaled: &[f64],
    kind: GrowthKind,
    changepoints: &[f64],
) -> Vec<Vec<f64>> {
    match kind {
        GrowthKind::Flat => vec![vec![1.0; t_scaled.len()]],
        GrowthKind::Linear | GrowthKind::Logistic => {
            let mut cols = Vec::with_capacity(2 + changepoints.len());
            cols.push(t_scaled.to_vec());
            cols.push(vec![1.0; t_scaled.len()]);
            for &s in changepoints {
                cols.push(t_scaled.iter().map(|&t| hinge(t, s)).collect());
            }
            cols
        }
    }
}

/// Fourier basis columns for one season term: two columns per harmonic,
/// phased on absolute time in days so historical and future timestamps share
/// one basis.
pub(crate) fn fourier_columns(timestamps: &[i64], season: &Season) -> Vec<Vec<f64>> {
    let mut cols = Vec::with_capacity(2 * season.fourier_order);
    for harmonic in 1..=season.fourier_order {
        let omega = 2.0 * std::f64::consts::PI * harmonic as f64 / season.period_days;
        let cos_col = timestamps
            .iter()
            .map(|&ts| {
                let t_days = ts as f64 / MICROS_PER_DAY as f64;
                (omega * t_days).cos()
            })
            .collect();
        let sin_col = timestamps
            .iter()
            .map(|&ts| {
                let t_days = ts as f64 / MICROS_PER_DAY as f64;
                (omega * t_days).sin()
            })
            .collect();
        cols.push(cos_col);
        cols.push(sin_col);
    }
    cols
}

/// Holiday indicator columns: one per day-offset in the window, set to 1.0
/// when the timestamp's date falls on `holiday date + offset`.
pub(crate) fn holiday_columns(timestamps: &[i64], holiday: &Holiday) -> Vec<Vec<f64>> {
    let (lower, upper) = holiday.window;
    let mut cols = Vec::with_capacity((upper - lower + 1).max(0) as usize);

    for offset in lower..=upper {
        let active: std::collections::HashSet<chrono::NaiveDate> = holiday
            .dates
            .iter()
            .filter_map(|&d| {
                if offset >= 0 {
                    d.checked_add_days(Days::new(offset as u64))
                } else {
                    d.checked_sub_days(Days::new((-offset) as u64))
                }
            })
            .collect();

        cols.push(
            timestamps
                .iter()
                .map(|&ts| {
                    if active.contains(&micros_to_datetime(ts).date()) {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect(),
        );
    }
    cols
}

/// Standardize a regressor column; returns (mean, std, standardized values).
/// Constant columns keep std = 1 so they pass through centred.
pub(crate) fn standardize(values: &[f64]) -> (f64, f64, Vec<f64>) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = if variance.sqrt() > f64::EPSILON {
        variance.sqrt()
    } else {
        1.0
    };
    let standardized = values.iter().map(|v| (v - mean) / std).collect();
    (mean, std, standardized)
}
