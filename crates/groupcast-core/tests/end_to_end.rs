//! End-to-end pipeline tests over the public API: build a grouped table,
//! fit every key, decompose, and simulate.

use groupcast_core::{
    decompose, decompose_all, fit_all, simulate_all, FittedModel, GroupKey, ModelSpec,
    ObservationTable, RegressorFrame,
};

const DAY: i64 = 86_400_000_000;

fn single_column_table(keys: &[(&str, usize)]) -> ObservationTable {
    let mut table = ObservationTable::new(vec!["store".into()], "sales", vec![]);
    for &(key, n) in keys {
        for i in 0..n as i64 {
            table
                .push_row(GroupKey::single(key), i * DAY, 10.0 + i as f64, &[])
                .unwrap();
        }
    }
    table
}

#[test]
fn test_batch_fits_are_independent() {
    // Two very different series under one auto-mode specification: a steep
    // trend with no weekly pattern, and a flat series with a strong weekly
    // pattern. Each fit must reflect its own series only.
    let mut table = ObservationTable::new(vec!["store".into()], "sales", vec![]);
    for i in 0..120i64 {
        let day = i as f64;
        table
            .push_row(GroupKey::single("trending"), i * DAY, 10.0 + 2.0 * day, &[])
            .unwrap();
        let weekly = 5.0 * (2.0 * std::f64::consts::PI * day / 7.0).sin();
        table
            .push_row(GroupKey::single("weekly"), i * DAY, 50.0 + weekly, &[])
            .unwrap();
    }

    let models = fit_all(&table, &ModelSpec::auto("sales")).unwrap();
    assert_eq!(models.summary().n_failed, 0);

    let trending = models
        .get(&GroupKey::single("trending"))
        .unwrap()
        .as_ref()
        .unwrap();
    let flat = models
        .get(&GroupKey::single("weekly"))
        .unwrap()
        .as_ref()
        .unwrap();

    // 120 daily points activates the weekly season only
    assert_eq!(
        trending
            .spec()
            .seasons()
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>(),
        vec!["weekly"]
    );

    let slope = |m: &FittedModel| (m.trend_at(119 * DAY) - m.trend_at(0)) / 119.0;
    let s_trend = slope(trending);
    assert!(
        (s_trend - 2.0).abs() < 0.2,
        "trending slope {} not within 10% of 2.0",
        s_trend
    );
    assert!(
        slope(flat).abs() < 0.2,
        "flat slope {} too steep",
        slope(flat)
    );

    // Weekly effect amplitude, in response units, from decomposition
    let ts: Vec<i64> = (0..28).map(|i| i * DAY).collect();
    let amplitude = |m: &FittedModel| {
        decompose(m, &ts, None)
            .unwrap()
            .rows
            .iter()
            .map(|r| r.component("weekly").unwrap_or(0.0).abs())
            .fold(0.0_f64, f64::max)
    };
    assert!(
        amplitude(flat) > 3.0,
        "weekly amplitude {} too small",
        amplitude(flat)
    );
    assert!(
        amplitude(trending) < 1.0,
        "spurious weekly amplitude {}",
        amplitude(trending)
    );
}

#[test]
fn test_full_pipeline_simulate_all_is_deterministic() {
    let table = single_column_table(&[("a", 60), ("b", 60)]);
    let models = fit_all(&table, &ModelSpec::new("sales")).unwrap();

    let future: Vec<i64> = (60..75).map(|i| i * DAY).collect();
    let x = simulate_all(&models, &future, 50, 9, None).unwrap();
    let y = simulate_all(&models, &future, 50, 9, None).unwrap();

    assert_eq!(x.len(), 30);
    for (rx, ry) in x.rows.iter().zip(&y.rows) {
        assert_eq!(rx.key, ry.key);
        assert_eq!(rx.paths, ry.paths);
    }
    // First 15 rows belong to the first discovered key
    assert_eq!(x.rows[0].key, Some(GroupKey::single("a")));
    assert_eq!(x.rows[29].key, Some(GroupKey::single("b")));
}

#[test]
fn test_pipeline_with_regressors_and_future_frames() {
    // One key whose response tracks a regressor column end to end
    let mut table =
        ObservationTable::new(vec!["store".into()], "sales", vec!["promo".into()]);
    for i in 0..50i64 {
        let promo = if i % 10 == 0 { 1.0 } else { 0.0 };
        table
            .push_row(
                GroupKey::single("a"),
                i * DAY,
                20.0 + 0.5 * i as f64 + 6.0 * promo,
                &[promo],
            )
            .unwrap();
    }
    let spec = ModelSpec::new("sales")
        .regressor(groupcast_core::Regressor::additive("promo"));
    let models = fit_all(&table, &spec).unwrap();
    assert_eq!(models.summary().n_failed, 0);

    // Future decompose needs future promo values, supplied per key
    let future: Vec<i64> = (50..55).map(|i| i * DAY).collect();
    let frame = RegressorFrame::new(future.clone())
        .with_column("promo", vec![1.0, 0.0, 0.0, 0.0, 0.0])
        .unwrap();
    let mut frames = groupcast_core::KeyedFrames::new();
    frames.insert(GroupKey::single("a"), frame);

    let components = decompose_all(&models, &future, Some(&frames)).unwrap();
    assert_eq!(components.len(), 5);
    // The promo day carries the regressor effect, the quiet days do not
    let promo_effect = components.rows[0].component("promo").unwrap();
    let quiet_effect = components.rows[1].component("promo").unwrap();
    assert!(
        promo_effect - quiet_effect > 4.0,
        "promo lift {} vs quiet {}",
        promo_effect,
        quiet_effect
    );

    let forecast = simulate_all(&models, &future, 30, 5, Some(&frames)).unwrap();
    assert_eq!(forecast.len(), 5);
    assert!(forecast.rows.iter().all(|r| r.paths.len() == 30));
}
