use std::collections::BTreeMap;

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use jump_forecast::config::EstimatorConfig;
use jump_forecast::dislocation::{analyze_all, analyze_vol_dislocation};
use jump_forecast::estimators::{
    estimate_session, summarize_daily_stats, EstimatorKind, VolatilityEstimate,
};
use jump_forecast::ForecastError;
use minute_data::{MinuteSeries, PriceBar};
use pretty_assertions::assert_eq;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
}

fn minutes_from(day: u32, h: u32, m: u32, n: u32) -> Vec<NaiveDateTime> {
    let start = date(day).and_hms_opt(h, m, 0).unwrap();
    (0..i64::from(n)).map(|i| start + Duration::minutes(i)).collect()
}

/// Minute bars from 08:00 through 10:29 with a deterministic wobble
fn wobbly_session(day: u32) -> Vec<PriceBar> {
    minutes_from(day, 8, 0, 150)
        .into_iter()
        .enumerate()
        .map(|(i, ts)| {
            let x = i as f64;
            let open = 5000.0 + (x * 0.37).sin() * 4.0 + f64::from(day);
            let close = open + (x * 1.3).cos() * 1.5;
            PriceBar::new(ts, open, open.max(close) + 0.75, open.min(close) - 0.75, close, 10.0)
        })
        .collect()
}

fn flat_session(day: u32) -> Vec<PriceBar> {
    minutes_from(day, 8, 0, 150)
        .into_iter()
        .map(|ts| PriceBar::flat(ts, 4321.0))
        .collect()
}

#[test]
fn test_constant_prices_summarise_to_zero() {
    let series = MinuteSeries::new(flat_session(8)).unwrap();
    let stats = summarize_daily_stats(&series, &EstimatorConfig::default()).unwrap();

    let estimates = &stats[&date(8)];
    assert_eq!(estimates.len(), 4);
    for estimate in estimates {
        assert_eq!(estimate.mean, 0.0);
        assert_eq!(estimate.std, Some(0.0));
        assert_eq!(estimate.range, 0.0);
    }
}

#[test]
fn test_summary_covers_every_session_and_estimator() {
    let mut bars = wobbly_session(8);
    bars.extend(wobbly_session(9));
    let series = MinuteSeries::new(bars).unwrap();

    let stats = summarize_daily_stats(&series, &EstimatorConfig::default()).unwrap();
    assert_eq!(stats.keys().copied().collect::<Vec<_>>(), vec![date(8), date(9)]);
    for estimates in stats.values() {
        let kinds: Vec<EstimatorKind> = estimates.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, EstimatorKind::ALL.to_vec());
        assert!(estimates.iter().all(|e| e.mean > 0.0 && e.range >= 0.0));
    }
}

#[test]
fn test_summary_matches_session_series() {
    let bars = wobbly_session(8);
    let config = EstimatorConfig::default();
    let series = estimate_session(EstimatorKind::YangZhang, &bars, &config).unwrap();
    let expected = VolatilityEstimate::from_series(date(8), &series).unwrap();

    let stats = summarize_daily_stats(&MinuteSeries::new(bars).unwrap(), &config).unwrap();
    let summary = stats[&date(8)]
        .iter()
        .find(|e| e.kind == EstimatorKind::YangZhang)
        .copied()
        .unwrap();
    assert_eq!(summary, expected);
}

#[test]
fn test_dislocation_uses_open_bucket() {
    let mut bars = wobbly_session(8);
    bars.extend(wobbly_session(9));
    let series = MinuteSeries::new(bars).unwrap();
    let config = EstimatorConfig::default();
    let reference = BTreeMap::from([(date(8), 0.25), (date(9), 0.05)]);

    let records =
        analyze_vol_dislocation(&series, EstimatorKind::Parkinson, &reference, &config).unwrap();
    assert_eq!(records.len(), 2);

    let session = estimate_session(EstimatorKind::Parkinson, &wobbly_session(8), &config).unwrap();
    let open = date(8).and_hms_opt(9, 30, 0).unwrap();
    let model_iv = session.value_at(open).flatten().unwrap();

    assert_eq!(records[0].session_date, date(8));
    assert_relative_eq!(records[0].model_iv, model_iv);
    assert_relative_eq!(records[0].edge, 0.25 - model_iv);
    assert_relative_eq!(records[1].reference_iv, 0.05);
}

#[test]
fn test_sessions_without_open_or_reference_are_skipped() {
    // Apr 9 stops before 09:30 and Apr 10 has no reference value
    let mut bars = wobbly_session(8);
    bars.extend(wobbly_session(9).into_iter().take(60));
    bars.extend(wobbly_session(10));
    let series = MinuteSeries::new(bars).unwrap();
    let reference = BTreeMap::from([(date(8), 0.2), (date(9), 0.2)]);

    let by_kind = analyze_all(&series, &reference, &EstimatorConfig::default()).unwrap();
    assert_eq!(by_kind.len(), 4);
    for records in by_kind.values() {
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.session_date).collect();
        assert_eq!(dates, vec![date(8)]);
    }
}

#[test]
fn test_session_opening_at_reference_time_is_undefined() {
    // The open bucket is the first bucket, so no window has filled yet
    let bars: Vec<PriceBar> = wobbly_session(8).into_iter().skip(90).collect();
    let series = MinuteSeries::new(bars).unwrap();
    let reference = BTreeMap::from([(date(8), 0.2)]);

    let records = analyze_vol_dislocation(
        &series,
        EstimatorKind::Realized,
        &reference,
        &EstimatorConfig::default(),
    )
    .unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_invalid_window_fails_loudly() {
    let series = MinuteSeries::new(wobbly_session(8)).unwrap();
    let config = EstimatorConfig {
        window: 1,
        ..EstimatorConfig::default()
    };
    assert!(matches!(
        summarize_daily_stats(&series, &config),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(matches!(
        analyze_vol_dislocation(&series, EstimatorKind::Realized, &BTreeMap::new(), &config),
        Err(ForecastError::InvalidParameter(_))
    ));
}
