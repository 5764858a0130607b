//! Intraday volatility estimators over resampled bars
//!
//! All four estimators produce one value per resampled bar from a rolling
//! window of `w` bars and scale it by `sqrt(trading_minutes / w)`. A value
//! is `None` until its window is filled with defined terms.
//!
//! | Estimator    | Inputs                          |
//! |--------------|---------------------------------|
//! | Realized     | close-to-close                  |
//! | Parkinson    | high/low range                  |
//! | Garman-Klass | range and open-to-close         |
//! | Yang-Zhang   | gap, open-to-close and range    |

use crate::config::EstimatorConfig;
use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use minute_data::session::group_by_session;
use minute_data::{resample, MinuteSeries, PriceBar};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use trade_math::{mean, rolling_mean, rolling_std, rolling_var, sample_std};

/// The four supported estimators
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EstimatorKind {
    Realized,
    Parkinson,
    GarmanKlass,
    YangZhang,
}

impl EstimatorKind {
    pub const ALL: [EstimatorKind; 4] = [
        EstimatorKind::Realized,
        EstimatorKind::Parkinson,
        EstimatorKind::GarmanKlass,
        EstimatorKind::YangZhang,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EstimatorKind::Realized => "Realized",
            EstimatorKind::Parkinson => "Parkinson",
            EstimatorKind::GarmanKlass => "GarmanKlass",
            EstimatorKind::YangZhang => "YangZhang",
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Estimator values aligned with the timestamps of the bars they were computed on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatorSeries {
    pub kind: EstimatorKind,
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<Option<f64>>,
}

impl EstimatorSeries {
    /// Value at an exact timestamp
    ///
    /// The outer `None` means no bar carries the timestamp, the inner one
    /// that the estimator is undefined there.
    pub fn value_at(&self, timestamp: NaiveDateTime) -> Option<Option<f64>> {
        self.timestamps
            .binary_search(&timestamp)
            .ok()
            .map(|i| self.values[i])
    }

    /// Defined values in time order
    pub fn defined(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }
}

fn validate_window(window: usize, trading_minutes: u32) -> Result<()> {
    if window < 2 {
        return Err(ForecastError::InvalidParameter(format!(
            "estimator window must be at least 2, got {}",
            window
        )));
    }
    if trading_minutes == 0 {
        return Err(ForecastError::InvalidParameter(
            "trading_minutes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn scale(window: usize, trading_minutes: u32) -> f64 {
    (f64::from(trading_minutes) / window as f64).sqrt()
}

fn series(
    kind: EstimatorKind,
    bars: &[PriceBar],
    values: Vec<Option<f64>>,
    window: usize,
    trading_minutes: u32,
) -> EstimatorSeries {
    let factor = scale(window, trading_minutes);
    EstimatorSeries {
        kind,
        timestamps: bars.iter().map(|b| b.timestamp).collect(),
        values: values.into_iter().map(|v| v.map(|v| v * factor)).collect(),
    }
}

/// `ln(H/L)^2` for every bar
fn range_terms(bars: &[PriceBar]) -> Vec<Option<f64>> {
    bars.iter()
        .map(|b| Some((b.high / b.low).ln().powi(2)))
        .collect()
}

/// `ln(C/O)` for every bar
fn body_terms(bars: &[PriceBar]) -> Vec<Option<f64>> {
    bars.iter().map(|b| Some((b.close / b.open).ln())).collect()
}

/// Term from the previous bar's close to this bar's value, undefined for the first bar
fn lagged_terms<F>(bars: &[PriceBar], current: F) -> Vec<Option<f64>>
where
    F: Fn(&PriceBar) -> f64,
{
    std::iter::once(None)
        .chain(bars.windows(2).map(|w| Some((current(&w[1]) / w[0].close).ln())))
        .take(bars.len())
        .collect()
}

fn sqrt_non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v >= 0.0).map(f64::sqrt)
}

/// Rolling sample std of close-to-close log returns
pub fn realized_vol(
    bars: &[PriceBar],
    window: usize,
    trading_minutes: u32,
) -> Result<EstimatorSeries> {
    validate_window(window, trading_minutes)?;
    let returns = lagged_terms(bars, |b| b.close);
    let values = rolling_std(&returns, window)?;
    Ok(series(EstimatorKind::Realized, bars, values, window, trading_minutes))
}

/// Range-based estimator: `sqrt(mean(ln(H/L)^2) / (4 ln 2))`
pub fn parkinson_vol(
    bars: &[PriceBar],
    window: usize,
    trading_minutes: u32,
) -> Result<EstimatorSeries> {
    validate_window(window, trading_minutes)?;
    let factor = 1.0 / (4.0 * std::f64::consts::LN_2);
    let values = rolling_mean(&range_terms(bars), window)?
        .into_iter()
        .map(|v| sqrt_non_negative(v.map(|v| factor * v)))
        .collect();
    Ok(series(EstimatorKind::Parkinson, bars, values, window, trading_minutes))
}

/// `sqrt(mean(0.5 ln(H/L)^2 - (2 ln 2 - 1) ln(C/O)^2))`
///
/// A window whose mean is negative has no real root and is `None`.
pub fn garman_klass_vol(
    bars: &[PriceBar],
    window: usize,
    trading_minutes: u32,
) -> Result<EstimatorSeries> {
    validate_window(window, trading_minutes)?;
    let body_weight = 2.0 * std::f64::consts::LN_2 - 1.0;
    let terms: Vec<Option<f64>> = bars
        .iter()
        .map(|b| {
            let hl = (b.high / b.low).ln().powi(2);
            let oc = (b.close / b.open).ln().powi(2);
            Some(0.5 * hl - body_weight * oc)
        })
        .collect();
    let values = rolling_mean(&terms, window)?
        .into_iter()
        .map(sqrt_non_negative)
        .collect();
    Ok(series(EstimatorKind::GarmanKlass, bars, values, window, trading_minutes))
}

/// Weight of the range term in Yang-Zhang for a window of `w` bars
pub fn yang_zhang_weight(window: usize) -> f64 {
    let w = window as f64;
    0.34 / (1.34 + (w + 1.0) / (w - 1.0))
}

/// `sqrt(var(gap) + k mean(ln(H/L)^2) + (1 - k) var(ln(C/O)))`
///
/// The gap term is the log of this bar's open over the previous bar's close.
pub fn yang_zhang_vol(
    bars: &[PriceBar],
    window: usize,
    trading_minutes: u32,
) -> Result<EstimatorSeries> {
    validate_window(window, trading_minutes)?;
    let k = yang_zhang_weight(window);
    let gap_var = rolling_var(&lagged_terms(bars, |b| b.open), window)?;
    let range_mean = rolling_mean(&range_terms(bars), window)?;
    let body_var = rolling_var(&body_terms(bars), window)?;

    let values = gap_var
        .into_iter()
        .zip(range_mean)
        .zip(body_var)
        .map(|((gap, range), body)| {
            let total = match (gap, range, body) {
                (Some(g), Some(r), Some(b)) => Some(g + k * r + (1.0 - k) * b),
                _ => None,
            };
            sqrt_non_negative(total)
        })
        .collect();
    Ok(series(EstimatorKind::YangZhang, bars, values, window, trading_minutes))
}

/// Run one estimator over already resampled bars
pub fn estimate(
    kind: EstimatorKind,
    bars: &[PriceBar],
    window: usize,
    trading_minutes: u32,
) -> Result<EstimatorSeries> {
    match kind {
        EstimatorKind::Realized => realized_vol(bars, window, trading_minutes),
        EstimatorKind::Parkinson => parkinson_vol(bars, window, trading_minutes),
        EstimatorKind::GarmanKlass => garman_klass_vol(bars, window, trading_minutes),
        EstimatorKind::YangZhang => yang_zhang_vol(bars, window, trading_minutes),
    }
}

/// Resample one session's minute bars and run one estimator over them
pub fn estimate_session(
    kind: EstimatorKind,
    session_bars: &[PriceBar],
    config: &EstimatorConfig,
) -> Result<EstimatorSeries> {
    let resampled = resample(session_bars, config.resample_minutes)?;
    estimate(kind, &resampled, config.window, config.trading_minutes)
}

/// Distribution of one estimator's values within a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityEstimate {
    pub session_date: NaiveDate,
    pub kind: EstimatorKind,
    /// Mean of the defined values
    pub mean: f64,
    /// Sample std of the defined values; needs at least two of them
    pub std: Option<f64>,
    /// Largest minus smallest defined value
    pub range: f64,
}

impl VolatilityEstimate {
    /// Summarise an estimator series; `None` when it has no defined value
    pub fn from_series(session_date: NaiveDate, series: &EstimatorSeries) -> Option<Self> {
        let values = series.defined();
        let mean = mean(&values).ok()?;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        Some(Self {
            session_date,
            kind: series.kind,
            mean,
            std: sample_std(&values).ok(),
            range: max - min,
        })
    }
}

/// Summaries of every estimator over one session's minute bars
///
/// Estimators with no defined value in the session are left out.
pub fn summarize_session(
    session_date: NaiveDate,
    session_bars: &[PriceBar],
    config: &EstimatorConfig,
) -> Result<Vec<VolatilityEstimate>> {
    let resampled = resample(session_bars, config.resample_minutes)?;
    let mut estimates = Vec::with_capacity(EstimatorKind::ALL.len());
    for kind in EstimatorKind::ALL {
        let series = estimate(kind, &resampled, config.window, config.trading_minutes)?;
        match VolatilityEstimate::from_series(session_date, &series) {
            Some(estimate) => estimates.push(estimate),
            None => debug!(
                session = %session_date,
                estimator = %kind,
                "no defined estimator values"
            ),
        }
    }
    Ok(estimates)
}

/// Per-session estimator summaries, keyed by session date
///
/// Sessions too short to fill a single window are omitted.
pub fn summarize_daily_stats(
    series: &MinuteSeries,
    config: &EstimatorConfig,
) -> Result<BTreeMap<NaiveDate, Vec<VolatilityEstimate>>> {
    config.validate()?;
    let sessions = group_by_session(series.bars());

    let summaries = sessions
        .par_iter()
        .map(|(date, bars)| summarize_session(*date, bars, config).map(|s| (*date, s)))
        .collect::<Result<Vec<_>>>()?;

    Ok(summaries
        .into_iter()
        .filter(|(_, estimates)| !estimates.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn bar(minute: u32, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            + chrono::Duration::minutes(i64::from(minute));
        PriceBar::new(ts, open, high, low, close, 1.0)
    }

    fn wavy_bars(n: u32) -> Vec<PriceBar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (f64::from(i) * 0.9).sin();
                let close = base + (f64::from(i) * 1.7).cos() * 0.3;
                bar(i, base, base.max(close) + 0.2, base.min(close) - 0.2, close)
            })
            .collect()
    }

    #[rstest]
    #[case(EstimatorKind::Realized)]
    #[case(EstimatorKind::Parkinson)]
    #[case(EstimatorKind::GarmanKlass)]
    #[case(EstimatorKind::YangZhang)]
    fn test_constant_prices_give_zero(#[case] kind: EstimatorKind) {
        let bars: Vec<PriceBar> = (0..10).map(|i| bar(i, 4200.0, 4200.0, 4200.0, 4200.0)).collect();
        let series = estimate(kind, &bars, 5, 390).unwrap();
        let defined = series.defined();
        assert!(!defined.is_empty());
        assert!(defined.iter().all(|v| *v == 0.0));
    }

    #[rstest]
    #[case(EstimatorKind::Realized, 5)]
    #[case(EstimatorKind::Parkinson, 4)]
    #[case(EstimatorKind::GarmanKlass, 4)]
    #[case(EstimatorKind::YangZhang, 5)]
    fn test_warm_up_length(#[case] kind: EstimatorKind, #[case] undefined: usize) {
        let series = estimate(kind, &wavy_bars(12), 5, 390).unwrap();
        assert_eq!(series.values.len(), 12);
        assert!(series.values[..undefined].iter().all(Option::is_none));
        assert!(series.values[undefined..].iter().all(Option::is_some));
    }

    #[test]
    fn test_parkinson_matches_closed_form() {
        // Every bar spans ln(H/L) = 0.01
        let bars: Vec<PriceBar> = (0..5)
            .map(|i| bar(i, 100.0, 100.0 * 0.01_f64.exp(), 100.0, 100.0))
            .collect();
        let series = parkinson_vol(&bars, 5, 390).unwrap();
        let expected = (0.0001 / (4.0 * std::f64::consts::LN_2)).sqrt() * (390.0_f64 / 5.0).sqrt();
        assert_relative_eq!(series.values[4].unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_window_vol_scales_with_session_length() {
        let bars: Vec<PriceBar> = (0..10)
            .map(|i| bar(i, 100.0, 100.0 * 0.01_f64.exp(), 100.0, 100.0))
            .collect();
        let short = parkinson_vol(&bars, 5, 390).unwrap().values[9].unwrap();
        let long = parkinson_vol(&bars, 10, 260).unwrap().values[9].unwrap();
        assert_relative_eq!(
            long / short,
            (260.0_f64 / 10.0).sqrt() / (390.0_f64 / 5.0).sqrt(),
            epsilon = 1e-12
        );
        assert_relative_eq!(scale(10, 260), 26.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_garman_klass_negative_mean_is_undefined() {
        // A body far wider than the range makes the mean term negative
        let bars: Vec<PriceBar> = (0..3).map(|i| bar(i, 100.0, 100.5, 100.0, 110.0)).collect();
        let series = garman_klass_vol(&bars, 2, 390).unwrap();
        assert!(series.values.iter().all(Option::is_none));

        let sane: Vec<PriceBar> = (0..3).map(|i| bar(i, 100.0, 110.0, 99.0, 108.0)).collect();
        let series = garman_klass_vol(&sane, 2, 390).unwrap();
        assert!(series.values[1].unwrap() > 0.0);
    }

    #[test]
    fn test_yang_zhang_weight() {
        assert_relative_eq!(yang_zhang_weight(5), 0.34 / (1.34 + 1.5));
    }

    #[test]
    fn test_window_must_be_at_least_two() {
        for kind in EstimatorKind::ALL {
            assert!(matches!(
                estimate(kind, &wavy_bars(5), 1, 390),
                Err(ForecastError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_value_at_distinguishes_missing_bar_from_undefined_value() {
        let bars = wavy_bars(6);
        let series = realized_vol(&bars, 5, 390).unwrap();
        assert_eq!(series.value_at(bars[0].timestamp), Some(None));
        assert!(series.value_at(bars[5].timestamp).unwrap().is_some());
        assert_eq!(series.value_at(bars[0].timestamp - chrono::Duration::minutes(1)), None);
    }

    #[test]
    fn test_summary_statistics() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let series = EstimatorSeries {
            kind: EstimatorKind::Parkinson,
            timestamps: (0..4).map(|i| bar(i, 1.0, 1.0, 1.0, 1.0).timestamp).collect(),
            values: vec![None, Some(1.0), Some(3.0), Some(2.0)],
        };
        let estimate = VolatilityEstimate::from_series(date, &series).unwrap();
        assert_relative_eq!(estimate.mean, 2.0);
        assert_relative_eq!(estimate.std.unwrap(), 1.0);
        assert_relative_eq!(estimate.range, 2.0);

        let empty = EstimatorSeries {
            values: vec![None; 4],
            ..series
        };
        assert!(VolatilityEstimate::from_series(date, &empty).is_none());
    }
}
