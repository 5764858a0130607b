//! Overnight (close-to-open) return extraction and overnight windows

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate, NaiveTime};
use minute_data::session::{session_close, session_open};
use minute_data::{MinuteSeries, PriceBar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use trade_math::{log_returns, sample_std};

/// Log return from one session's close to the next session's open
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OvernightReturn {
    /// Session the gap opens into
    pub session_date: NaiveDate,
    /// `ln(open / previous close)`
    pub log_return: f64,
}

/// Extract every overnight return in the series
///
/// Only dates with both a 16:00 bar and a 09:30 bar take part. For each
/// consecutive pair of such dates the close of the earlier date's 16:00
/// bar is paired with the close of the later date's 09:30 bar, so the
/// opening print is the price at the end of the first session minute.
/// A date missing either bar is skipped without breaking the chain, so the
/// next return runs from the last qualifying close and can span more than
/// one night. Fewer than two qualifying dates yield an empty vector.
pub fn extract_overnight_returns(series: &MinuteSeries) -> Vec<OvernightReturn> {
    let closes: BTreeMap<NaiveDate, f64> = series
        .bars_at_time(session_close())
        .map(|b| (b.session_date(), b.close))
        .collect();
    let opens: BTreeMap<NaiveDate, f64> = series
        .bars_at_time(session_open())
        .map(|b| (b.session_date(), b.close))
        .collect();

    let paired: Vec<(NaiveDate, f64, f64)> = closes
        .iter()
        .filter_map(|(date, close)| opens.get(date).map(|open| (*date, *close, *open)))
        .collect();

    paired
        .windows(2)
        .map(|w| {
            let (_, prev_close, _) = w[0];
            let (date, _, open) = w[1];
            OvernightReturn {
                session_date: date,
                log_return: (open / prev_close).ln(),
            }
        })
        .collect()
}

/// The most recent `window` overnight log returns, oldest first
pub fn recent_overnight_returns(series: &MinuteSeries, window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(ForecastError::InvalidParameter(
            "Overnight window must be greater than zero".to_string(),
        ));
    }
    let all = extract_overnight_returns(series);
    let start = all.len().saturating_sub(window);
    Ok(all[start..].iter().map(|r| r.log_return).collect())
}

/// Bars from `start_time` on the previous calendar day through 09:30 on `session_date`
pub fn overnight_window(
    series: &MinuteSeries,
    session_date: NaiveDate,
    start_time: NaiveTime,
) -> &[PriceBar] {
    let start = (session_date - Duration::days(1)).and_time(start_time);
    let end = session_date.and_time(session_open());
    series.between(start, end)
}

/// Overnight windows for each requested session date
pub fn overnight_windows(
    series: &MinuteSeries,
    dates: &[NaiveDate],
    start_time: NaiveTime,
) -> BTreeMap<NaiveDate, Vec<PriceBar>> {
    dates
        .iter()
        .map(|date| (*date, overnight_window(series, *date, start_time).to_vec()))
        .collect()
}

/// Realised volatility accumulated over one overnight window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OvernightRealizedVol {
    pub session_date: NaiveDate,
    /// Sample std of minute log returns scaled by the square root of their count
    pub realized_std: f64,
    /// Number of minute log returns in the window
    pub n_ticks: usize,
}

/// Realised volatility of one overnight window
pub fn window_realized_vol(
    series: &MinuteSeries,
    session_date: NaiveDate,
    start_time: NaiveTime,
) -> Result<OvernightRealizedVol> {
    let closes: Vec<f64> = overnight_window(series, session_date, start_time)
        .iter()
        .map(|b| b.close)
        .collect();
    let returns = log_returns(&closes);
    if returns.len() < 2 {
        return Err(ForecastError::InsufficientData(format!(
            "Overnight window for {} has {} returns, need at least 2",
            session_date,
            returns.len()
        )));
    }

    Ok(OvernightRealizedVol {
        session_date,
        realized_std: sample_std(&returns)? * (returns.len() as f64).sqrt(),
        n_ticks: returns.len(),
    })
}

/// Realised overnight volatility for each date that has enough bars
///
/// Dates whose window holds fewer than two returns are skipped.
pub fn overnight_realized_vol(
    series: &MinuteSeries,
    dates: &[NaiveDate],
    start_time: NaiveTime,
) -> Vec<OvernightRealizedVol> {
    dates
        .iter()
        .filter_map(|date| match window_realized_vol(series, *date, start_time) {
            Ok(vol) => Some(vol),
            Err(e) => {
                debug!(session = %date, error = %e, "skipping overnight window");
                None
            }
        })
        .collect()
}
