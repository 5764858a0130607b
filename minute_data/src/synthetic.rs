//! Seeded synthetic minute bars for tests and demos

use crate::session::session_open;
use crate::{DataError, MinuteSeries, PriceBar, Result};
use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Shape of a generated series
#[derive(Debug, Clone, Copy)]
pub struct SyntheticSpec {
    /// First calendar day; weekends are skipped
    pub start_date: NaiveDate,
    /// Number of calendar days to walk through
    pub days: usize,
    /// Bars per session starting at 09:30 (391 reaches the 16:00 bar)
    pub bars_per_day: usize,
    /// Starting price
    pub base_price: f64,
    /// Per-minute log-return standard deviation
    pub minute_volatility: f64,
    /// Per-session log-return standard deviation of the overnight gap
    pub overnight_volatility: f64,
}

/// First generated session unless overridden, a Tuesday
pub const DEFAULT_START_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2024, 1, 2) {
    Some(date) => date,
    None => panic!("2024-01-02 is a valid date"),
};

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            start_date: DEFAULT_START_DATE,
            days: 5,
            bars_per_day: 391,
            base_price: 5000.0,
            minute_volatility: 0.0005,
            overnight_volatility: 0.002,
        }
    }
}

/// Generate a geometric random walk of minute bars
///
/// Every weekday session starts at 09:30 and runs for `bars_per_day`
/// minutes. Between sessions the price gaps by a normal overnight return.
/// Identical generator state yields an identical series.
pub fn generate_minute_bars<R: Rng + ?Sized>(
    rng: &mut R,
    spec: &SyntheticSpec,
) -> Result<MinuteSeries> {
    if spec.base_price <= 0.0 {
        return Err(DataError::InvalidData("Base price must be positive".to_string()));
    }
    let minute = Normal::new(0.0, spec.minute_volatility)
        .map_err(|e| DataError::InvalidData(format!("Minute volatility: {}", e)))?;
    let overnight = Normal::new(0.0, spec.overnight_volatility)
        .map_err(|e| DataError::InvalidData(format!("Overnight volatility: {}", e)))?;

    let mut bars = Vec::with_capacity(spec.days * spec.bars_per_day);
    let mut price = spec.base_price;

    for day in 0..spec.days {
        let date = spec.start_date + Duration::days(day as i64);
        if date.weekday().num_days_from_monday() > 4 {
            continue;
        }
        if !bars.is_empty() {
            price *= overnight.sample(rng).exp();
        }

        for i in 0..spec.bars_per_day {
            let timestamp = date.and_time(session_open()) + Duration::minutes(i as i64);
            let open = price;
            price *= minute.sample(rng).exp();
            let close = price;

            // Wicks extend past the body by a fraction of the minute move
            let wick = open * spec.minute_volatility * rng.gen::<f64>();
            let high = open.max(close) + wick;
            let low = (open.min(close) - wick).max(f64::MIN_POSITIVE);
            let volume = 1000.0 * (0.5 + rng.gen::<f64>());

            bars.push(PriceBar::new(timestamp, open, high, low, close, volume));
        }
    }

    MinuteSeries::new(bars)
}
