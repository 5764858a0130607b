//! # Minute Data
//!
//! `minute_data` is the time series store behind the volatility engine: an
//! ordered, timestamp-unique series of minute OHLCV bars expressed in the
//! exchange's local wall-clock time.
//!
//! The crate provides:
//!
//! - **Bars and series**: [`PriceBar`] and the validated [`MinuteSeries`]
//! - **Sessions**: session open/close times and per-session slicing
//! - **Resampling**: left-closed, left-labelled OHLCV buckets
//! - **Loading**: CSV readers for minute bars and per-session values
//! - **Synthetic data**: seeded random-walk bars for tests and demos
//!
//! ## Usage Example
//!
//! ```no_run
//! use minute_data::loader::load_minute_bars;
//! use minute_data::session::session_open;
//!
//! let series = load_minute_bars(
//!     "es_futures_1m_all.csv",
//!     chrono_tz::UTC,
//!     chrono_tz::America::New_York,
//! )?;
//!
//! for date in series.session_dates() {
//!     let opening = series.bar_at(date.and_time(session_open()));
//!     println!("{date}: {:?}", opening.map(|b| b.close));
//! }
//! # Ok::<(), minute_data::DataError>(())
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod loader;
pub mod resample;
pub mod session;
pub mod synthetic;

pub use resample::resample;
pub use session::{session_close, session_open};

/// Errors that can occur while building or loading minute series
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for minute data operations
pub type Result<T> = std::result::Result<T, DataError>;

/// One OHLCV bar stamped with the exchange-local time it opened
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Exchange-local timestamp of the bar
    pub timestamp: NaiveDateTime,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

impl PriceBar {
    /// Create a new bar
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A bar that traded at a single price
    pub fn flat(timestamp: NaiveDateTime, price: f64) -> Self {
        Self::new(timestamp, price, price, price, price, 0.0)
    }

    /// Trading session (calendar date) the bar belongs to
    pub fn session_date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Wall-clock time of the bar
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }

    fn validate(&self) -> Result<()> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(DataError::InvalidData(format!(
                "Bar at {} has a non-positive or non-finite price",
                self.timestamp
            )));
        }
        if self.high < self.low {
            return Err(DataError::InvalidData(format!(
                "Bar at {} has high {} below low {}",
                self.timestamp, self.high, self.low
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(DataError::InvalidData(format!(
                "Bar at {} has invalid volume {}",
                self.timestamp, self.volume
            )));
        }
        Ok(())
    }
}

/// Ordered minute bars with unique timestamps in one exchange timezone
#[derive(Debug, Clone)]
pub struct MinuteSeries {
    bars: Vec<PriceBar>,
    timezone: Tz,
}

impl MinuteSeries {
    /// Build a series from bars already in strictly increasing time order
    ///
    /// The timestamps are taken to be wall-clock times in `America/New_York`.
    pub fn new(bars: Vec<PriceBar>) -> Result<Self> {
        Self::with_timezone(bars, chrono_tz::America::New_York)
    }

    /// Build a series whose timestamps are wall-clock times in `timezone`
    pub fn with_timezone(bars: Vec<PriceBar>, timezone: Tz) -> Result<Self> {
        for bar in &bars {
            bar.validate()?;
        }
        if let Some(pair) = bars.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(DataError::InvalidData(format!(
                "Timestamps must be strictly increasing: {} is followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
        Ok(Self { bars, timezone })
    }

    /// Sort the bars by timestamp, then build the series
    ///
    /// Duplicate timestamps are still rejected.
    pub fn from_unsorted(mut bars: Vec<PriceBar>, timezone: Tz) -> Result<Self> {
        bars.sort_by_key(|b| b.timestamp);
        Self::with_timezone(bars, timezone)
    }

    /// All bars in time order
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// Exchange timezone of the wall-clock timestamps
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Number of bars
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Whether the series has no bars
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Last bar of the series
    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Distinct session dates in ascending order
    pub fn session_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.bars.iter().map(PriceBar::session_date).collect();
        dates.dedup();
        dates
    }

    /// Most recent session date
    pub fn latest_session_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(PriceBar::session_date)
    }

    /// Bars belonging to one session date
    pub fn session(&self, date: NaiveDate) -> &[PriceBar] {
        let start = self.bars.partition_point(|b| b.session_date() < date);
        let end = self.bars.partition_point(|b| b.session_date() <= date);
        &self.bars[start..end]
    }

    /// Bars with `start <= timestamp <= end`
    pub fn between(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[PriceBar] {
        if end < start {
            return &[];
        }
        let lo = self.bars.partition_point(|b| b.timestamp < start);
        let hi = self.bars.partition_point(|b| b.timestamp <= end);
        &self.bars[lo..hi]
    }

    /// Bar stamped exactly at `timestamp`
    pub fn bar_at(&self, timestamp: NaiveDateTime) -> Option<&PriceBar> {
        self.bars
            .binary_search_by_key(&timestamp, |b| b.timestamp)
            .ok()
            .map(|i| &self.bars[i])
    }

    /// Bars whose wall-clock time equals `time`, one per session at most
    pub fn bars_at_time(&self, time: NaiveTime) -> impl Iterator<Item = &PriceBar> + '_ {
        self.bars.iter().filter(move |b| b.time() == time)
    }

    /// Timestamp of a bar as a zoned datetime
    ///
    /// Wall-clock times repeated by a DST fall-back resolve to the earlier
    /// instant; times skipped by spring-forward yield `None`.
    pub fn zoned_timestamp(&self, bar: &PriceBar) -> Option<DateTime<Tz>> {
        self.timezone.from_local_datetime(&bar.timestamp).earliest()
    }
}
