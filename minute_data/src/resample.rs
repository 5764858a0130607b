//! Downsampling of minute bars into wider OHLCV buckets
//!
//! Buckets are left-closed and labelled by their left edge. Edges are laid
//! out every `interval` minutes starting from midnight of the first bar's
//! date, and buckets that receive no bars are not emitted.

use crate::{DataError, PriceBar, Result};
use chrono::{Duration, NaiveDateTime};

/// Aggregate bars into `interval_minutes` buckets
///
/// Open is the first open, high the maximum high, low the minimum low,
/// close the last close and volume the sum of volumes in the bucket. The
/// input must be in time order.
pub fn resample(bars: &[PriceBar], interval_minutes: u32) -> Result<Vec<PriceBar>> {
    if interval_minutes == 0 {
        return Err(DataError::InvalidData(
            "Resample interval must be greater than zero".to_string(),
        ));
    }
    let Some(first) = bars.first() else {
        return Ok(Vec::new());
    };

    let origin = first.session_date().and_time(chrono::NaiveTime::default());
    let width = i64::from(interval_minutes) * 60;
    let bucket_of = |ts: NaiveDateTime| -> NaiveDateTime {
        let offset = (ts - origin).num_seconds().div_euclid(width) * width;
        origin + Duration::seconds(offset)
    };

    let mut out: Vec<PriceBar> = Vec::new();
    for bar in bars {
        let label = bucket_of(bar.timestamp);
        match out.last_mut() {
            Some(current) if current.timestamp == label => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            Some(current) if current.timestamp > label => {
                return Err(DataError::InvalidData(format!(
                    "Bars must be in time order to resample: {} precedes bucket {}",
                    bar.timestamp, current.timestamp
                )));
            }
            _ => out.push(PriceBar { timestamp: label, ..*bar }),
        }
    }

    Ok(out)
}
