//! CSV loading for minute bars and per-session reference values
//!
//! The expected minute-bar format is:
//! Datetime,Open,High,Low,Close,Volume
//! 2024-01-02 14:30:00,4780.25,4781.00,4779.75,4780.50,1532
//!
//! Header names are matched case-insensitively; `timestamp` and `date` are
//! accepted in place of `Datetime`.

use crate::{DataError, MinuteSeries, PriceBar, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use csv::StringRecord;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| {
                DataError::DataLoadError(format!("Missing required column '{}'", names[0]))
            })
        };

        Ok(Self {
            timestamp: require(&["datetime", "timestamp", "date"])?,
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close"])?,
            volume: find(&["volume"]),
        })
    }
}

/// Parse a timestamp and express it as exchange-local wall-clock time
///
/// Timestamps carrying an offset are converted directly; naive timestamps
/// are first interpreted in `source_tz`.
pub fn parse_timestamp(raw: &str, source_tz: Tz, exchange_tz: Tz) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    let with_offset = DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|f| DateTime::<FixedOffset>::parse_from_str(raw, f).ok())
    });
    if let Some(dt) = with_offset {
        return Ok(dt.with_timezone(&exchange_tz).naive_local());
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .ok_or_else(|| DataError::DataLoadError(format!("Unrecognised timestamp '{}'", raw)))?;

    let localized = source_tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| {
            DataError::DataLoadError(format!(
                "Timestamp '{}' does not exist in timezone {}",
                raw, source_tz
            ))
        })?;

    Ok(localized.with_timezone(&exchange_tz).naive_local())
}

fn parse_field(record: &StringRecord, index: usize, name: &str, line: u64) -> Result<f64> {
    let raw = record.get(index).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|e| {
        DataError::DataLoadError(format!("Invalid {} '{}' at line {}: {}", name, raw, line, e))
    })
}

/// Load minute-level OHLCV bars from a CSV file
///
/// # Arguments
/// * `path` - Path to the CSV file
/// * `source_tz` - Timezone of naive timestamps in the file (UTC for vendor exports)
/// * `exchange_tz` - Timezone the series is normalised to
///
/// # Returns
/// * `Result<MinuteSeries>` - Time-ordered series, or an error on malformed
///   rows or duplicate timestamps
pub fn load_minute_bars<P: AsRef<Path>>(
    path: P,
    source_tz: Tz,
    exchange_tz: Tz,
) -> Result<MinuteSeries> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let columns = Columns::from_headers(reader.headers()?)?;
    let mut bars = Vec::new();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let raw_ts = record.get(columns.timestamp).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts, source_tz, exchange_tz)?;
        let volume = match columns.volume {
            Some(idx) => parse_field(&record, idx, "volume", line)?,
            None => 0.0,
        };

        bars.push(PriceBar {
            timestamp,
            open: parse_field(&record, columns.open, "open price", line)?,
            high: parse_field(&record, columns.high, "high price", line)?,
            low: parse_field(&record, columns.low, "low price", line)?,
            close: parse_field(&record, columns.close, "close price", line)?,
            volume,
        });
    }

    if bars.is_empty() {
        return Err(DataError::DataLoadError("No data found in file".to_string()));
    }

    MinuteSeries::from_unsorted(bars, exchange_tz)
}

#[derive(Debug, Deserialize)]
struct SessionValueRecord {
    #[serde(alias = "Date", alias = "session_date")]
    date: NaiveDate,
    #[serde(alias = "Value", alias = "iv", alias = "reference_iv")]
    value: f64,
}

/// Load a `date,value` CSV into a map keyed by session date
///
/// Used for the reference implied-volatility series. A date appearing
/// twice is an error.
pub fn load_session_values<P: AsRef<Path>>(path: P) -> Result<BTreeMap<NaiveDate, f64>> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut values = BTreeMap::new();
    for record in reader.deserialize::<SessionValueRecord>() {
        let record = record?;
        if values.insert(record.date, record.value).is_some() {
            return Err(DataError::InvalidData(format!(
                "Duplicate session date {}",
                record.date
            )));
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    #[test]
    fn test_parse_naive_utc_into_new_york() {
        let local = parse_timestamp("2024-01-02 14:30:00", chrono_tz::UTC, New_York).unwrap();
        assert_eq!(local.to_string(), "2024-01-02 09:30:00");

        // EDT in July
        let summer = parse_timestamp("2024-07-02 13:30:00", chrono_tz::UTC, New_York).unwrap();
        assert_eq!(summer.to_string(), "2024-07-02 09:30:00");
    }

    #[test]
    fn test_parse_with_offset_ignores_source_tz() {
        let local =
            parse_timestamp("2024-01-02T09:30:00-05:00", chrono_tz::Asia::Tokyo, New_York).unwrap();
        assert_eq!(local.to_string(), "2024-01-02 09:30:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("yesterday", chrono_tz::UTC, New_York).is_err());
    }
}
