//! Regular trading session boundaries
//!
//! The cash index session runs 09:30 to 16:00 exchange time. Futures trade
//! around the clock, so a session "date" is simply the calendar date of the
//! exchange-local timestamp.

use crate::PriceBar;
use chrono::{NaiveDate, NaiveTime};

/// Minutes in the regular 09:30-16:00 session
pub const TRADING_MINUTES: u32 = 390;

/// Session open, 09:30 exchange time
pub const SESSION_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(time) => time,
    None => panic!("09:30 is a valid time"),
};

/// Session close, 16:00 exchange time
pub const SESSION_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(16, 0, 0) {
    Some(time) => time,
    None => panic!("16:00 is a valid time"),
};

/// Session open, 09:30 exchange time
pub fn session_open() -> NaiveTime {
    SESSION_OPEN
}

/// Session close, 16:00 exchange time
pub fn session_close() -> NaiveTime {
    SESSION_CLOSE
}

/// Split time-ordered bars into consecutive per-date slices
pub fn group_by_session(bars: &[PriceBar]) -> Vec<(NaiveDate, &[PriceBar])> {
    let mut groups = Vec::new();
    let mut start = 0;

    for i in 1..=bars.len() {
        let boundary = i == bars.len() || bars[i].session_date() != bars[start].session_date();
        if boundary {
            groups.push((bars[start].session_date(), &bars[start..i]));
            start = i;
        }
    }

    groups
}

/// Bars of one session at or after `from`
pub fn from_time(bars: &[PriceBar], from: NaiveTime) -> &[PriceBar] {
    let start = bars.partition_point(|b| b.time() < from);
    &bars[start..]
}
