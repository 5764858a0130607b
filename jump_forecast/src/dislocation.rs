//! Comparison of estimator volatility against a reference implied volatility
//!
//! For every session the estimator value at the reference time (the 09:30
//! open by default) is set against the caller's reference value for that
//! session. The difference is the edge: positive when the reference prices
//! more volatility than the estimator measured.

use crate::config::EstimatorConfig;
use crate::error::{ForecastError, Result};
use crate::estimators::{estimate_session, EstimatorKind, EstimatorSeries};
use chrono::{NaiveDate, NaiveTime};
use minute_data::session::group_by_session;
use minute_data::{MinuteSeries, PriceBar};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Reference and model volatility for one session and estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DislocationRecord {
    pub session_date: NaiveDate,
    pub kind: EstimatorKind,
    pub reference_iv: f64,
    pub model_iv: f64,
    /// `reference_iv - model_iv`
    pub edge: f64,
}

impl DislocationRecord {
    pub fn new(
        session_date: NaiveDate,
        kind: EstimatorKind,
        reference_iv: f64,
        model_iv: f64,
    ) -> Self {
        Self {
            session_date,
            kind,
            reference_iv,
            model_iv,
            edge: reference_iv - model_iv,
        }
    }
}

/// Estimator value at `time` on `session_date`
///
/// Fails with `MissingReferencePoint` when no resampled bar carries that
/// exact timestamp and with `InsufficientData` when the bar exists but its
/// rolling window is not yet filled.
pub fn reference_point(
    series: &EstimatorSeries,
    session_date: NaiveDate,
    time: NaiveTime,
) -> Result<f64> {
    match series.value_at(session_date.and_time(time)) {
        None => Err(ForecastError::MissingReferencePoint { session_date, time }),
        Some(None) => Err(ForecastError::InsufficientData(format!(
            "{} is undefined at {} {}",
            series.kind, session_date, time
        ))),
        Some(Some(value)) => Ok(value),
    }
}

fn session_record(
    kind: EstimatorKind,
    session_date: NaiveDate,
    session_bars: &[PriceBar],
    reference_iv: &BTreeMap<NaiveDate, f64>,
    config: &EstimatorConfig,
) -> Result<DislocationRecord> {
    let reference = reference_iv.get(&session_date).copied().ok_or_else(|| {
        ForecastError::InsufficientData(format!("no reference volatility for {}", session_date))
    })?;
    let series = estimate_session(kind, session_bars, config)?;
    let model_iv = reference_point(&series, session_date, config.reference_time)?;
    Ok(DislocationRecord::new(session_date, kind, reference, model_iv))
}

/// Dislocation records for one estimator, one per eligible session in date order
///
/// Sessions without a reference value, without a bar at the reference time
/// or with an undefined estimator there are skipped. Any other failure is
/// returned.
pub fn analyze_vol_dislocation(
    series: &MinuteSeries,
    kind: EstimatorKind,
    reference_iv: &BTreeMap<NaiveDate, f64>,
    config: &EstimatorConfig,
) -> Result<Vec<DislocationRecord>> {
    config.validate()?;
    let sessions = group_by_session(series.bars());

    let outcomes: Vec<(NaiveDate, Result<DislocationRecord>)> = sessions
        .par_iter()
        .map(|(date, bars)| (*date, session_record(kind, *date, bars, reference_iv, config)))
        .collect();

    let mut records = Vec::with_capacity(outcomes.len());
    for (date, outcome) in outcomes {
        match outcome {
            Ok(record) => records.push(record),
            Err(e) if e.is_recoverable() => {
                debug!(session = %date, estimator = %kind, error = %e, "skipping session");
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        estimator = %kind,
        sessions = sessions.len(),
        records = records.len(),
        "dislocation analysis finished"
    );
    Ok(records)
}

/// Dislocation records for every estimator, grouped by estimator
pub fn analyze_all(
    series: &MinuteSeries,
    reference_iv: &BTreeMap<NaiveDate, f64>,
    config: &EstimatorConfig,
) -> Result<BTreeMap<EstimatorKind, Vec<DislocationRecord>>> {
    EstimatorKind::ALL
        .iter()
        .map(|kind| Ok((*kind, analyze_vol_dislocation(series, *kind, reference_iv, config)?)))
        .collect()
}
