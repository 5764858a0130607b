//! Randomised search over calibration hyperparameters
//!
//! Each sampled jump rule is calibrated, simulated and scored against the
//! realised price path. Two scores are reported: the share of realised
//! prices inside the simulated percentile band, and the z-score of the
//! realised volatility within the distribution of simulated path
//! volatilities. Results are ordered by `|z_score|`, best fit first.

use crate::calibration::{calibrate, JumpRule};
use crate::config::{GridSearchConfig, SimulationConfig};
use crate::error::{ForecastError, Result};
use crate::simulation::{PathSimulator, SimulatedPathEnsemble};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trade_math::{log_returns, mean, population_std};

/// How well one ensemble describes the realised path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitScore {
    /// Fraction of realised prices inside the simulated band
    pub coverage: f64,
    /// Standardised distance of realised volatility from the simulated mean
    pub z_score: f64,
    /// Volatility of the realised path
    pub realized_vol: f64,
    /// Mean of the per-path volatilities
    pub mean_vol: f64,
    /// Population std of the per-path volatilities
    pub std_vol: f64,
}

fn validate_observed(observed: &[f64]) -> Result<()> {
    if let Some((i, price)) = observed
        .iter()
        .enumerate()
        .find(|(_, p)| !(p.is_finite() && **p > 0.0))
    {
        return Err(ForecastError::InvalidParameter(format!(
            "observed price at step {} must be positive, got {}",
            i, price
        )));
    }
    Ok(())
}

/// Score an ensemble against the first `n_steps` realised prices
///
/// Fails with `InvalidParameter` when a realised price is zero, negative or
/// not finite, with `InsufficientData` when fewer realised prices than steps
/// are available and with `DegenerateDistribution` when every path has the
/// same volatility or the z-score is not finite.
pub fn score_ensemble(
    ensemble: &SimulatedPathEnsemble,
    observed: &[f64],
    trading_minutes: u32,
    lower_percentile: f64,
    upper_percentile: f64,
) -> Result<FitScore> {
    let n_steps = ensemble.n_steps();
    if observed.len() < n_steps {
        return Err(ForecastError::InsufficientData(format!(
            "Scoring needs {} observed prices, have {}",
            n_steps,
            observed.len()
        )));
    }
    let observed = &observed[..n_steps];
    validate_observed(observed)?;

    let (lower, upper) = ensemble.percentile_band(lower_percentile, upper_percentile)?;
    let inside = observed
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .filter(|(price, (lo, hi))| **lo <= **price && **price <= **hi)
        .count();
    let coverage = inside as f64 / n_steps as f64;

    let path_vols = ensemble.path_volatilities(trading_minutes)?;
    let mean_vol = mean(&path_vols)?;
    let std_vol = population_std(&path_vols)?;
    if std_vol == 0.0 {
        return Err(ForecastError::DegenerateDistribution(
            "all simulated paths have identical volatility".to_string(),
        ));
    }

    let realized_vol =
        population_std(&log_returns(observed))? * f64::from(trading_minutes).sqrt();
    let z_score = (realized_vol - mean_vol) / std_vol;
    if !(realized_vol.is_finite() && z_score.is_finite()) {
        return Err(ForecastError::DegenerateDistribution(format!(
            "z-score {} is not finite (realised vol {}, path vol std {})",
            z_score, realized_vol, std_vol
        )));
    }

    Ok(FitScore {
        coverage,
        z_score,
        realized_vol,
        mean_vol,
        std_vol,
    })
}

/// One scored hyperparameter combination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSearchEntry {
    pub threshold: f64,
    pub jump_std_scale: f64,
    pub lambda_scale: f64,
    pub coverage: f64,
    pub z_score: f64,
}

/// Scored combinations, ascending by `|z_score|`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub entries: Vec<GridSearchEntry>,
    /// Samples dropped for insufficient data or a degenerate ensemble
    pub skipped: usize,
}

impl GridSearchResult {
    /// Best-fitting combination
    pub fn best(&self) -> Option<&GridSearchEntry> {
        self.entries.first()
    }
}

fn draw_uniform<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if lo == hi {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

/// Draw `n_samples` independent uniform jump rules from the configured ranges
pub fn sample_jump_rules<R: Rng + ?Sized>(config: &GridSearchConfig, rng: &mut R) -> Vec<JumpRule> {
    (0..config.n_samples)
        .map(|_| JumpRule {
            threshold: draw_uniform(rng, config.threshold_range),
            jump_std_scale: draw_uniform(rng, config.jump_std_scale_range),
            lambda_scale: draw_uniform(rng, config.lambda_scale_range),
        })
        .collect()
}

/// Inputs shared by every sample of one search
struct SearchContext<'a> {
    returns: &'a [f64],
    s0: f64,
    observed: &'a [f64],
    simulator: PathSimulator,
    grid: &'a GridSearchConfig,
    trading_minutes: u32,
}

impl SearchContext<'_> {
    fn evaluate(&self, rule: &JumpRule, seed: u64) -> Result<GridSearchEntry> {
        let params = calibrate(self.returns, rule)?;
        let ensemble = self
            .simulator
            .simulate(self.s0, &params, &mut StdRng::seed_from_u64(seed))?;
        let score = score_ensemble(
            &ensemble,
            self.observed,
            self.trading_minutes,
            self.grid.lower_percentile,
            self.grid.upper_percentile,
        )?;

        Ok(GridSearchEntry {
            threshold: rule.threshold,
            jump_std_scale: rule.jump_std_scale,
            lambda_scale: rule.lambda_scale,
            coverage: score.coverage,
            z_score: score.z_score,
        })
    }
}

/// Tune the jump rule against a realised price path
///
/// # Arguments
/// * `returns` - Overnight log returns used for every calibration
/// * `s0` - Seed price of the simulated paths
/// * `observed` - Realised prices over the horizon, starting at `s0`'s timestamp
/// * `grid` - Sample count, sampling ranges and coverage band
/// * `simulation` - Discretisation and ensemble size
/// * `rng` - Source of the sampled rules and of every per-sample seed
///
/// Samples failing with a recoverable error are counted in `skipped`; any
/// other error aborts the search. A non-positive or non-finite realised price
/// within the horizon is an `InvalidParameter`.
pub fn grid_search<R: Rng + ?Sized>(
    returns: &[f64],
    s0: f64,
    observed: &[f64],
    grid: &GridSearchConfig,
    simulation: &SimulationConfig,
    rng: &mut R,
) -> Result<GridSearchResult> {
    grid.validate()?;
    let simulator = PathSimulator::new(simulation)?;
    if returns.len() < 2 {
        return Err(ForecastError::InsufficientData(format!(
            "Grid search needs at least 2 returns to calibrate, have {}",
            returns.len()
        )));
    }

    validate_observed(&observed[..observed.len().min(simulator.n_steps())])?;

    let rules = sample_jump_rules(grid, rng);
    if observed.len() < simulator.n_steps() {
        warn!(
            observed = observed.len(),
            needed = simulator.n_steps(),
            "realised path shorter than horizon, every sample skipped"
        );
        return Ok(GridSearchResult {
            entries: Vec::new(),
            skipped: rules.len(),
        });
    }
    let seeds: Vec<u64> = rules.iter().map(|_| rng.gen()).collect();

    info!(
        n_samples = rules.len(),
        n_paths = simulator.n_paths(),
        n_steps = simulator.n_steps(),
        "starting grid search"
    );

    let context = SearchContext {
        returns,
        s0,
        observed,
        simulator,
        grid,
        trading_minutes: simulation.trading_minutes,
    };
    let outcomes: Vec<Result<GridSearchEntry>> = rules
        .par_iter()
        .zip(seeds.par_iter())
        .map(|(rule, &seed)| context.evaluate(rule, seed))
        .collect();

    let mut result = GridSearchResult::default();
    for (rule, outcome) in rules.iter().zip(outcomes) {
        match outcome {
            Ok(entry) => result.entries.push(entry),
            Err(e) if e.is_recoverable() => {
                warn!(threshold = rule.threshold, error = %e, "skipping grid sample");
                result.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    result
        .entries
        .sort_by(|a, b| a.z_score.abs().total_cmp(&b.z_score.abs()));

    info!(
        scored = result.entries.len(),
        skipped = result.skipped,
        best_z = result.best().map(|e| e.z_score),
        "grid search finished"
    );
    Ok(result)
}
