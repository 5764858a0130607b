//! Monte Carlo simulation of jump-diffusion price paths
//!
//! Each step applies the log-Euler update
//!
//! `S[t] = S[t-1] * exp((mu - sigma^2 / 2) dt + sigma sqrt(dt) Z + J)`
//!
//! where `Z` is standard normal and `J` is zero unless a Poisson draw with
//! rate `lambda * dt` is nonzero, in which case `J = -|N(jump_mean, jump_std)|`.
//! At most one jump is applied per step.
//!
//! Paths are generated in parallel. The caller's generator only hands out
//! one seed per path, so the ensemble depends on the generator state and
//! never on thread scheduling.

use crate::calibration::CalibratedParameters;
use crate::config::{SimulationConfig, MAX_STEPS};
use crate::error::{ForecastError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson, StandardNormal};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;
use trade_math::{log_returns, percentile, population_std};

/// Per-step sampling model prepared once per ensemble
#[derive(Debug, Clone)]
struct StepModel {
    drift_term: f64,
    diffusion_scale: f64,
    jump_arrivals: Option<Poisson<f64>>,
    jump_size: Normal<f64>,
}

impl StepModel {
    fn new(params: &CalibratedParameters, dt: f64) -> Result<Self> {
        params.validate()?;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "dt must be positive, got {}",
                dt
            )));
        }

        let sigma = params.diffusion_vol;
        let rate = params.jump_intensity * dt;
        let jump_arrivals = if rate > 0.0 {
            let poisson = Poisson::new(rate).map_err(|e| {
                ForecastError::InvalidParameter(format!("jump arrival rate {}: {}", rate, e))
            })?;
            Some(poisson)
        } else {
            None
        };
        let jump_size = Normal::new(params.jump_mean, params.jump_std).map_err(|e| {
            ForecastError::InvalidParameter(format!("jump size distribution: {}", e))
        })?;

        Ok(Self {
            drift_term: (params.drift - 0.5 * sigma * sigma) * dt,
            diffusion_scale: sigma * dt.sqrt(),
            jump_arrivals,
            jump_size,
        })
    }

    fn step<R: Rng + ?Sized>(&self, previous: f64, rng: &mut R) -> f64 {
        let z: f64 = StandardNormal.sample(rng);
        let jumped = match &self.jump_arrivals {
            Some(arrivals) => {
                let count: f64 = arrivals.sample(rng);
                count > 0.0
            }
            None => false,
        };
        let jump = if jumped {
            -self.jump_size.sample(rng).abs()
        } else {
            0.0
        };
        previous * (self.drift_term + self.diffusion_scale * z + jump).exp()
    }

    fn path<R: Rng + ?Sized>(&self, s0: f64, n_steps: usize, rng: &mut R) -> Result<Vec<f64>> {
        let mut path = Vec::with_capacity(n_steps);
        let mut price = s0;
        path.push(price);
        for _ in 1..n_steps {
            price = self.step(price, rng);
            path.push(price);
        }

        if path.iter().any(|p| !(p.is_finite() && *p > 0.0)) {
            return Err(ForecastError::DegenerateDistribution(
                "simulated price left the positive finite range".to_string(),
            ));
        }
        Ok(path)
    }
}

fn validate_seed_price(s0: f64) -> Result<()> {
    if !(s0.is_finite() && s0 > 0.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "seed price must be positive, got {}",
            s0
        )));
    }
    Ok(())
}

/// Simulate a single path of `n_steps` prices starting at `s0`
///
/// Draws come from `rng` in step order: the diffusion normal, then the
/// Poisson arrival count when the rate is positive, then the jump size when
/// a jump arrived.
pub fn simulate_path<R: Rng + ?Sized>(
    s0: f64,
    params: &CalibratedParameters,
    dt: f64,
    n_steps: usize,
    rng: &mut R,
) -> Result<Vec<f64>> {
    validate_seed_price(s0)?;
    if n_steps == 0 {
        return Err(ForecastError::InvalidParameter(
            "n_steps must be greater than zero".to_string(),
        ));
    }
    StepModel::new(params, dt)?.path(s0, n_steps, rng)
}

/// Ensemble of simulated paths stored row-major, one row per path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedPathEnsemble {
    n_paths: usize,
    n_steps: usize,
    values: Vec<f64>,
}

impl SimulatedPathEnsemble {
    /// (paths, steps)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_paths, self.n_steps)
    }

    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Common starting price of every path
    pub fn seed_price(&self) -> f64 {
        self.values[0]
    }

    /// One trajectory
    pub fn path(&self, index: usize) -> &[f64] {
        &self.values[index * self.n_steps..(index + 1) * self.n_steps]
    }

    /// All trajectories in order
    pub fn paths(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks_exact(self.n_steps)
    }

    /// Cross-section of all paths at one step
    pub fn column(&self, step: usize) -> Vec<f64> {
        self.paths().map(|p| p[step]).collect()
    }

    /// Lower and upper percentile of the cross-section at every step
    pub fn percentile_band(&self, lower: f64, upper: f64) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut lo = Vec::with_capacity(self.n_steps);
        let mut hi = Vec::with_capacity(self.n_steps);
        for step in 0..self.n_steps {
            let column = self.column(step);
            lo.push(percentile(&column, lower)?);
            hi.push(percentile(&column, upper)?);
        }
        Ok((lo, hi))
    }

    /// Per-path volatility: population std of step log returns times `sqrt(trading_minutes)`
    pub fn path_volatilities(&self, trading_minutes: u32) -> Result<Vec<f64>> {
        if self.n_steps < 2 {
            return Err(ForecastError::InsufficientData(
                "Path volatility needs at least 2 steps per path".to_string(),
            ));
        }
        let scale = f64::from(trading_minutes).sqrt();
        self.paths()
            .map(|p| -> Result<f64> { Ok(population_std(&log_returns(p))? * scale) })
            .collect()
    }
}

/// Generates ensembles for a fixed discretisation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSimulator {
    dt: f64,
    n_steps: usize,
    n_paths: usize,
}

impl PathSimulator {
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dt: config.dt,
            n_steps: config.n_steps(),
            n_paths: config.n_paths,
        })
    }

    /// Simulator with explicit step count, bypassing the horizon
    pub fn with_steps(dt: f64, n_steps: usize, n_paths: usize) -> Result<Self> {
        if n_steps == 0 || n_paths == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_steps and n_paths must be greater than zero".to_string(),
            ));
        }
        if n_steps > MAX_STEPS {
            return Err(ForecastError::InvalidParameter(format!(
                "n_steps {} exceeds the limit of {}",
                n_steps, MAX_STEPS
            )));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "dt must be positive, got {}",
                dt
            )));
        }
        Ok(Self {
            dt,
            n_steps,
            n_paths,
        })
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Simulate `n_paths` independent paths of `n_steps` prices from `s0`
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        s0: f64,
        params: &CalibratedParameters,
        rng: &mut R,
    ) -> Result<SimulatedPathEnsemble> {
        validate_seed_price(s0)?;
        let model = StepModel::new(params, self.dt)?;
        let seeds: Vec<u64> = (0..self.n_paths).map(|_| rng.gen()).collect();

        let rows = seeds
            .par_iter()
            .map(|&seed| model.path(s0, self.n_steps, &mut StdRng::seed_from_u64(seed)))
            .collect::<Result<Vec<Vec<f64>>>>()?;

        debug!(
            n_paths = self.n_paths,
            n_steps = self.n_steps,
            s0,
            "simulated jump-diffusion ensemble"
        );

        Ok(SimulatedPathEnsemble {
            n_paths: self.n_paths,
            n_steps: self.n_steps,
            values: rows.concat(),
        })
    }
}

/// Simulate an ensemble using the discretisation in `config`
pub fn simulate_paths<R: Rng + ?Sized>(
    s0: f64,
    params: &CalibratedParameters,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<SimulatedPathEnsemble> {
    PathSimulator::new(config)?.simulate(s0, params, rng)
}
