//! Command line front end for the jump-diffusion volatility engine
//!
//! Subcommands:
//!   - `calibrate`     Fit jump-diffusion parameters to recent overnight returns
//!   - `forecast`      Calibrate, simulate and summarise path volatility
//!   - `grid-search`   Tune the jump rule against the latest session
//!   - `estimators`    Per-session intraday estimator summaries
//!   - `dislocation`   Estimator volatility against a reference series
//!   - `overnight-vol` Realised volatility of each overnight window
//!
//! Results go to stdout as JSON, logs to stderr (`RUST_LOG` overrides the
//! default `info` level).

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveTime;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, ValueEnum};
use jump_forecast::config::ForecastConfig;
use jump_forecast::dislocation::{analyze_all, analyze_vol_dislocation};
use jump_forecast::estimators::{summarize_daily_stats, EstimatorKind};
use jump_forecast::forecaster::JumpDiffusionForecaster;
use jump_forecast::overnight::overnight_realized_vol;
use jump_forecast::{ForecastError, Result};
use minute_data::loader::{load_minute_bars, load_session_values};
use minute_data::synthetic::{generate_minute_bars, SyntheticSpec};
use minute_data::MinuteSeries;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "jump_forecast",
    version,
    about = "Jump-diffusion volatility forecasting for index futures",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Minute bar CSV (Datetime,Open,High,Low,Close,Volume)
    #[arg(long, global = true)]
    bars: Option<PathBuf>,

    /// Generate this many calendar days of synthetic bars instead of reading --bars
    #[arg(long, global = true)]
    synthetic_days: Option<usize>,

    /// JSON configuration overriding the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for every random draw; overrides the configuration
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Timezone of naive timestamps in the CSV
    #[arg(long, global = true, default_value = "UTC")]
    source_tz: String,

    /// Exchange timezone the bars are normalised to
    #[arg(long, global = true, default_value = "America/New_York")]
    exchange_tz: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit jump-diffusion parameters to recent overnight returns
    Calibrate,
    /// Calibrate, simulate and summarise path volatility
    Forecast,
    /// Tune the jump rule against the latest session
    GridSearch,
    /// Per-session intraday estimator summaries
    Estimators,
    /// Estimator volatility against a reference series
    Dislocation(DislocationArgs),
    /// Realised volatility of each overnight window
    OvernightVol(OvernightArgs),
}

#[derive(Args)]
struct DislocationArgs {
    /// CSV of date,value reference implied volatilities
    #[arg(long)]
    reference: PathBuf,

    /// Only run this estimator (all four otherwise)
    #[arg(long, value_enum)]
    estimator: Option<EstimatorArg>,
}

#[derive(Args)]
struct OvernightArgs {
    /// Start of the overnight window on the previous day (HH:MM)
    #[arg(long, default_value = "18:00")]
    start_time: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum EstimatorArg {
    Realized,
    Parkinson,
    GarmanKlass,
    YangZhang,
}

impl From<EstimatorArg> for EstimatorKind {
    fn from(arg: EstimatorArg) -> Self {
        match arg {
            EstimatorArg::Realized => EstimatorKind::Realized,
            EstimatorArg::Parkinson => EstimatorKind::Parkinson,
            EstimatorArg::GarmanKlass => EstimatorKind::GarmanKlass,
            EstimatorArg::YangZhang => EstimatorKind::YangZhang,
        }
    }
}

fn parse_tz(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| ForecastError::InvalidParameter(format!("unknown timezone {}: {}", name, e)))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| ForecastError::InvalidParameter(format!("invalid time {}: {}", raw, e)))
}

fn load_config(common: &CommonArgs) -> Result<ForecastConfig> {
    let mut config = match &common.config {
        Some(path) => ForecastConfig::from_json_file(path)?,
        None => ForecastConfig::default(),
    };
    if common.seed.is_some() {
        config.simulation.seed = common.seed;
    }
    Ok(config)
}

fn make_rng(config: &ForecastConfig) -> StdRng {
    match config.simulation.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn load_series(common: &CommonArgs, rng: &mut StdRng) -> Result<MinuteSeries> {
    if let Some(path) = &common.bars {
        let source_tz = parse_tz(&common.source_tz)?;
        let exchange_tz = parse_tz(&common.exchange_tz)?;
        let series = load_minute_bars(path, source_tz, exchange_tz)?;
        info!(path = %path.display(), bars = series.len(), "loaded minute bars");
        return Ok(series);
    }
    if let Some(days) = common.synthetic_days {
        let spec = SyntheticSpec {
            days,
            ..SyntheticSpec::default()
        };
        let series = generate_minute_bars(rng, &spec)?;
        info!(days, bars = series.len(), "generated synthetic minute bars");
        return Ok(series);
    }
    Err(ForecastError::InvalidParameter(
        "one of --bars or --synthetic-days is required".to_string(),
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.common)?;
    let mut rng = make_rng(&config);
    let series = load_series(&cli.common, &mut rng)?;

    match cli.command {
        Commands::Calibrate => {
            let forecaster = JumpDiffusionForecaster::new(series, config)?;
            print_json(&forecaster.calibrate()?)
        }
        Commands::Forecast => {
            let forecaster = JumpDiffusionForecaster::new(series, config)?;
            print_json(&forecaster.forecast_volatility(&mut rng)?)
        }
        Commands::GridSearch => {
            let forecaster = JumpDiffusionForecaster::new(series, config)?;
            print_json(&forecaster.grid_search(&mut rng)?)
        }
        Commands::Estimators => print_json(&summarize_daily_stats(&series, &config.estimators)?),
        Commands::Dislocation(args) => {
            let reference = load_session_values(&args.reference)?;
            match args.estimator {
                Some(kind) => print_json(&analyze_vol_dislocation(
                    &series,
                    kind.into(),
                    &reference,
                    &config.estimators,
                )?),
                None => print_json(&analyze_all(&series, &reference, &config.estimators)?),
            }
        }
        Commands::OvernightVol(args) => {
            let start_time = parse_time(&args.start_time)?;
            let dates = series.session_dates();
            print_json(&overnight_realized_vol(&series, &dates, start_time))
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "jump_forecast failed");
            ExitCode::FAILURE
        }
    }
}
