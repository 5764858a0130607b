// Runs the whole engine on a seeded synthetic series
use rand::rngs::StdRng;
use rand::SeedableRng;
use vol_forecast_workspace::jump_forecast::estimators::summarize_daily_stats;
use vol_forecast_workspace::jump_forecast::{ForecastConfig, JumpDiffusionForecaster};
use vol_forecast_workspace::minute_data::synthetic::{generate_minute_bars, SyntheticSpec};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(42);
    let spec = SyntheticSpec {
        days: 30,
        ..SyntheticSpec::default()
    };
    let series = generate_minute_bars(&mut rng, &spec)?;
    println!(
        "Generated {} bars over {} sessions",
        series.len(),
        series.session_dates().len()
    );

    let mut config = ForecastConfig::default();
    config.simulation.n_paths = 500;
    config.grid_search.n_samples = 10;

    println!("\n=== Estimator summaries ===");
    let stats = summarize_daily_stats(&series, &config.estimators)?;
    for (date, estimates) in stats.iter().take(3) {
        for estimate in estimates {
            println!(
                "{} {:<12} mean {:.4} range {:.4}",
                date, estimate.kind, estimate.mean, estimate.range
            );
        }
    }

    let forecaster = JumpDiffusionForecaster::new(series, config)?;

    println!("\n=== Calibration ===");
    let params = forecaster.calibrate()?;
    println!(
        "mu {:.6} sigma {:.6} lambda {:.3} jump {:.6} +/- {:.6}",
        params.drift, params.diffusion_vol, params.jump_intensity, params.jump_mean, params.jump_std
    );

    println!("\n=== Forecast ===");
    let forecast = forecaster.forecast_volatility(&mut rng)?;
    println!(
        "seed {:.2}: path vol {:.4} +/- {:.4}",
        forecast.seed_price, forecast.mean_vol, forecast.std_vol
    );

    println!("\n=== Grid search ===");
    let search = forecaster.grid_search(&mut rng)?;
    for entry in search.entries.iter().take(5) {
        println!(
            "threshold {:.2} std x{:.2} lambda x{:.2}: coverage {:.2} z {:+.2}",
            entry.threshold, entry.jump_std_scale, entry.lambda_scale, entry.coverage, entry.z_score
        );
    }
    println!("{} samples skipped", search.skipped);

    Ok(())
}
