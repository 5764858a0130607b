use approx::assert_relative_eq;
use jump_forecast::calibration::CalibratedParameters;
use jump_forecast::config::{SimulationConfig, MAX_STEPS};
use jump_forecast::simulation::{simulate_path, simulate_paths, PathSimulator};
use jump_forecast::ForecastError;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rstest::rstest;

fn params(sigma: f64, lambda: f64, jump_mean: f64, jump_std: f64) -> CalibratedParameters {
    CalibratedParameters::new(0.0001, sigma, lambda, jump_mean, jump_std).unwrap()
}

fn config(n_paths: usize) -> SimulationConfig {
    SimulationConfig {
        n_paths,
        ..SimulationConfig::default()
    }
}

#[rstest]
#[case(params(0.01, 0.0, -0.0001, 0.0002))]
#[case(params(0.02, 2.0, -0.002, 0.001))]
#[case(params(0.5, 50.0, -0.05, 0.02))]
#[case(params(0.0, 390.0, -0.01, 0.0))]
fn test_paths_are_positive_and_start_at_seed(#[case] params: CalibratedParameters) {
    let mut rng = StdRng::seed_from_u64(1);
    let ensemble = simulate_paths(5000.0, &params, &config(64), &mut rng).unwrap();

    assert_eq!(ensemble.shape(), (64, 60));
    assert!(ensemble.column(0).iter().all(|p| *p == 5000.0));
    for path in ensemble.paths() {
        assert!(path.iter().all(|p| p.is_finite() && *p > 0.0));
    }
}

#[test]
fn test_identical_seed_reproduces_ensemble() {
    let params = params(0.02, 3.0, -0.002, 0.001);
    let run = |seed| {
        simulate_paths(4800.0, &params, &config(100), &mut StdRng::seed_from_u64(seed)).unwrap()
    };
    let first = run(77);
    let second = run(77);
    let other = run(78);

    assert_eq!(first, second);
    assert_ne!(first, other);
}

#[test]
fn test_pure_diffusion_follows_normal_draws() {
    // lambda = 0 never draws a jump, so each step uses exactly one normal
    let params = CalibratedParameters::new(0.0, 0.01, 0.0, -0.0001, 0.0002).unwrap();
    let simulator = PathSimulator::with_steps(1.0, 3, 2).unwrap();
    let ensemble = simulator
        .simulate(5000.0, &params, &mut StdRng::seed_from_u64(2024))
        .unwrap();

    let mut seeds = StdRng::seed_from_u64(2024);
    for path in ensemble.paths() {
        let mut draws = StdRng::seed_from_u64(seeds.gen());
        let mut expected = 5000.0;
        assert_eq!(path[0], expected);
        for price in &path[1..] {
            let z: f64 = StandardNormal.sample(&mut draws);
            let log_step = -0.5 * 0.01 * 0.01 + 0.01 * z;
            expected *= log_step.exp();
            assert_relative_eq!(*price, expected, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_single_path_matches_manual_recursion() {
    let params = CalibratedParameters::new(0.0, 0.01, 0.0, -0.0001, 0.0002).unwrap();
    let path = simulate_path(5000.0, &params, 1.0, 3, &mut StdRng::seed_from_u64(9)).unwrap();

    let mut rng = StdRng::seed_from_u64(9);
    let z1: f64 = StandardNormal.sample(&mut rng);
    let z2: f64 = StandardNormal.sample(&mut rng);
    let drift = -0.5 * 0.01 * 0.01;

    assert_eq!(path.len(), 3);
    assert_relative_eq!((path[1] / path[0]).ln(), drift + 0.01 * z1, epsilon = 1e-12);
    assert_relative_eq!((path[2] / path[1]).ln(), drift + 0.01 * z2, epsilon = 1e-12);
}

#[test]
fn test_jumps_only_pull_prices_down() {
    // No diffusion and no drift: every move is a jump or nothing
    let params = CalibratedParameters::new(0.0, 0.0, 200.0, -0.001, 0.0005).unwrap();
    let ensemble = PathSimulator::with_steps(1.0 / 390.0, 60, 50)
        .unwrap()
        .simulate(100.0, &params, &mut StdRng::seed_from_u64(4))
        .unwrap();

    let mut jumped = false;
    for path in ensemble.paths() {
        for (prev, next) in path.iter().zip(&path[1..]) {
            assert!(next <= prev);
            jumped |= next < prev;
        }
    }
    assert!(jumped);
}

#[rstest]
#[case(0.0)]
#[case(-5.0)]
#[case(f64::NAN)]
fn test_non_positive_seed_price_is_rejected(#[case] s0: f64) {
    let p = params(0.01, 0.0, -0.0001, 0.0002);
    let result = simulate_paths(s0, &p, &config(4), &mut StdRng::seed_from_u64(1));
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let p = params(0.01, 0.0, -0.0001, 0.0002);
    let mut rng = StdRng::seed_from_u64(1);

    let zero_paths = SimulationConfig {
        n_paths: 0,
        ..SimulationConfig::default()
    };
    assert!(simulate_paths(100.0, &p, &zero_paths, &mut rng).is_err());

    let short_horizon = SimulationConfig {
        horizon: 0.0,
        ..SimulationConfig::default()
    };
    assert!(simulate_paths(100.0, &p, &short_horizon, &mut rng).is_err());

    let tiny_step = SimulationConfig {
        dt: 1e-300,
        horizon: 1.0,
        ..SimulationConfig::default()
    };
    assert!(matches!(
        simulate_paths(100.0, &p, &tiny_step, &mut rng),
        Err(ForecastError::InvalidParameter(_))
    ));

    assert!(PathSimulator::with_steps(-1.0, 3, 2).is_err());
    assert!(PathSimulator::with_steps(1.0 / 390.0, MAX_STEPS + 1, 2).is_err());
}
