use approx::assert_relative_eq;
use jump_forecast::calibration::{
    calibrate, detect_jumps, JumpRule, DEFAULT_JUMP_MEAN, DEFAULT_JUMP_STD,
};
use jump_forecast::config::CalibrationConfig;
use jump_forecast::ForecastError;
use pretty_assertions::assert_eq;
use rstest::rstest;

const OUTLIER_RETURNS: [f64; 5] = [0.001, -0.002, 0.0005, -0.0015, 0.02];

fn rule(threshold: f64, jump_std_scale: f64, lambda_scale: f64) -> JumpRule {
    JumpRule {
        threshold,
        jump_std_scale,
        lambda_scale,
    }
}

#[test]
fn test_single_outlier_is_the_only_jump() {
    let params = calibrate(&OUTLIER_RETURNS, &rule(1.5, 1.5, 2.0)).unwrap();

    assert_relative_eq!(params.drift, 0.0036, epsilon = 1e-12);
    assert_relative_eq!(params.jump_mean, -0.02);
    assert_relative_eq!(params.jump_intensity, 0.2 * 2.0);
    // One jump has no sample spread
    assert_eq!(params.jump_std, DEFAULT_JUMP_STD);
}

#[test]
fn test_threshold_three_finds_no_jump_in_five_returns() {
    // With five samples no return can sit three sample deviations out
    let params = calibrate(&OUTLIER_RETURNS, &JumpRule::default()).unwrap();
    assert_eq!(params.jump_intensity, 0.0);
    assert_eq!(params.jump_mean, DEFAULT_JUMP_MEAN);
    assert_eq!(params.jump_std, DEFAULT_JUMP_STD);
}

#[test]
fn test_downside_jump_mean_for_upside_jumps() {
    let returns = [
        0.0, 0.001, -0.001, 0.0005, -0.0005, 0.0, 0.001, -0.001, 0.03, 0.031,
    ];
    let params = calibrate(&returns, &rule(1.0, 2.0, 1.0)).unwrap();
    let jumps = detect_jumps(&returns, params.drift, params.diffusion_vol, 1.0);

    assert_eq!(jumps, vec![0.03, 0.031]);
    assert_relative_eq!(params.jump_mean, -0.0305, epsilon = 1e-12);
    assert_relative_eq!(params.jump_intensity, 0.2);
    assert_relative_eq!(params.jump_std, 0.001_f64 / 2.0_f64.sqrt() * 2.0, epsilon = 1e-12);
}

#[rstest]
#[case(1.0)]
#[case(1.5)]
#[case(2.5)]
fn test_intensity_never_decreases_with_lambda_scale(#[case] threshold: f64) {
    let scales = [0.0, 0.5, 1.0, 1.5, 2.0, 4.0];
    let intensities: Vec<f64> = scales
        .iter()
        .map(|s| {
            calibrate(&OUTLIER_RETURNS, &rule(threshold, 1.5, *s))
                .unwrap()
                .jump_intensity
        })
        .collect();

    for pair in intensities.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[test]
fn test_calibration_is_idempotent() {
    let rule = rule(1.5, 1.2, 1.7);
    let first = calibrate(&OUTLIER_RETURNS, &rule).unwrap();
    let second = calibrate(&OUTLIER_RETURNS, &rule).unwrap();
    assert_eq!(first, second);
}

#[rstest]
#[case(&[])]
#[case(&[0.01])]
fn test_fewer_than_two_returns_is_insufficient(#[case] returns: &[f64]) {
    let result = calibrate(returns, &JumpRule::default());
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
    assert!(result.unwrap_err().is_recoverable());
}

#[test]
fn test_rule_from_config() {
    let config = CalibrationConfig {
        threshold: 2.2,
        ..CalibrationConfig::default()
    };
    let rule = JumpRule::from(&config);
    assert_eq!(rule.threshold, 2.2);
    assert_eq!(rule.jump_std_scale, 1.5);
    assert_eq!(rule.lambda_scale, 2.0);
}
