mod common;

use approx::assert_relative_eq;
use common::date;
use price_forecast::prepare::{
    autocorrelation, decompose, differenced, is_stationary, partial_autocorrelation, stationarity,
    DecompositionKind,
};
use price_forecast::{ForecastError, Observation, Series};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_differenced() {
    let series = Series::from_values(
        "price",
        vec![date(2023, 1, 2), date(2023, 1, 3), date(2023, 1, 4)],
        vec![1.0, 3.0, 6.0],
    )
    .unwrap();

    let diff = differenced(&series);
    assert_eq!(diff.label(), "price_diff");
    assert_eq!(diff.dates(), series.dates());
    assert_eq!(diff.values(), vec![None, Some(2.0), Some(3.0)]);
}

#[test]
fn test_differenced_short_series() {
    let empty = Series::new("price", Vec::new()).unwrap();
    let diff = differenced(&empty);
    assert!(diff.is_empty());
    assert_eq!(diff.label(), "price_diff");

    let single = Series::from_values("price", vec![date(2023, 1, 2)], vec![10.0]).unwrap();
    let diff = differenced(&single);
    assert_eq!(diff.dates(), single.dates());
    assert_eq!(diff.values(), vec![None]);
}

#[test]
fn test_differenced_propagates_gaps() {
    let series = Series::new(
        "price",
        vec![
            Observation::new(date(2023, 1, 2), 1.0),
            Observation::undefined(date(2023, 1, 3)),
            Observation::new(date(2023, 1, 4), 4.0),
            Observation::new(date(2023, 1, 5), 5.0),
        ],
    )
    .unwrap();

    let diff = differenced(&series);
    assert_eq!(diff.values(), vec![None, None, None, Some(1.0)]);
}

#[test]
fn test_differenced_twice() {
    let series = common::linear_trend(20, 5.0, 2.0, 0.0, 1);
    let second = differenced(&differenced(&series));

    let values = second.values();
    assert_eq!(values[0], None);
    assert_eq!(values[1], None);
    for v in &values[2..] {
        assert_relative_eq!(v.unwrap(), 0.0, epsilon = 1e-9);
    }
}

#[test]
fn test_white_noise_is_stationary() {
    let series = common::white_noise(500, 50.0, 1.0, 7);
    assert!(is_stationary(&series, 0.05).unwrap());
}

#[test]
fn test_random_walk_is_not_stationary() {
    let series = common::random_walk(500, 100.0, 0.1, 1.0, 11);
    assert!(!is_stationary(&series, 0.05).unwrap());
}

#[test]
fn test_differenced_random_walk_is_stationary() {
    let series = common::random_walk(500, 100.0, 0.1, 1.0, 11);
    assert!(is_stationary(&differenced(&series), 0.05).unwrap());
}

#[test]
fn test_stationarity_threshold_is_strict() {
    let series = common::white_noise(200, 0.0, 1.0, 3);
    let report = stationarity(&series, None).unwrap();

    assert!(!report.is_stationary_at(report.p_value));
    assert!(report.critical_values.one_percent < report.critical_values.five_percent);
    assert!(report.critical_values.five_percent < report.critical_values.ten_percent);
}

#[test]
fn test_stationarity_needs_ten_values() {
    let series = common::white_noise(9, 0.0, 1.0, 3);
    match stationarity(&series, None).unwrap_err() {
        ForecastError::InsufficientData {
            required, actual, ..
        } => {
            assert_eq!(required, 10);
            assert_eq!(actual, 9);
        }
        other => panic!("Expected InsufficientData, got {:?}", other),
    }
}

#[rstest]
#[case(0.0)]
#[case(1.0)]
#[case(-0.5)]
fn test_is_stationary_rejects_bad_significance(#[case] significance: f64) {
    let series = common::white_noise(100, 0.0, 1.0, 3);
    assert!(matches!(
        is_stationary(&series, significance),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_autocorrelation() {
    let series = common::random_walk(300, 100.0, 0.0, 1.0, 5);
    let acf = autocorrelation(&series, 10).unwrap();
    assert_eq!(acf.len(), 11);
    assert_relative_eq!(acf[0], 1.0, epsilon = 1e-12);
    // A random walk decays slowly
    assert!(acf[1] > 0.8);

    let pacf = partial_autocorrelation(&series, 5).unwrap();
    assert_eq!(pacf.len(), 6);
    assert!(pacf[1] > 0.8);
    assert!(pacf[2].abs() < 0.3);

    assert!(autocorrelation(&common::white_noise(5, 0.0, 1.0, 1), 5).is_err());
}

#[test]
fn test_additive_decomposition() {
    let series = common::seasonal(100, 5, 3.0, 0.0, 1);
    let d = decompose(&series, 5, DecompositionKind::Additive).unwrap();

    assert_eq!(d.trend.len(), 100);
    assert_eq!(d.trend.values()[0], None);
    assert_eq!(d.trend.values()[1], None);
    assert!(d.trend.values()[2].is_some());
    assert_eq!(d.trend.values()[98], None);

    // Noise-free input: components reconstruct the series
    let seasonal = d.seasonal.values();
    let residual = d.residual.values();
    for (i, trend) in d.trend.values().into_iter().enumerate() {
        if let Some(t) = trend {
            let rebuilt = t + seasonal[i].unwrap() + residual[i].unwrap();
            assert_relative_eq!(rebuilt, series.defined_values()[i], epsilon = 1e-9);
        }
    }

    let one_cycle: f64 = seasonal[..5].iter().map(|s| s.unwrap()).sum();
    assert_relative_eq!(one_cycle, 0.0, epsilon = 1e-9);
    assert!(seasonal[1].unwrap() > 2.0);
}

#[test]
fn test_decomposition_errors() {
    let series = common::seasonal(9, 5, 3.0, 0.0, 1);
    assert!(matches!(
        decompose(&series, 5, DecompositionKind::Additive),
        Err(ForecastError::InsufficientData { .. })
    ));
    assert!(matches!(
        decompose(&series, 1, DecompositionKind::Additive),
        Err(ForecastError::InvalidParameter(_))
    ));

    let negative = common::white_noise(40, -10.0, 1.0, 2);
    assert!(matches!(
        decompose(&negative, 4, DecompositionKind::Multiplicative),
        Err(ForecastError::InvalidParameter(_))
    ));
}
