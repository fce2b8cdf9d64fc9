mod common;

use price_forecast::config::PipelineConfig;
use price_forecast::data::{write_series_csv, MemorySource};
use price_forecast::evaluation::Alignment;
use price_forecast::models::FitParams;
use price_forecast::pipeline::{default_comparison_models, run_pipeline, Pipeline};
use price_forecast::report::Reporter;
use price_forecast::ForecastError;
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn test_full_forecast_workflow() {
    // 1. Write a provider-style CSV
    let series = common::linear_trend(400, 100.0, 0.05, 1.0, 31);
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("prices.csv");
    write_series_csv(&series, &input).unwrap();

    // 2. Run the pipeline with a holdout
    let config = PipelineConfig::default()
        .with_input(&input)
        .with_model(FitParams::arima(1, 1, 1))
        .with_horizon(30)
        .with_evaluation(true);
    let report = run_pipeline(&config).unwrap();

    assert_eq!(report.model, "ARIMA(1,1,1)");
    assert_eq!(report.series.len(), 400);
    assert_eq!(report.forecast.len(), 30);
    assert_eq!(report.actual.as_ref().unwrap().len(), 30);
    assert!(report.stationarity.is_some());
    assert!(report.training_end < report.forecast.points[0].date);
    let metrics = report.metrics.unwrap();
    assert!(metrics.mae < 2.0);

    // 3. Render and write the outputs
    let out = dir.path().join("out");
    let paths = Reporter::new()
        .render_report(&report)
        .unwrap()
        .write_to(&out)
        .unwrap();
    assert_eq!(paths.len(), 3);
    let summary = fs::read_to_string(out.join("summary.md")).unwrap();
    assert!(summary.contains("ARIMA(1,1,1)"));
}

#[test]
fn test_forecast_without_holdout() {
    let series = common::linear_trend(200, 20.0, 0.02, 0.3, 4);
    let pipeline = Pipeline::new(MemorySource::new(series.clone()));
    let config = PipelineConfig::default()
        .with_model(FitParams::prophet())
        .with_horizon(60);

    let report = pipeline.run(&config).unwrap();
    assert_eq!(report.training_end, series.last_date().unwrap());
    assert_eq!(report.forecast.len(), 60);
    assert!(report.actual.is_none());
    assert!(report.metrics.is_none());
}

#[test]
fn test_date_range() {
    let series = common::linear_trend(300, 20.0, 0.02, 0.3, 4);
    let dates = series.dates();
    let mut config = PipelineConfig::default().with_horizon(5);
    config.start = Some(dates[100]);
    config.end = Some(dates[199]);

    let report = Pipeline::new(MemorySource::new(series)).run(&config).unwrap();
    assert_eq!(report.series.len(), 100);
    assert_eq!(report.training_end, dates[199]);
}

#[test]
fn test_compare_default_models() {
    let series = common::linear_trend(300, 100.0, 0.05, 1.0, 77);
    let pipeline = Pipeline::new(MemorySource::new(series));
    let config = PipelineConfig::default()
        .with_horizon(30)
        .with_evaluation(true);

    let reports = pipeline
        .compare(&config, &default_comparison_models())
        .unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "ARIMA(1,1,1)",
            "ARIMA(2,1,2)",
            "SARIMA(1,1,1)(1,1,1,12)",
            "Prophet"
        ]
    );
    assert!(reports.iter().all(|r| r.metrics.is_some()));

    let output = Reporter::new().render_reports(&reports).unwrap();
    assert_eq!(output.forecasts.len(), 4);
}

#[test]
fn test_holdout_longer_than_series() {
    let series = common::linear_trend(20, 100.0, 0.05, 1.0, 1);
    let config = PipelineConfig::default()
        .with_horizon(30)
        .with_evaluation(true);

    assert!(matches!(
        Pipeline::new(MemorySource::new(series)).run(&config),
        Err(ForecastError::InsufficientData { .. })
    ));
}

#[test]
fn test_config_json_round_trip() {
    let mut config = PipelineConfig::default()
        .with_input("data/AAPL.csv")
        .with_model(FitParams::sarima((1, 1, 1), (1, 1, 1, 12)))
        .with_horizon(90)
        .with_evaluation(true);
    config.alignment = Alignment::ByDate;

    let json = config.to_json_string().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, &json).unwrap();

    let loaded = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_config_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"horizon": 60, "model": {"model": "prophet"}}"#).unwrap();

    let config = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(config.horizon, 60);
    assert_eq!(config.model, FitParams::prophet());
    assert_eq!(config.significance, 0.05);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_config() {
    let config = PipelineConfig::default().with_horizon(0);
    assert!(config.validate().is_err());

    let missing_input = PipelineConfig::default();
    assert!(matches!(
        run_pipeline(&missing_input),
        Err(ForecastError::InvalidParameter(_))
    ));
}
