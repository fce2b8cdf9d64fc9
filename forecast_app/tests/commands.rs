use forecast_app::cli::{AnalyzeArgs, CleanArgs, CompareArgs, ForecastArgs, InputArgs, ModelKind};
use forecast_app::commands::{analyze, clean, compare, forecast};
use price_forecast::data::{write_series_csv, CsvSource, DataSource, PriceField};
use price_forecast::utils::business_days_after;
use price_forecast::Series;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::fs;
use std::path::Path;

fn random_walk(n: usize, seed: u64) -> Series {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let dates = business_days_after(start, n).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let step = Normal::new(0.05, 1.0).unwrap();
    let mut level = 100.0;
    let values = (0..n)
        .map(|_| {
            level += step.sample(&mut rng);
            level
        })
        .collect();
    Series::from_values("Adj Close", dates, values).unwrap()
}

fn input_args(path: &Path) -> InputArgs {
    InputArgs {
        input: Some(path.to_path_buf()),
        price_field: None,
        start: None,
        end: None,
    }
}

#[test]
fn test_clean() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    fs::write(
        &raw,
        "Date,Open,High,Low,Close,Adj Close,Volume\n\
         2024-01-03,1,1,1,10.0,9.5,100\n\
         2024-01-02,1,1,1,11.0,10.5,100\n\
         2024-01-03,1,1,1,12.0,11.5,100\n",
    )
    .unwrap();

    let output = dir.path().join("clean.csv");
    let series = clean(&CleanArgs {
        input: raw,
        output: output.clone(),
        price_field: PriceField::Close,
    })
    .unwrap();
    assert_eq!(series.defined_values(), vec![11.0, 12.0]);

    let reloaded = CsvSource::new(&output)
        .with_price_field(PriceField::Close)
        .load()
        .unwrap();
    assert_eq!(reloaded, series);
}

#[test]
fn test_analyze_random_walk() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("walk.csv");
    write_series_csv(&random_walk(600, 3), &input).unwrap();

    let analysis = analyze(&AnalyzeArgs {
        input,
        price_field: PriceField::AdjClose,
        lags: 20,
        period: 252,
        significance: 0.05,
    })
    .unwrap();

    assert_eq!(analysis.observations, 600);
    assert!(analysis.raw.p_value >= 0.05);
    let diff = analysis.differenced.as_ref().unwrap();
    assert!(diff.p_value < 0.05);
    assert_eq!(analysis.acf.len(), 21);
    assert_eq!(analysis.pacf.len(), 21);
    assert_eq!(analysis.decompositions.len(), 2);

    let text = analysis.to_string();
    assert!(text.contains("Augmented Dickey-Fuller"));
    assert!(text.contains("first difference"));
}

#[test]
fn test_forecast_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("walk.csv");
    write_series_csv(&random_walk(300, 8), &input).unwrap();
    let out = dir.path().join("out");

    let (report, rendered) = forecast(&ForecastArgs {
        data: input_args(&input),
        config: None,
        model: Some(ModelKind::Arima),
        order: None,
        seasonal_order: None,
        horizon: Some(20),
        holdout: true,
        output: Some(out.clone()),
    })
    .unwrap();

    assert_eq!(report.forecast.len(), 20);
    assert!(report.metrics.is_some());
    assert!(rendered.markdown.contains("ARIMA(1,1,1)"));
    assert!(rendered.markdown.contains("## Model fit: ARIMA(1,1,1)"));
    assert!(rendered.markdown.contains("## Daily forecast"));
    for file in ["forecast.svg", "summary.md"] {
        assert!(out.join(file).exists(), "{} missing", file);
    }
    assert!(!out.join("forecast.csv").exists());
}

#[test]
fn test_forecast_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("walk.csv");
    write_series_csv(&random_walk(200, 21), &input).unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        format!(
            r#"{{"input": {:?}, "horizon": 10, "model": {{"model": "prophet"}}}}"#,
            input.to_str().unwrap()
        ),
    )
    .unwrap();

    let (report, _) = forecast(&ForecastArgs {
        data: InputArgs {
            input: None,
            price_field: None,
            start: None,
            end: None,
        },
        config: Some(config_path),
        model: None,
        order: None,
        seasonal_order: None,
        horizon: None,
        holdout: false,
        output: None,
    })
    .unwrap();

    assert_eq!(report.model, "Prophet");
    assert_eq!(report.forecast.len(), 10);
}

#[test]
fn test_compare() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("walk.csv");
    write_series_csv(&random_walk(400, 12), &input).unwrap();

    let (reports, rendered) = compare(&CompareArgs {
        data: input_args(&input),
        horizon: 30,
        output: None,
    })
    .unwrap();

    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.metrics.is_some()));
    assert!(rendered.markdown.contains("Lowest RMSE"));
    assert!(rendered.markdown.contains("## Model fit"));
    assert!(rendered.markdown.contains("## Daily forecasts"));
}
