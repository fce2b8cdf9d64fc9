mod common;

use common::date;
use price_forecast::data::{write_series_csv, CsvSource, DataSource, MemorySource, PriceField};
use price_forecast::{ForecastError, Observation, Series};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file.flush().unwrap();
    file
}

const PROVIDER_CSV: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2023-01-05,10.0,11.0,9.0,10.5,10.4,1000
2023-01-03,10.0,11.0,9.0,10.1,10.0,1000
2023-01-04,10.0,11.0,9.0,10.3,10.2,1000
2023-01-04,10.0,11.0,9.0,10.4,10.3,1200
2023-01-06,10.0,11.0,9.0,,,1000
2023-01-09,10.0,11.0,9.0,10.9,10.8,1000
";

#[test]
fn test_csv_is_sorted_and_deduplicated() {
    let file = csv_file(PROVIDER_CSV);
    let series = CsvSource::new(file.path()).load().unwrap();

    assert_eq!(
        series.dates(),
        vec![
            date(2023, 1, 3),
            date(2023, 1, 4),
            date(2023, 1, 5),
            date(2023, 1, 9)
        ]
    );
    // The later duplicate row wins
    assert_eq!(
        series.values(),
        vec![Some(10.0), Some(10.3), Some(10.4), Some(10.8)]
    );
    assert_eq!(series.label(), "Adj Close");
}

#[test]
fn test_csv_close_field() {
    let file = csv_file(PROVIDER_CSV);
    let series = CsvSource::new(file.path())
        .with_price_field(PriceField::Close)
        .load()
        .unwrap();

    assert_eq!(series.label(), "Close");
    assert_eq!(series.defined_values(), vec![10.1, 10.4, 10.5, 10.9]);
}

#[test]
fn test_csv_explicit_column() {
    let file = csv_file("Date,price\n2023-01-02,1.5\n2023-01-03,1.6\n");
    let series = CsvSource::new(file.path())
        .with_price_column("price")
        .load()
        .unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series.defined_values(), vec![1.5, 1.6]);
}

#[test]
fn test_csv_missing_column() {
    let file = csv_file("Date,Open\n2023-01-02,1.0\n");
    let err = CsvSource::new(file.path()).load().unwrap_err();

    match err {
        ForecastError::DataLoad(msg) => assert!(msg.contains("Adj Close")),
        other => panic!("Expected DataLoad, got {:?}", other),
    }
}

#[test]
fn test_csv_missing_file() {
    let err = CsvSource::new("/definitely/not/here.csv").load().unwrap_err();
    assert!(matches!(err, ForecastError::DataLoad(_)));
}

#[test]
fn test_csv_bad_date() {
    let file = csv_file("Date,Adj Close\n2023-01-02,1.0\nnot-a-date,2.0\n");
    let err = CsvSource::new(file.path()).load().unwrap_err();
    assert!(matches!(err, ForecastError::DataLoad(_)));
}

#[test]
fn test_write_then_load() {
    let series = Series::from_values(
        "Adj Close",
        vec![date(2023, 3, 1), date(2023, 3, 2), date(2023, 3, 3)],
        vec![101.0, 102.5, 99.75],
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clean.csv");
    write_series_csv(&series, &path).unwrap();

    let loaded = CsvSource::new(&path).load().unwrap();
    assert_eq!(loaded.dates(), series.dates());
    assert_eq!(loaded.defined_values(), series.defined_values());
}

#[test]
fn test_memory_source() {
    let series = common::linear_trend(20, 10.0, 0.1, 0.0, 1);
    let source = MemorySource::new(series.clone());
    assert_eq!(source.load().unwrap(), series);
}

#[test]
fn test_series_rejects_unordered_dates() {
    let result = Series::new(
        "x",
        vec![
            Observation::new(date(2023, 1, 3), 1.0),
            Observation::new(date(2023, 1, 3), 2.0),
        ],
    );
    assert!(matches!(result, Err(ForecastError::DataLoad(_))));
}

#[test]
fn test_series_between() {
    let series = common::linear_trend(10, 0.0, 1.0, 0.0, 1);
    let dates = series.dates();

    let sliced = series.between(Some(dates[2]), Some(dates[5])).unwrap();
    assert_eq!(sliced.len(), 4);
    assert_eq!(sliced.first_date(), Some(dates[2]));
    assert_eq!(sliced.last_date(), Some(dates[5]));

    assert!(series.between(Some(dates[5]), Some(dates[2])).is_err());
}

#[rstest]
#[case(0)]
#[case(10)]
#[case(11)]
fn test_split_last_rejects(#[case] n: usize) {
    let series = common::linear_trend(10, 0.0, 1.0, 0.0, 1);
    assert!(matches!(
        series.split_last(n),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_split_last() {
    let series = common::linear_trend(10, 0.0, 1.0, 0.0, 1);
    let (head, tail) = series.split_last(3).unwrap();
    assert_eq!(head.len(), 7);
    assert_eq!(tail.len(), 3);
    assert!(head.last_date().unwrap() < tail.first_date().unwrap());
}

#[rstest]
#[case("adj_close", PriceField::AdjClose)]
#[case("Adj Close", PriceField::AdjClose)]
#[case("close", PriceField::Close)]
fn test_price_field_from_str(#[case] raw: &str, #[case] expected: PriceField) {
    assert_eq!(raw.parse::<PriceField>().unwrap(), expected);
}
