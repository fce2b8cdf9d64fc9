//! Time series data handling for forecasting
//!
//! A [`Series`] is an immutable, strictly date-ordered sequence of daily
//! observations. [`DataSource`] implementations produce clean series from
//! CSV files, memory, or (with the `fetch` feature) the Yahoo Finance API.

use crate::error::{ForecastError, Result};
use crate::utils::parse_date;
use chrono::NaiveDate;
use polars::prelude::{
    CsvReader, CsvWriter, DataFrame, DataType, NamedFrom, SerReader, SerWriter,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod yahoo;

/// One dated value; `None` marks an undefined value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }

    pub fn undefined(date: NaiveDate) -> Self {
        Self { date, value: None }
    }
}

/// Named, strictly date-ordered sequence of observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    label: String,
    observations: Vec<Observation>,
}

impl Series {
    /// Build a series, rejecting dates that are not strictly increasing
    pub fn new(label: impl Into<String>, observations: Vec<Observation>) -> Result<Self> {
        if let Some(pair) = observations.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(ForecastError::DataLoad(format!(
                "Dates must be strictly increasing, found {} followed by {}",
                pair[0].date, pair[1].date
            )));
        }

        Ok(Self {
            label: label.into(),
            observations,
        })
    }

    /// Build a fully defined series from parallel date and value vectors
    pub fn from_values(
        label: impl Into<String>,
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Got {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }

        let observations = dates
            .into_iter()
            .zip(values)
            .map(|(date, value)| Observation::new(date, value))
            .collect();
        Self::new(label, observations)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.observations.iter().map(|o| o.value).collect()
    }

    /// Values with undefined entries skipped
    pub fn defined_values(&self) -> Vec<f64> {
        self.observations.iter().filter_map(|o| o.value).collect()
    }

    /// Number of defined values
    pub fn defined_len(&self) -> usize {
        self.observations.iter().filter(|o| o.value.is_some()).count()
    }

    /// Copy of the series without undefined observations
    pub fn defined(&self) -> Series {
        Series {
            label: self.label.clone(),
            observations: self
                .observations
                .iter()
                .filter(|o| o.value.is_some())
                .copied()
                .collect(),
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Same observations under a different label
    pub fn with_label(&self, label: impl Into<String>) -> Series {
        Series {
            label: label.into(),
            observations: self.observations.clone(),
        }
    }

    /// Same dates with new values, position by position
    pub(crate) fn with_values<I>(&self, label: impl Into<String>, values: I) -> Series
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        Series {
            label: label.into(),
            observations: self
                .observations
                .iter()
                .zip(values)
                .map(|(o, value)| Observation {
                    date: o.date,
                    value,
                })
                .collect(),
        }
    }

    /// Observations with `start <= date <= end`
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Series> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ForecastError::InvalidParameter(format!(
                    "Start date {} is after end date {}",
                    s, e
                )));
            }
        }

        let observations = self
            .observations
            .iter()
            .filter(|o| start.map_or(true, |s| o.date >= s) && end.map_or(true, |e| o.date <= e))
            .copied()
            .collect();

        Ok(Series {
            label: self.label.clone(),
            observations,
        })
    }

    /// Split into `(head, last n observations)`
    pub fn split_last(&self, n: usize) -> Result<(Series, Series)> {
        if n == 0 || n >= self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Cannot hold out {} of {} observations",
                n,
                self.len()
            )));
        }

        let cut = self.len() - n;
        Ok((
            Series {
                label: self.label.clone(),
                observations: self.observations[..cut].to_vec(),
            },
            Series {
                label: self.label.clone(),
                observations: self.observations[cut..].to_vec(),
            },
        ))
    }
}

/// Which price column of a provider CSV to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    /// Split/dividend adjusted close
    #[default]
    AdjClose,
    Close,
}

impl PriceField {
    /// Column header in provider CSVs
    pub fn column_name(&self) -> &'static str {
        match self {
            PriceField::AdjClose => "Adj Close",
            PriceField::Close => "Close",
        }
    }
}

impl std::str::FromStr for PriceField {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace([' ', '-', '_'], "").as_str() {
            "adjclose" => Ok(PriceField::AdjClose),
            "close" => Ok(PriceField::Close),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown price field '{}'",
                other
            ))),
        }
    }
}

/// Anything that can supply a clean price series
pub trait DataSource {
    /// Human-readable name used in logs and reports
    fn name(&self) -> &str;

    /// Load a sorted, de-duplicated series
    fn load(&self) -> Result<Series>;
}

impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load(&self) -> Result<Series> {
        (**self).load()
    }
}

/// Price series read from a CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    name: String,
    date_column: String,
    price_field: PriceField,
    price_column: Option<String>,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prices".to_string());

        Self {
            path,
            name,
            date_column: "Date".to_string(),
            price_field: PriceField::default(),
            price_column: None,
        }
    }

    pub fn with_price_field(mut self, field: PriceField) -> Self {
        self.price_field = field;
        self.price_column = None;
        self
    }

    /// Read an arbitrarily named price column instead of a provider field
    ///
    /// Cleaned files written by [`write_series_csv`] use the series label
    /// as the column name.
    pub fn with_price_column(mut self, column: impl Into<String>) -> Self {
        self.price_column = Some(column.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn price_column(&self) -> &str {
        self.price_column
            .as_deref()
            .unwrap_or_else(|| self.price_field.column_name())
    }

    fn read_frame(&self) -> Result<DataFrame> {
        let file = File::open(&self.path).map_err(|e| {
            ForecastError::DataLoad(format!("Cannot open {}: {}", self.path.display(), e))
        })?;

        CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()
            .map_err(|e| {
                ForecastError::DataLoad(format!("Cannot parse {}: {}", self.path.display(), e))
            })
    }
}

impl DataSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Series> {
        let df = self.read_frame()?;
        let price_column = self.price_column().to_string();

        let columns = df.get_column_names();
        for required in [self.date_column.as_str(), price_column.as_str()] {
            if !columns.contains(&required) {
                return Err(ForecastError::DataLoad(format!(
                    "Column '{}' not found in {} (have: {})",
                    required,
                    self.path.display(),
                    columns.join(", ")
                )));
            }
        }

        let dates = df.column(&self.date_column)?.cast(&DataType::Utf8)?;
        let prices = df.column(&price_column)?.cast(&DataType::Float64)?;

        let mut rows = Vec::with_capacity(df.height());
        let mut dropped = 0usize;
        for (raw_date, price) in dates.utf8()?.into_iter().zip(prices.f64()?.into_iter()) {
            let raw_date = raw_date.ok_or_else(|| {
                ForecastError::DataLoad(format!("Missing date in {}", self.path.display()))
            })?;
            let date = parse_date(raw_date)?;
            match price {
                Some(p) if p.is_finite() => rows.push((date, p)),
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(
                source = %self.name,
                dropped,
                "Dropped rows with missing or unparseable '{}'",
                price_column
            );
        }

        let observations = clean_rows(rows);
        if observations.is_empty() {
            return Err(ForecastError::DataLoad(format!(
                "No usable rows in {}",
                self.path.display()
            )));
        }

        info!(
            source = %self.name,
            rows = observations.len(),
            column = %price_column,
            "Loaded price series"
        );
        Series::new(price_column, observations)
    }
}

/// Sort by date; when a date repeats the last row wins
pub(crate) fn clean_rows(mut rows: Vec<(NaiveDate, f64)>) -> Vec<Observation> {
    // Stable sort keeps file order among equal dates
    rows.sort_by_key(|(date, _)| *date);

    let mut observations: Vec<Observation> = Vec::with_capacity(rows.len());
    let mut duplicates = 0usize;
    for (date, value) in rows {
        match observations.last_mut() {
            Some(last) if last.date == date => {
                last.value = Some(value);
                duplicates += 1;
            }
            _ => observations.push(Observation::new(date, value)),
        }
    }

    if duplicates > 0 {
        debug!(duplicates, "Collapsed duplicate dates");
    }
    observations
}

/// A pre-built series
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    series: Series,
}

impl MemorySource {
    pub fn new(series: Series) -> Self {
        Self {
            name: series.label().to_string(),
            series,
        }
    }
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Series> {
        Ok(self.series.clone())
    }
}

/// Persist a series as `Date,<label>`; undefined values are left empty
pub fn write_series_csv<P: AsRef<Path>>(series: &Series, path: P) -> Result<()> {
    let dates: Vec<String> = series
        .observations()
        .iter()
        .map(|o| o.date.format("%Y-%m-%d").to_string())
        .collect();
    let values: Vec<Option<f64>> = series.values();

    let mut df = DataFrame::new(vec![
        polars::prelude::Series::new("Date", dates),
        polars::prelude::Series::new(series.label(), values),
    ])?;

    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;

    info!(
        path = %path.as_ref().display(),
        rows = series.len(),
        "Wrote series"
    );
    Ok(())
}
