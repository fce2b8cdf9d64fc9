//! Raw daily quotes from the Yahoo Finance chart API
//!
//! Response parsing and CSV export are always available; the HTTP download
//! itself (`YahooSource`) needs the `fetch` feature.

use crate::data::{clean_rows, PriceField, Series};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One daily OHLCV quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: Option<f64>,
    #[serde(rename = "High")]
    pub high: Option<f64>,
    #[serde(rename = "Low")]
    pub low: Option<f64>,
    #[serde(rename = "Close")]
    pub close: Option<f64>,
    #[serde(rename = "Adj Close")]
    pub adj_close: Option<f64>,
    #[serde(rename = "Volume")]
    pub volume: Option<u64>,
}

impl Quote {
    pub fn price(&self, field: PriceField) -> Option<f64> {
        match field {
            PriceField::AdjClose => self.adj_close,
            PriceField::Close => self.close,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteColumns>,
    adjclose: Option<Vec<AdjCloseColumn>>,
}

#[derive(Debug, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseColumn {
    adjclose: Vec<Option<f64>>,
}

/// Parse a chart API response body into quotes
pub fn parse_chart_response(json: &str) -> Result<Vec<Quote>> {
    let response: ChartResponse = serde_json::from_str(json)?;

    if let Some(error) = response.chart.error {
        return Err(ForecastError::DataLoad(format!(
            "Chart API error [{}]: {}",
            error.code, error.description
        )));
    }

    let data = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ForecastError::DataLoad("Chart API returned no data".to_string()))?;
    let columns = data
        .indicators
        .quote
        .first()
        .ok_or_else(|| ForecastError::DataLoad("Chart API returned no quotes".to_string()))?;
    let adj = data.indicators.adjclose.as_ref().and_then(|a| a.first());

    let pick = |v: &Vec<Option<f64>>, i: usize| v.get(i).copied().flatten();

    data.timestamp
        .iter()
        .enumerate()
        .map(|(i, &ts)| {
            let date = DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| ForecastError::DataLoad(format!("Bad timestamp {}", ts)))?;
            Ok(Quote {
                date,
                open: pick(&columns.open, i),
                high: pick(&columns.high, i),
                low: pick(&columns.low, i),
                close: pick(&columns.close, i),
                adj_close: adj.and_then(|a| pick(&a.adjclose, i)),
                volume: columns.volume.get(i).copied().flatten(),
            })
        })
        .collect()
}

/// Price series from quotes, sorted and de-duplicated like a CSV load
pub fn quotes_to_series(quotes: &[Quote], field: PriceField) -> Result<Series> {
    let rows = quotes
        .iter()
        .filter_map(|q| q.price(field).map(|p| (q.date, p)))
        .collect();
    Series::new(field.column_name(), clean_rows(rows))
}

/// Write quotes with the provider schema `Date,Open,High,Low,Close,Adj Close,Volume`
pub fn write_quotes_csv<P: AsRef<Path>>(quotes: &[Quote], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for quote in quotes {
        writer.serialize(quote)?;
    }
    writer.flush()?;

    info!(path = %path.as_ref().display(), rows = quotes.len(), "Wrote raw quotes");
    Ok(())
}

#[cfg(feature = "fetch")]
pub use self::source::YahooSource;

#[cfg(feature = "fetch")]
mod source {
    use super::{parse_chart_response, quotes_to_series, Quote};
    use crate::data::{DataSource, PriceField, Series};
    use crate::error::{ForecastError, Result};
    use chrono::{Duration, NaiveDate};
    use tracing::info;

    const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

    /// Daily quotes for one symbol over a date range
    #[derive(Debug, Clone)]
    pub struct YahooSource {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
        price_field: PriceField,
    }

    impl YahooSource {
        pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Result<Self> {
            if start >= end {
                return Err(ForecastError::InvalidParameter(format!(
                    "Start date {} must be before end date {}",
                    start, end
                )));
            }
            Ok(Self {
                symbol: symbol.into(),
                start,
                end,
                price_field: PriceField::default(),
            })
        }

        pub fn with_price_field(mut self, field: PriceField) -> Self {
            self.price_field = field;
            self
        }

        fn url(&self) -> String {
            let to_ts = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| dt.timestamp()).unwrap_or(0);
            // period2 is exclusive
            format!(
                "{}/{}?period1={}&period2={}&interval=1d&events=div%2Csplit",
                CHART_URL,
                self.symbol,
                to_ts(self.start),
                to_ts(self.end + Duration::days(1))
            )
        }

        /// Download raw quotes
        pub fn fetch_quotes(&self) -> Result<Vec<Quote>> {
            let client = reqwest::blocking::Client::builder()
                .user_agent("Mozilla/5.0 (X11; Linux x86_64)")
                .build()
                .map_err(|e| ForecastError::Fetch(e.to_string()))?;

            let body = client
                .get(self.url())
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.text())
                .map_err(|e| ForecastError::Fetch(e.to_string()))?;

            let quotes = parse_chart_response(&body)?;
            info!(symbol = %self.symbol, rows = quotes.len(), "Downloaded quotes");
            Ok(quotes)
        }
    }

    impl DataSource for YahooSource {
        fn name(&self) -> &str {
            &self.symbol
        }

        fn load(&self) -> Result<Series> {
            let quotes = self.fetch_quotes()?;
            quotes_to_series(&quotes, self.price_field)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1577975400, 1578061800, 1578321000],
                "indicators": {
                    "quote": [{
                        "open": [74.06, 74.29, null],
                        "high": [75.15, 75.14, 74.99],
                        "low": [73.80, 74.13, 73.19],
                        "close": [75.09, 74.36, 74.95],
                        "volume": [135480400, 146322800, 118387200]
                    }],
                    "adjclose": [{ "adjclose": [73.06, 72.35, null] }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_response() {
        let quotes = parse_chart_response(RESPONSE).unwrap();
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0].date, NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
        assert_eq!(quotes[2].open, None);
        assert_eq!(quotes[1].adj_close, Some(72.35));
    }

    #[test]
    fn test_quotes_to_series_skips_missing_prices() {
        let quotes = parse_chart_response(RESPONSE).unwrap();
        let adj = quotes_to_series(&quotes, PriceField::AdjClose).unwrap();
        assert_eq!(adj.len(), 2);
        assert_eq!(adj.label(), "Adj Close");

        let close = quotes_to_series(&quotes, PriceField::Close).unwrap();
        assert_eq!(close.len(), 3);
    }

    #[test]
    fn test_api_error_is_reported() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}}"#;
        let err = parse_chart_response(body).unwrap_err();
        assert!(err.to_string().contains("No data found"));
    }
}
