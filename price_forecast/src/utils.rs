//! Utility functions for the price_forecast crate
//!
//! Business-day calendar arithmetic and lenient date parsing.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Monday through Friday
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First business day strictly after `date`
pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    let mut current = date + Duration::days(1);
    while !is_business_day(current) {
        current += Duration::days(1);
    }
    current
}

/// The `horizon` business days immediately following `last`
///
/// Exchange holidays are not known to this calendar.
pub fn business_days_after(last: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    if horizon == 0 {
        return Err(ForecastError::InvalidParameter(
            "Forecast horizon must be at least 1".to_string(),
        ));
    }

    let mut dates = Vec::with_capacity(horizon);
    let mut current = last;
    for _ in 0..horizon {
        current = next_business_day(current);
        dates.push(current);
    }
    Ok(dates)
}

/// Parse an ISO-8601 date, tolerating a time suffix (`2020-01-02 00:00:00`,
/// `2020-01-02T00:00:00Z`)
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| ForecastError::DataLoad(format!("Unparseable date '{}': {}", raw, e)))
}

/// Days since 1970-01-01, as used for Fourier features
pub fn days_since_epoch(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as f64
}
