//! Seasonal ARIMA
//!
//! SARIMA(p,d,q)(P,D,Q,s) multiplies the non-seasonal AR/MA polynomials by
//! seasonal ones in `B^s` and adds seasonal differencing `(1 - B^s)^D`.
//! Estimation is shared with [`crate::models::arima`].

use crate::data::Series;
use crate::error::{ForecastError, Result};
use crate::models::arima::{self, parse_usize_list, ArimaOrder, BoxJenkinsModel};
use crate::models::Trend;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seasonal order `(P, D, Q, s)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    /// Season length in observations
    pub period: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Self {
        Self { p, d, q, period }
    }

    pub fn validate(&self) -> Result<()> {
        if self.period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonal period must be at least 2, got {}",
                self.period
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SeasonalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{})", self.p, self.d, self.q, self.period)
    }
}

impl FromStr for SeasonalOrder {
    type Err = ForecastError;

    /// Parse `P,D,Q,s`
    fn from_str(s: &str) -> Result<Self> {
        let parts = parse_usize_list(s, 4)?;
        let order = Self::new(parts[0], parts[1], parts[2], parts[3]);
        order.validate()?;
        Ok(order)
    }
}

/// Fit a seasonal ARIMA model
///
/// At least two full seasons of data are required.
pub fn fit_sarima(
    series: &Series,
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    trend: Trend,
    confidence: f64,
) -> Result<BoxJenkinsModel> {
    seasonal.validate()?;

    let actual = series.defined_len();
    let required = arima::minimum_observations(order, Some(seasonal));
    if actual < required {
        return Err(ForecastError::insufficient(
            format!("SARIMA{}{}", order, seasonal),
            required,
            actual,
        ));
    }

    arima::estimate(series, order, Some(seasonal), trend, confidence)
}
