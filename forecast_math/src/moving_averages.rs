//! Moving averages
//!
//! Contains:
//! - Simple Moving Average (SMA) as a streaming accumulator
//! - Centered moving average used by classical seasonal decomposition

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) implementation
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value into the window
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Current SMA value, `None` until the window is full
    pub fn value(&self) -> Option<f64> {
        if self.values.len() < self.period {
            return None;
        }
        Some(self.sum / self.period as f64)
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the SMA, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Centered moving average over `period` values
///
/// For an even period this is the usual `2 x period` average: the two
/// outermost values get half weight. The first and last `period / 2`
/// positions have no full window and are `None`.
pub fn centered_moving_average(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    if period == 0 {
        return Err(MathError::InvalidInput(
            "Period must be greater than zero".to_string(),
        ));
    }
    let n = values.len();
    let needed = if period % 2 == 0 { period + 1 } else { period };
    if n < needed {
        return Err(MathError::InsufficientData(format!(
            "Centered moving average of period {} needs {} values, have {}",
            period, needed, n
        )));
    }

    // trailing[t] = mean of values[t + 1 - period ..= t]
    let mut sma = SimpleMovingAverage::new(period)?;
    let trailing: Vec<Option<f64>> = values
        .iter()
        .map(|&v| {
            sma.update(v);
            sma.value()
        })
        .collect();

    let half = period / 2;
    let centered = (0..n)
        .map(|t| {
            if t < half || t + half >= n {
                return None;
            }
            if period % 2 == 1 {
                trailing[t + half]
            } else {
                match (trailing[t + half - 1], trailing[t + half]) {
                    (Some(a), Some(b)) => Some((a + b) / 2.0),
                    _ => None,
                }
            }
        })
        .collect();

    Ok(centered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sma_calculation() {
        let mut sma = SimpleMovingAverage::new(3).unwrap();

        sma.update(2.0);
        sma.update(4.0);
        assert!(sma.value().is_none());

        sma.update(6.0);
        assert_abs_diff_eq!(sma.value().unwrap(), 4.0);

        sma.update(8.0);
        assert_abs_diff_eq!(sma.value().unwrap(), 6.0);

        sma.reset();
        assert!(sma.value().is_none());
        assert_eq!(sma.period(), 3);
    }

    #[test]
    fn test_sma_rejects_zero_period() {
        assert!(SimpleMovingAverage::new(0).is_err());
    }

    #[test]
    fn test_centered_odd_period() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = centered_moving_average(&values, 3).unwrap();
        assert_eq!(out[0], None);
        assert_abs_diff_eq!(out[1].unwrap(), 2.0);
        assert_abs_diff_eq!(out[3].unwrap(), 4.0);
        assert_eq!(out[4], None);
    }

    #[test]
    fn test_centered_even_period_half_weights() {
        let values = [0.0, 4.0, 0.0, 4.0, 0.0, 4.0];
        let out = centered_moving_average(&values, 2).unwrap();
        assert_eq!(out[0], None);
        // 0.25 * 0 + 0.5 * 4 + 0.25 * 0
        assert_abs_diff_eq!(out[1].unwrap(), 2.0);
        assert_abs_diff_eq!(out[2].unwrap(), 2.0);
        assert_eq!(out[5], None);
    }

    #[test]
    fn test_centered_removes_linear_trend_exactly() {
        let values: Vec<f64> = (0..20).map(|i| 3.0 + 0.5 * i as f64).collect();
        let out = centered_moving_average(&values, 4).unwrap();
        for (t, v) in out.iter().enumerate() {
            if let Some(v) = v {
                assert_abs_diff_eq!(*v, values[t], epsilon = 1e-12);
            }
        }
    }
}
