//! Synthetic price series shared by the integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use price_forecast::utils::next_business_day;
use price_forecast::Series;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive business days starting on the first business day >= `start`
pub fn business_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut current = start;
    if !price_forecast::utils::is_business_day(current) {
        current = next_business_day(current);
    }
    for _ in 0..n {
        dates.push(current);
        current = next_business_day(current);
    }
    dates
}

fn noise(n: usize, sigma: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma).unwrap();
    (0..n).map(|_| normal.sample(&mut rng)).collect()
}

/// `intercept + slope * t + N(0, sigma)` on business days from 2020-01-01
pub fn linear_trend(n: usize, intercept: f64, slope: f64, sigma: f64, seed: u64) -> Series {
    let values = noise(n, sigma, seed)
        .into_iter()
        .enumerate()
        .map(|(t, e)| intercept + slope * t as f64 + e)
        .collect();
    Series::from_values("Adj Close", business_days(date(2020, 1, 1), n), values).unwrap()
}

/// Independent `N(level, sigma)` draws
pub fn white_noise(n: usize, level: f64, sigma: f64, seed: u64) -> Series {
    let values = noise(n, sigma, seed).into_iter().map(|e| level + e).collect();
    Series::from_values("noise", business_days(date(2020, 1, 1), n), values).unwrap()
}

/// Cumulative sum of `drift + N(0, sigma)` steps starting at `start`
pub fn random_walk(n: usize, start: f64, drift: f64, sigma: f64, seed: u64) -> Series {
    let mut level = start;
    let values = noise(n, sigma, seed)
        .into_iter()
        .map(|e| {
            level += drift + e;
            level
        })
        .collect();
    Series::from_values("walk", business_days(date(2020, 1, 1), n), values).unwrap()
}

/// Trend plus a repeating pattern of length `period`
pub fn seasonal(n: usize, period: usize, amplitude: f64, sigma: f64, seed: u64) -> Series {
    let values = noise(n, sigma, seed)
        .into_iter()
        .enumerate()
        .map(|(t, e)| {
            let phase = 2.0 * std::f64::consts::PI * (t % period) as f64 / period as f64;
            100.0 + 0.02 * t as f64 + amplitude * phase.sin() + e
        })
        .collect();
    Series::from_values("seasonal", business_days(date(2020, 1, 1), n), values).unwrap()
}
