//! # Forecast App
//!
//! The user-facing surfaces of the price forecaster:
//!
//! - `stock-forecast`: a command-line tool to download, clean, analyze,
//!   forecast and compare
//! - `forecast-dashboard`: a single-page web dashboard that runs the
//!   pipeline for a chosen horizon and shows the chart and summary
//!
//! Both binaries are thin wrappers around [`commands`] and [`dashboard`].

pub mod cli;
pub mod commands;
pub mod dashboard;
pub mod telemetry;

pub use crate::dashboard::{AppState, Horizon};
