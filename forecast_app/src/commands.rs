//! Subcommand implementations
//!
//! Each function does the work of one `stock-forecast` subcommand and
//! returns what it produced. Printing is left to the binary.

use crate::cli::{AnalyzeArgs, CleanArgs, CompareArgs, ForecastArgs};
use price_forecast::data::{write_series_csv, CsvSource, DataSource};
use price_forecast::pipeline::{default_comparison_models, run_comparison, run_pipeline};
use price_forecast::prepare::{
    autocorrelation, decompose, differenced, partial_autocorrelation, stationarity,
    Decomposition, DecompositionKind, StationarityReport,
};
use price_forecast::report::{RenderedOutput, Reporter};
use price_forecast::{Report, Result, Series};
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Download raw quotes and write them as a provider-style CSV
#[cfg(feature = "fetch")]
pub fn download(args: &crate::cli::DownloadArgs) -> Result<usize> {
    use price_forecast::data::yahoo::{write_quotes_csv, YahooSource};

    let source = YahooSource::new(args.symbol.clone(), args.start, args.end)?;
    let quotes = source.fetch_quotes()?;
    write_quotes_csv(&quotes, &args.output)?;
    info!(rows = quotes.len(), output = %args.output.display(), "Saved raw quotes");
    Ok(quotes.len())
}

/// Load, clean and persist one price column
pub fn clean(args: &CleanArgs) -> Result<Series> {
    let series = CsvSource::new(&args.input)
        .with_price_field(args.price_field)
        .load()?;
    write_series_csv(&series, &args.output)?;
    info!(
        rows = series.len(),
        output = %args.output.display(),
        "Saved cleaned series"
    );
    Ok(series)
}

/// Size of a decomposition's seasonal swing and leftover noise
#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionSummary {
    pub kind: DecompositionKind,
    pub period: usize,
    /// Peak-to-trough range of the seasonal component
    pub seasonal_range: f64,
    /// Standard deviation of the defined residuals
    pub residual_std: f64,
}

impl From<&Decomposition> for DecompositionSummary {
    fn from(d: &Decomposition) -> Self {
        let seasonal = d.seasonal.defined_values();
        let (lo, hi) = seasonal
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });

        let residual = d.residual.defined_values();
        let n = residual.len().max(1) as f64;
        let mean = residual.iter().sum::<f64>() / n;
        let var = residual.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

        Self {
            kind: d.kind,
            period: d.period,
            seasonal_range: if hi >= lo { hi - lo } else { 0.0 },
            residual_std: var.sqrt(),
        }
    }
}

/// Exploratory statistics of one series
#[derive(Debug, Clone)]
pub struct Analysis {
    pub label: String,
    pub observations: usize,
    pub significance: f64,
    pub raw: StationarityReport,
    /// Test on the first difference, run when the raw series is not stationary
    pub differenced: Option<StationarityReport>,
    /// ACF/PACF of the series the models would see (differenced if needed)
    pub acf: Vec<f64>,
    pub pacf: Vec<f64>,
    pub decompositions: Vec<DecompositionSummary>,
}

/// ADF tests, autocorrelations and seasonal decompositions
pub fn analyze(args: &AnalyzeArgs) -> Result<Analysis> {
    let series = CsvSource::new(&args.input)
        .with_price_field(args.price_field)
        .load()?;

    let raw = stationarity(&series, None)?;
    let stationary = raw.is_stationary_at(args.significance);
    let (modelled, differenced_report) = if stationary {
        (series.clone(), None)
    } else {
        let diff = differenced(&series);
        let report = stationarity(&diff, None)?;
        (diff, Some(report))
    };

    let lags = args.lags.min(modelled.defined_len() / 2);
    let acf = autocorrelation(&modelled, lags)?;
    let pacf = partial_autocorrelation(&modelled, lags)?;

    let mut decompositions = Vec::new();
    for kind in [DecompositionKind::Multiplicative, DecompositionKind::Additive] {
        match decompose(&series, args.period, kind) {
            Ok(d) => decompositions.push(DecompositionSummary::from(&d)),
            Err(e) => warn!(?kind, error = %e, "Decomposition skipped"),
        }
    }

    Ok(Analysis {
        label: series.label().to_string(),
        observations: series.len(),
        significance: args.significance,
        raw,
        differenced: differenced_report,
        acf,
        pacf,
        decompositions,
    })
}

fn verdict(report: &StationarityReport, significance: f64) -> &'static str {
    if report.is_stationary_at(significance) {
        "stationary"
    } else {
        "not stationary"
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Series: {} ({} observations)", self.label, self.observations)?;
        writeln!(f)?;
        writeln!(f, "Augmented Dickey-Fuller test")?;
        writeln!(
            f,
            "  raw:         statistic {:>9.4}  p-value {:.4}  lag {:>2}  -> {}",
            self.raw.statistic,
            self.raw.p_value,
            self.raw.used_lag,
            verdict(&self.raw, self.significance)
        )?;
        if let Some(d) = &self.differenced {
            writeln!(
                f,
                "  differenced: statistic {:>9.4}  p-value {:.4}  lag {:>2}  -> {}",
                d.statistic,
                d.p_value,
                d.used_lag,
                verdict(d, self.significance)
            )?;
        }
        let cv = &self.raw.critical_values;
        writeln!(
            f,
            "  critical values: 1% {:.3}  5% {:.3}  10% {:.3}",
            cv.one_percent, cv.five_percent, cv.ten_percent
        )?;

        writeln!(f)?;
        writeln!(
            f,
            "{:>4} {:>9} {:>9}   ({})",
            "lag",
            "ACF",
            "PACF",
            if self.differenced.is_some() {
                "first difference"
            } else {
                "raw series"
            }
        )?;
        for (lag, (a, p)) in self.acf.iter().zip(&self.pacf).enumerate().skip(1) {
            writeln!(f, "{:>4} {:>9.4} {:>9.4}", lag, a, p)?;
        }

        for d in &self.decompositions {
            writeln!(f)?;
            writeln!(
                f,
                "{:?} decomposition (period {}): seasonal range {:.4}, residual std {:.4}",
                d.kind, d.period, d.seasonal_range, d.residual_std
            )?;
        }
        Ok(())
    }
}

fn write_output(output: &RenderedOutput, dir: Option<&PathBuf>) -> Result<Vec<PathBuf>> {
    match dir {
        Some(dir) => output.write_to(dir),
        None => Ok(Vec::new()),
    }
}

/// Run one model; files are written when `--output` is given
pub fn forecast(args: &ForecastArgs) -> Result<(Report, RenderedOutput)> {
    let config = args.to_config()?;
    let report = run_pipeline(&config)?;
    let rendered = Reporter::new().render_report(&report)?;
    write_output(&rendered, args.output.as_ref())?;
    Ok((report, rendered))
}

/// Run the default model set against one holdout
pub fn compare(args: &CompareArgs) -> Result<(Vec<Report>, RenderedOutput)> {
    let config = args.to_config()?;
    let reports = run_comparison(&config, &default_comparison_models())?;
    let rendered = Reporter::new().render_reports(&reports)?;
    write_output(&rendered, args.output.as_ref())?;
    Ok((reports, rendered))
}
