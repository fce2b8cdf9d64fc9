//! Rendering of forecasts: SVG chart and markdown summary
//!
//! [`Reporter::render`] is pure and returns everything in memory;
//! [`RenderedOutput::write_to`] is the only function here that touches the
//! filesystem.

use crate::data::Series;
use crate::error::{ForecastError, Result};
use crate::evaluation::Metrics;
use crate::models::{ForecastResult, ModelSummary};
use crate::pipeline::Report;
use crate::prepare::StationarityReport;
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const HISTORY_COLOR: RGBColor = RGBColor(31, 119, 180);
const PALETTE: [RGBColor; 5] = [
    RGBColor(214, 39, 40),
    RGBColor(44, 160, 44),
    RGBColor(255, 127, 14),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

/// Chart and summary produced by a [`Reporter`]
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOutput {
    pub svg: String,
    pub markdown: String,
    pub forecasts: Vec<ForecastResult>,
}

impl RenderedOutput {
    /// Write `forecast.svg` and `summary.md` into `dir`
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let svg_path = dir.join("forecast.svg");
        fs::write(&svg_path, &self.svg)?;

        let md_path = dir.join("summary.md");
        fs::write(&md_path, &self.markdown)?;

        info!(dir = %dir.display(), "Wrote report files");
        Ok(vec![svg_path, md_path])
    }
}

/// Turns forecasts into charts and summaries
#[derive(Debug, Clone)]
pub struct Reporter {
    width: u32,
    height: u32,
    title: Option<String>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 560,
            title: None,
        }
    }
}

fn render_err<E: std::fmt::Debug>(e: E) -> ForecastError {
    ForecastError::Render(format!("{:?}", e))
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Chart of the history and one forecast, plus its summary
    pub fn render(
        &self,
        series: &Series,
        forecast: &ForecastResult,
        metrics: Option<&Metrics>,
    ) -> Result<RenderedOutput> {
        self.single(series, forecast, metrics, None, None)
    }

    /// Render a pipeline report, including the fitted model and the
    /// stationarity check of the training data
    pub fn render_report(&self, report: &Report) -> Result<RenderedOutput> {
        self.single(
            &report.series,
            &report.forecast,
            report.metrics.as_ref(),
            Some(&report.summary),
            report.stationarity.as_ref(),
        )
    }

    fn single(
        &self,
        series: &Series,
        forecast: &ForecastResult,
        metrics: Option<&Metrics>,
        fit: Option<&ModelSummary>,
        stationarity: Option<&StationarityReport>,
    ) -> Result<RenderedOutput> {
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| format!("{} forecast: {}", series.label(), forecast.model));
        let svg = self.draw(series, &[forecast], &title)?;
        let markdown = single_summary(series, forecast, metrics, fit, stationarity);

        Ok(RenderedOutput {
            svg,
            markdown,
            forecasts: vec![forecast.clone()],
        })
    }

    /// Several forecasts of the same history on one chart, with a table
    pub fn render_comparison(
        &self,
        series: &Series,
        forecasts: &[(&ForecastResult, Option<&Metrics>)],
    ) -> Result<RenderedOutput> {
        self.comparison(series, forecasts, &[])
    }

    fn comparison(
        &self,
        series: &Series,
        forecasts: &[(&ForecastResult, Option<&Metrics>)],
        fits: &[&ModelSummary],
    ) -> Result<RenderedOutput> {
        if forecasts.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Nothing to compare: no forecasts given".to_string(),
            ));
        }

        let title = self
            .title
            .clone()
            .unwrap_or_else(|| format!("{} model comparison", series.label()));
        let only: Vec<&ForecastResult> = forecasts.iter().map(|(f, _)| *f).collect();
        let svg = self.draw(series, &only, &title)?;
        let markdown = comparison_summary(series, forecasts, fits);

        Ok(RenderedOutput {
            svg,
            markdown,
            forecasts: only.into_iter().cloned().collect(),
        })
    }

    /// Comparison chart for reports that share one series
    pub fn render_reports(&self, reports: &[Report]) -> Result<RenderedOutput> {
        let first = reports.first().ok_or_else(|| {
            ForecastError::InvalidParameter("Nothing to compare: no reports given".to_string())
        })?;
        let entries: Vec<(&ForecastResult, Option<&Metrics>)> = reports
            .iter()
            .map(|r| (&r.forecast, r.metrics.as_ref()))
            .collect();
        let fits: Vec<&ModelSummary> = reports.iter().map(|r| &r.summary).collect();
        self.comparison(&first.series, &entries, &fits)
    }

    fn draw(&self, series: &Series, forecasts: &[&ForecastResult], title: &str) -> Result<String> {
        let origin = series
            .first_date()
            .or_else(|| forecasts.iter().find_map(|f| f.points.first().map(|p| p.date)))
            .ok_or_else(|| ForecastError::Render("Nothing to draw".to_string()))?;
        let x_of = |d: NaiveDate| (d - origin).num_days() as f64;

        let history: Vec<(f64, f64)> = series
            .observations()
            .iter()
            .filter_map(|o| o.value.map(|v| (x_of(o.date), v)))
            .collect();

        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        let mut extend = |x: f64, lo: f64, hi: f64| {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(lo);
            y_max = y_max.max(hi);
        };
        for &(x, y) in &history {
            extend(x, y, y);
        }
        for f in forecasts {
            for p in &f.points {
                extend(x_of(p.date), p.lower.min(p.point), p.upper.max(p.point));
            }
        }
        if !(x_min.is_finite() && y_min.is_finite()) {
            return Err(ForecastError::Render("No finite values to draw".to_string()));
        }
        let x_pad = ((x_max - x_min) * 0.02).max(1.0);
        let y_pad = ((y_max - y_min) * 0.05).max(1e-6);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 24))
                .margin(12)
                .x_label_area_size(36)
                .y_label_area_size(60)
                .build_cartesian_2d(
                    (x_min - x_pad)..(x_max + x_pad),
                    (y_min - y_pad)..(y_max + y_pad),
                )
                .map_err(render_err)?;

            let date_label = |x: &f64| (origin + Duration::days(x.round() as i64)).to_string();
            chart
                .configure_mesh()
                .x_labels(8)
                .y_labels(8)
                .x_label_formatter(&date_label)
                .x_desc("Date")
                .y_desc("Price")
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(LineSeries::new(history.iter().copied(), &HISTORY_COLOR))
                .map_err(render_err)?
                .label(series.label())
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], HISTORY_COLOR));

            for (i, f) in forecasts.iter().enumerate() {
                let color = PALETTE[i % PALETTE.len()];

                let band: Vec<(f64, f64)> = f
                    .points
                    .iter()
                    .map(|p| (x_of(p.date), p.upper))
                    .chain(f.points.iter().rev().map(|p| (x_of(p.date), p.lower)))
                    .collect();
                chart
                    .draw_series(std::iter::once(Polygon::new(band, color.mix(0.15))))
                    .map_err(render_err)?;

                chart
                    .draw_series(LineSeries::new(
                        f.points.iter().map(|p| (x_of(p.date), p.point)),
                        &color,
                    ))
                    .map_err(render_err)?
                    .label(f.model.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }

        Ok(svg)
    }
}

fn fmt_metric(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "not evaluated".to_string())
}

fn horizon_text(forecast: &ForecastResult) -> String {
    match (forecast.points.first(), forecast.points.last()) {
        (Some(first), Some(last)) => format!(
            "{} business days ({} to {})",
            forecast.len(),
            first.date,
            last.date
        ),
        _ => "0 business days".to_string(),
    }
}

fn write_stationarity(md: &mut String, report: &StationarityReport) {
    let cv = &report.critical_values;
    let verdict = if report.statistic < cv.five_percent {
        "stationary at the 5% level"
    } else {
        "not stationary at the 5% level"
    };
    let _ = writeln!(md, "## Stationarity of the training data");
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "Augmented Dickey-Fuller statistic {:.4} (p-value {:.4}, {} lags, {} observations): {}.",
        report.statistic, report.p_value, report.used_lag, report.nobs, verdict
    );
    let _ = writeln!(
        md,
        "Critical values: 1% {:.3}, 5% {:.3}, 10% {:.3}.",
        cv.one_percent, cv.five_percent, cv.ten_percent
    );
    let _ = writeln!(md);
}

fn write_model_fit(md: &mut String, fit: &ModelSummary) {
    let _ = writeln!(md, "## Model fit: {}", fit.model);
    let _ = writeln!(md);
    let _ = writeln!(md, "| Term | Value |");
    let _ = writeln!(md, "|---|---|");
    for (name, value) in &fit.coefficients {
        let _ = writeln!(md, "| {} | {:.6} |", name, value);
    }
    let _ = writeln!(md, "| sigma2 | {:.6} |", fit.sigma2);
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "Observations: {}. Log likelihood: {:.3}. AIC: {:.3}. BIC: {:.3}.",
        fit.nobs, fit.log_likelihood, fit.aic, fit.bic
    );
    let _ = writeln!(md);
}

fn write_daily_forecast(md: &mut String, forecast: &ForecastResult) {
    let level = forecast.interval_level * 100.0;
    let _ = writeln!(md, "## Daily forecast");
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "| Date | Forecast | Lower {:.0}% | Upper {:.0}% |",
        level, level
    );
    let _ = writeln!(md, "|---|---|---|---|");
    for p in &forecast.points {
        let _ = writeln!(
            md,
            "| {} | {:.2} | {:.2} | {:.2} |",
            p.date, p.point, p.lower, p.upper
        );
    }
    let _ = writeln!(md);
}

fn single_summary(
    series: &Series,
    forecast: &ForecastResult,
    metrics: Option<&Metrics>,
    fit: Option<&ModelSummary>,
    stationarity: Option<&StationarityReport>,
) -> String {
    let level = forecast.interval_level * 100.0;
    let mut md = String::new();

    let _ = writeln!(md, "# Forecast summary: {}", series.label());
    let _ = writeln!(md);
    let _ = writeln!(md, "| Item | Value |");
    let _ = writeln!(md, "|---|---|");
    let _ = writeln!(md, "| Model | {} |", forecast.model);
    if let Some(last) = series.last_date() {
        let _ = writeln!(md, "| Last observation | {} |", last);
    }
    let _ = writeln!(md, "| Horizon | {} |", horizon_text(forecast));
    let _ = writeln!(md, "| Interval level | {:.0}% |", level);
    let _ = writeln!(md, "| MAE | {} |", fmt_metric(metrics.map(|m| m.mae)));
    let _ = writeln!(md, "| RMSE | {} |", fmt_metric(metrics.map(|m| m.rmse)));
    if let Some(last) = forecast.points.last() {
        let _ = writeln!(
            md,
            "| Final forecast | {:.2} ({:.2} to {:.2}) |",
            last.point, last.lower, last.upper
        );
    }
    let _ = writeln!(md);
    if let Some(report) = stationarity {
        write_stationarity(&mut md, report);
    }
    if let Some(fit) = fit {
        write_model_fit(&mut md, fit);
    }
    write_daily_forecast(&mut md, forecast);
    let _ = writeln!(md, "## Reading the chart");
    let _ = writeln!(md);
    let _ = writeln!(md, "- The blue line is the observed price history.");
    let _ = writeln!(
        md,
        "- The coloured line is the predicted price for each business day after the last observation."
    );
    let _ = writeln!(
        md,
        "- The shaded band is the {:.0}% interval: the range the model considers likely. It widens further out because uncertainty accumulates.",
        level
    );
    let _ = writeln!(
        md,
        "- MAE is the average absolute gap between forecast and actual prices. RMSE penalises large misses more heavily."
    );
    let _ = writeln!(
        md,
        "- Forecasts extrapolate past behaviour and do not anticipate news, earnings or market shocks."
    );
    md
}

fn comparison_summary(
    series: &Series,
    forecasts: &[(&ForecastResult, Option<&Metrics>)],
    fits: &[&ModelSummary],
) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Model comparison: {}", series.label());
    let _ = writeln!(md);
    let _ = writeln!(md, "| Model | Horizon | Interval | MAE | RMSE | Final forecast |");
    let _ = writeln!(md, "|---|---|---|---|---|---|");
    for (f, m) in forecasts {
        let last = f
            .points
            .last()
            .map(|p| format!("{:.2}", p.point))
            .unwrap_or_default();
        let _ = writeln!(
            md,
            "| {} | {} | {:.0}% | {} | {} | {} |",
            f.model,
            f.len(),
            f.interval_level * 100.0,
            fmt_metric(m.map(|m| m.mae)),
            fmt_metric(m.map(|m| m.rmse)),
            last
        );
    }

    let best = forecasts
        .iter()
        .filter_map(|(f, m)| m.map(|m| (f.model.as_str(), m.rmse)))
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((model, rmse)) = best {
        let _ = writeln!(md);
        let _ = writeln!(md, "Lowest RMSE: **{}** ({:.4}).", model, rmse);
    }

    if !fits.is_empty() {
        let _ = writeln!(md);
        let _ = writeln!(md, "## Model fit");
        let _ = writeln!(md);
        let _ = writeln!(md, "| Model | Observations | sigma2 | Log likelihood | AIC | BIC |");
        let _ = writeln!(md, "|---|---|---|---|---|---|");
        for fit in fits {
            let _ = writeln!(
                md,
                "| {} | {} | {:.6} | {:.3} | {:.3} | {:.3} |",
                fit.model, fit.nobs, fit.sigma2, fit.log_likelihood, fit.aic, fit.bic
            );
        }
    }

    // Rows follow the longest forecast; shorter ones leave blanks
    let rows = forecasts.iter().map(|(f, _)| f.len()).max().unwrap_or(0);
    if rows > 0 {
        let _ = writeln!(md);
        let _ = writeln!(md, "## Daily forecasts");
        let _ = writeln!(md);
        let mut header = String::from("| Date |");
        let mut rule = String::from("|---|");
        for (f, _) in forecasts {
            let _ = write!(header, " {} |", f.model);
            rule.push_str("---|");
        }
        let _ = writeln!(md, "{}", header);
        let _ = writeln!(md, "{}", rule);
        for i in 0..rows {
            let date = forecasts
                .iter()
                .find_map(|(f, _)| f.points.get(i).map(|p| p.date.to_string()))
                .unwrap_or_default();
            let mut line = format!("| {} |", date);
            for (f, _) in forecasts {
                match f.points.get(i) {
                    Some(p) => {
                        let _ = write!(line, " {:.2} |", p.point);
                    }
                    None => line.push_str(" |"),
                }
            }
            let _ = writeln!(md, "{}", line);
        }
    }
    md
}
