//! Single-page forecast dashboard
//!
//! `GET /` shows the horizon selector. `GET /forecast?horizon=N` holds out
//! the last `N` observations, runs the pipeline on a blocking thread and
//! returns the page with the chart and the summary. Failures are shown as
//! an inline error block in place of the chart.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use price_forecast::config::PipelineConfig;
use price_forecast::data::{DataSource, PriceField};
use price_forecast::models::FitParams;
use price_forecast::pipeline::{source_from_config, Pipeline};
use price_forecast::report::{RenderedOutput, Reporter};
use price_forecast::{ForecastError, Result};
use pulldown_cmark::{html, Event, Options, Parser};
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Forecast horizon in days: 30 to 180 in steps of 30
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Horizon(usize);

impl Horizon {
    pub const MIN: usize = 30;
    pub const MAX: usize = 180;
    pub const STEP: usize = 30;

    pub fn new(days: usize) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&days) || days % Self::STEP != 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Horizon must be one of {}..={} in steps of {}, got {}",
                Self::MIN,
                Self::MAX,
                Self::STEP,
                days
            )));
        }
        Ok(Self(days))
    }

    /// Parse a query value; a missing value means the smallest horizon
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self(Self::MIN)),
            Some(s) => {
                let days = s.parse::<usize>().map_err(|_| {
                    ForecastError::InvalidParameter(format!("Horizon '{}' is not a number", s))
                })?;
                Self::new(days)
            }
        }
    }

    pub fn days(&self) -> usize {
        self.0
    }

    /// Every selectable horizon
    pub fn choices() -> impl Iterator<Item = Horizon> {
        (Self::MIN..=Self::MAX).step_by(Self::STEP).map(Horizon)
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

/// Shared, read-only dashboard state
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn DataSource + Send + Sync>,
    base: Arc<PipelineConfig>,
    title: Arc<str>,
}

impl AppState {
    /// Serve forecasts of `source`; the model and price settings come from
    /// `base`, the horizon from each request
    pub fn new<S>(source: S, base: PipelineConfig) -> Self
    where
        S: DataSource + Send + Sync + 'static,
    {
        let title = format!("{} price forecast ({})", source.name(), base.model.name());
        Self {
            source: Arc::new(source),
            base: Arc::new(base),
            title: title.into(),
        }
    }

    /// Serve the CSV file named by `config.input`
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let source = source_from_config(&config)?;
        Ok(Self::new(source, config))
    }

    /// Dashboard defaults: Prophet with a holdout the size of the horizon
    pub fn default_config() -> PipelineConfig {
        PipelineConfig::default()
            .with_model(FitParams::prophet())
            .with_evaluation(true)
    }

    fn config_for(&self, horizon: Horizon) -> PipelineConfig {
        (*self.base).clone().with_horizon(horizon.days())
    }
}

/// Dashboard configuration: the JSON file (or the defaults), the input
/// file, and a price field that wins only when given explicitly
pub fn resolve_config(
    config_file: Option<&Path>,
    input: PathBuf,
    price_field: Option<PriceField>,
) -> Result<PipelineConfig> {
    let mut config = match config_file {
        Some(path) => PipelineConfig::from_json_file(path)?.with_evaluation(true),
        None => AppState::default_config(),
    };
    config.input = Some(input);
    if let Some(field) = price_field {
        config.price_field = field;
        config.price_column = None;
    }
    config.validate()?;
    Ok(config)
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    pub horizon: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/forecast", get(forecast))
        .with_state(state)
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state.title, Horizon::default(), &Body::Prompt))
}

pub async fn forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> (StatusCode, Html<String>) {
    let horizon = match Horizon::parse(query.horizon.as_deref()) {
        Ok(h) => h,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Html(render_page(&state.title, Horizon::default(), &Body::Error(e.to_string()))),
            )
        }
    };

    info!(horizon = horizon.days(), "Forecast requested");
    let config = state.config_for(horizon);
    let source = state.source.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<RenderedOutput> {
        let report = Pipeline::new(source).run(&config)?;
        Reporter::new().render_report(&report)
    })
    .await;

    let (status, body) = match outcome {
        Ok(Ok(rendered)) => (StatusCode::OK, Body::Forecast(rendered)),
        Ok(Err(e)) => {
            error!(error = %e, "Forecast failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Body::Error(e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Forecast task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Body::Error("The forecast task did not finish".to_string()),
            )
        }
    };
    (status, Html(render_page(&state.title, horizon, &body)))
}

/// What goes below the controls
pub enum Body {
    Prompt,
    Forecast(RenderedOutput),
    Error(String),
}

pub fn render_page(title: &str, selected: Horizon, body: &Body) -> String {
    let mut html = String::new();
    let title = escape_html(title);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n"
    );

    html.push_str("<form method=\"get\" action=\"/forecast\">\n<label for=\"horizon\">Forecast horizon (days)</label>\n<select id=\"horizon\" name=\"horizon\">\n");
    for h in Horizon::choices() {
        let selected_attr = if h == selected { " selected" } else { "" };
        let _ = writeln!(
            html,
            "<option value=\"{0}\"{1}>{0}</option>",
            h.days(),
            selected_attr
        );
    }
    html.push_str("</select>\n<button type=\"submit\">Generate forecast</button>\n</form>\n");

    match body {
        Body::Prompt => {
            html.push_str(
                "<p class=\"prompt\">Click <strong>Generate forecast</strong> to see the forecast.</p>\n",
            );
        }
        Body::Forecast(rendered) => {
            html.push_str("<h2>Forecast chart</h2>\n<div class=\"chart\">\n");
            html.push_str(&rendered.svg);
            html.push_str("\n</div>\n<div class=\"summary\">\n");
            html.push_str(&markdown_to_html(&rendered.markdown));
            html.push_str("</div>\n");
        }
        Body::Error(message) => {
            let _ = writeln!(
                html,
                "<div class=\"error\"><strong>Forecast failed:</strong> {}</div>",
                escape_html(message)
            );
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

const STYLE: &str = "body{font-family:sans-serif;margin:2rem auto;max-width:1080px;color:#222}\
form{margin:1rem 0}select,button{font-size:1rem;margin-left:.5rem}\
.chart svg{max-width:100%;height:auto}\
.summary{background:#f6f8fa;padding:1rem}\
.summary table{border-collapse:collapse;margin:.5rem 0}\
.summary th,.summary td{border:1px solid #d0d7de;padding:.25rem .6rem;text-align:right}\
.error{background:#fdecea;border:1px solid #d93025;padding:1rem;color:#a50e0e}";

/// Markdown summary as HTML; raw HTML in the source is shown as text
fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, events);
    out
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
