//! Command-line arguments of `stock-forecast`

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use price_forecast::config::PipelineConfig;
use price_forecast::data::PriceField;
use price_forecast::models::{ArimaOrder, FitParams, SeasonalOrder, Trend, DEFAULT_CONFIDENCE};
use price_forecast::Result;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "stock-forecast", version)]
#[command(about = "Daily stock price forecasting with ARIMA, SARIMA and Prophet-style models")]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download raw daily quotes from Yahoo Finance
    #[cfg(feature = "fetch")]
    Download(DownloadArgs),

    /// Sort, de-duplicate and keep one price column
    Clean(CleanArgs),

    /// Stationarity tests, autocorrelations and seasonal decomposition
    Analyze(AnalyzeArgs),

    /// Fit one model and forecast
    Forecast(ForecastArgs),

    /// Fit the standard model set on the same holdout
    Compare(CompareArgs),
}

#[cfg(feature = "fetch")]
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Ticker symbol, e.g. AAPL
    #[arg(short, long)]
    pub symbol: String,

    /// First date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last date (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// CSV file to write
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Input file and the slice of it to use
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Price CSV with a Date column
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Price column to read (adj_close or close)
    #[arg(long)]
    pub price_field: Option<PriceField>,

    /// Ignore observations before this date
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Ignore observations after this date
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

impl InputArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(input) = &self.input {
            config.input = Some(input.clone());
        }
        if let Some(field) = self.price_field {
            config.price_field = field;
        }
        if self.start.is_some() {
            config.start = self.start;
        }
        if self.end.is_some() {
            config.end = self.end;
        }
    }
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Raw provider CSV
    #[arg(short, long)]
    pub input: PathBuf,

    /// Cleaned CSV to write
    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, default_value = "adj_close")]
    pub price_field: PriceField,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Price CSV with a Date column
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(long, default_value = "adj_close")]
    pub price_field: PriceField,

    /// Number of ACF/PACF lags
    #[arg(long, default_value_t = 40)]
    pub lags: usize,

    /// Season length for the decomposition (252 trading days per year)
    #[arg(long, default_value_t = 252)]
    pub period: usize,

    /// Significance level of the stationarity test
    #[arg(long, default_value_t = 0.05)]
    pub significance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    Arima,
    Sarima,
    Prophet,
}

impl ModelKind {
    /// Parameters for this model; missing orders default to (1,1,1) and
    /// (1,1,1,12)
    pub fn params(self, order: Option<ArimaOrder>, seasonal: Option<SeasonalOrder>) -> FitParams {
        let order = order.unwrap_or(ArimaOrder::new(1, 1, 1));
        match self {
            ModelKind::Arima => FitParams::Arima {
                order,
                trend: Trend::Auto,
                confidence: DEFAULT_CONFIDENCE,
            },
            ModelKind::Sarima => FitParams::Sarima {
                order,
                seasonal: seasonal.unwrap_or(SeasonalOrder::new(1, 1, 1, 12)),
                trend: Trend::Auto,
                confidence: DEFAULT_CONFIDENCE,
            },
            ModelKind::Prophet => FitParams::prophet(),
        }
    }
}

#[derive(Debug, Args)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub data: InputArgs,

    /// JSON pipeline configuration; flags override its fields
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    pub model: Option<ModelKind>,

    /// Non-seasonal order as p,d,q
    #[arg(long)]
    pub order: Option<ArimaOrder>,

    /// Seasonal order as P,D,Q,s
    #[arg(long)]
    pub seasonal_order: Option<SeasonalOrder>,

    /// Business days to forecast
    #[arg(short = 'H', long)]
    pub horizon: Option<usize>,

    /// Hold out the last `horizon` observations and report MAE/RMSE
    #[arg(long)]
    pub holdout: bool,

    /// Directory for forecast.svg and summary.md
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ForecastArgs {
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        self.data.apply(&mut config);
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if self.holdout {
            config.evaluate = true;
        }

        let kind = match (self.model, self.seasonal_order, self.order) {
            (Some(kind), _, _) => Some(kind),
            (None, Some(_), _) => Some(ModelKind::Sarima),
            (None, None, Some(_)) => Some(ModelKind::Arima),
            (None, None, None) => None,
        };
        if let Some(kind) = kind {
            config.model = kind.params(self.order, self.seasonal_order);
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub data: InputArgs,

    /// Business days to forecast and hold out
    #[arg(short = 'H', long, default_value_t = 30)]
    pub horizon: usize,

    /// Directory for forecast.svg and summary.md
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CompareArgs {
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::default()
            .with_horizon(self.horizon)
            .with_evaluation(true);
        self.data.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_forecast_flags() {
        let cli = parse(&[
            "stock-forecast",
            "forecast",
            "--input",
            "AAPL.csv",
            "--model",
            "sarima",
            "--order",
            "2,1,0",
            "--seasonal-order",
            "0,1,1,5",
            "-H",
            "60",
            "--holdout",
        ]);

        let Command::Forecast(args) = cli.command else {
            panic!("Expected the forecast command");
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.input, Some(PathBuf::from("AAPL.csv")));
        assert_eq!(config.horizon, 60);
        assert!(config.evaluate);
        assert_eq!(config.model.name(), "SARIMA(2,1,0)(0,1,1,5)");
    }

    #[test]
    fn test_order_implies_arima() {
        let cli = parse(&["stock-forecast", "forecast", "-i", "x.csv", "--order", "0,1,1"]);
        let Command::Forecast(args) = cli.command else {
            panic!("Expected the forecast command");
        };
        assert_eq!(args.to_config().unwrap().model.name(), "ARIMA(0,1,1)");
    }

    #[test]
    fn test_forecast_defaults() {
        let cli = parse(&["stock-forecast", "forecast", "-i", "x.csv"]);
        let Command::Forecast(args) = cli.command else {
            panic!("Expected the forecast command");
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.horizon, 30);
        assert!(!config.evaluate);
        assert_eq!(config.model, FitParams::arima(1, 1, 1));
        assert_eq!(config.price_field, PriceField::AdjClose);
    }

    #[test]
    fn test_bad_order_is_rejected() {
        assert!(Cli::try_parse_from(["stock-forecast", "forecast", "--order", "1,1"]).is_err());
        assert!(Cli::try_parse_from([
            "stock-forecast",
            "forecast",
            "--seasonal-order",
            "1,1,1,1"
        ])
        .is_err());
    }

    #[test]
    fn test_compare_always_holds_out() {
        let cli = parse(&["stock-forecast", "compare", "-i", "x.csv", "--price-field", "close"]);
        let Command::Compare(args) = cli.command else {
            panic!("Expected the compare command");
        };
        let config = args.to_config().unwrap();
        assert!(config.evaluate);
        assert_eq!(config.price_field, PriceField::Close);
    }
}
