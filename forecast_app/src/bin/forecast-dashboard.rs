//! # forecast-dashboard
//!
//! Serves the single-page forecast dashboard for one price CSV.

use anyhow::{Context, Result};
use clap::Parser;
use forecast_app::dashboard::{resolve_config, router};
use forecast_app::{telemetry, AppState};
use price_forecast::data::PriceField;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "forecast-dashboard", version)]
#[command(about = "Web dashboard for daily stock price forecasts")]
struct Args {
    /// Cleaned price CSV
    #[arg(short, long)]
    input: PathBuf,

    /// Price column to read (adj_close or close); overrides the config file
    #[arg(long)]
    price_field: Option<PriceField>,

    /// JSON pipeline configuration; defaults to Prophet with a holdout
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "forecast_dashboard=info,forecast_app=info,price_forecast=info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(&args.log);

    let config = resolve_config(args.config.as_deref(), args.input.clone(), args.price_field)
        .context("Invalid dashboard configuration")?;
    let app = router(AppState::from_config(config)?);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {}", addr))?;

    tracing::info!(
        "forecast-dashboard v{} listening on http://{}",
        env!("CARGO_PKG_VERSION"),
        addr
    );
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
