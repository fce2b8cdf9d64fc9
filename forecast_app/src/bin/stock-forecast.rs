//! # stock-forecast
//!
//! Command-line front end of the price forecaster.
//!
//! ```text
//! stock-forecast clean --input raw/AAPL.csv --output data/AAPL.csv
//! stock-forecast analyze --input data/AAPL.csv
//! stock-forecast forecast --input data/AAPL.csv --model arima --order 1,1,1 --holdout --output out
//! stock-forecast compare --input data/AAPL.csv --horizon 30 --output out
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use forecast_app::cli::{Cli, Command};
use forecast_app::{commands, telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log);

    match &cli.command {
        #[cfg(feature = "fetch")]
        Command::Download(args) => {
            let rows = commands::download(args)
                .with_context(|| format!("Failed to download {}", args.symbol))?;
            println!("Saved {} rows to {}", rows, args.output.display());
        }
        Command::Clean(args) => {
            let series = commands::clean(args)
                .with_context(|| format!("Failed to clean {}", args.input.display()))?;
            println!(
                "Saved {} observations of '{}' to {}",
                series.len(),
                series.label(),
                args.output.display()
            );
        }
        Command::Analyze(args) => {
            let analysis = commands::analyze(args)
                .with_context(|| format!("Failed to analyze {}", args.input.display()))?;
            print!("{}", analysis);
        }
        Command::Forecast(args) => {
            let (report, rendered) = commands::forecast(args).context("Forecast failed")?;
            print!("{}", rendered.markdown);
            if let Some(dir) = &args.output {
                println!("\nWrote {} forecast to {}", report.model, dir.display());
            }
        }
        Command::Compare(args) => {
            let (reports, rendered) = commands::compare(args).context("Comparison failed")?;
            print!("{}", rendered.markdown);
            if let Some(dir) = &args.output {
                println!("\nWrote {} forecasts to {}", reports.len(), dir.display());
            }
        }
    }

    Ok(())
}
