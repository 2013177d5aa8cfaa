use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kb4_training_report::config::Config;
use kb4_training_report::pipeline::ReportGenerator;

/// Generate a KnowBe4 security-awareness training compliance report.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Directory the report files are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

/// Loads configuration, fetches training data and writes the report.
async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;
    tracing::info!("Configuration loaded from {}", args.config.display());

    let generator = ReportGenerator::new(config)?;
    let files = generator.generate_report(args.output_dir.clone()).await?;

    tracing::info!("Report complete: {}", files.metrics.display());
    if let Some(untrained) = files.untrained {
        tracing::info!("Untrained users report: {}", untrained.display());
    }
    Ok(())
}

/// Main entry point.
///
/// Failures are logged; the process always exits normally.
#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kb4_training_report=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("Report generation failed: {:#}", e);
    }
}
