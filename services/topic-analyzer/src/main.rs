use anyhow::{Context, Result};
use clap::Parser;
use diet_topic_analyzer::cli::Cli;
use diet_topic_analyzer::{AnalyzerConfig, Pipeline};
use shared::telemetry::{init_telemetry, TelemetryConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_telemetry(TelemetryConfig::from_env("diet-topics"))?;

    let cli = Cli::parse();
    let period = cli.command.period()?;

    let mut config = AnalyzerConfig::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    info!(
        "Starting diet-topics for {} (model {}, output {})",
        period.label(),
        config.openai.model,
        config.output_dir.display()
    );

    let mut pipeline = Pipeline::from_config(&config)?
        .with_chart(cli.command.is_yearly())
        .with_progress(!cli.no_progress);
    let summary = pipeline.run(&period).await?;

    if !summary.has_data() {
        return Ok(());
    }
    if !summary.is_complete() {
        warn!("Reports for {} were built from incomplete records", summary.period);
    }
    if summary.failed_chunks > 0 {
        warn!(
            "{} of {} chunks produced no topics after retries",
            summary.failed_chunks, summary.chunks
        );
    }
    for path in &summary.reports {
        info!("Wrote {}", path.display());
    }
    info!("{} text-generation requests made", summary.llm_requests);

    Ok(())
}
