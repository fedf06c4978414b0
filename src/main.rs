mod config;
mod models;
mod services;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iptv_merger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();

    tracing::info!("Starting IPTV merger v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Playlist sources: {}", config.playlist_sources.len());
    if config.ci {
        tracing::info!("CI environment detected");
    }

    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run().await?;

    tracing::info!(
        sources_attempted = report.sources_attempted,
        sources_failed = report.sources_failed,
        channels_parsed = report.channels_parsed,
        channels_from_snapshot = report.channels_from_snapshot,
        unique_channels = report.unique_channels,
        channels_alive = report.channels_alive,
        elapsed_ms = report.elapsed_ms,
        finished_at = %report.finished_at.to_rfc3339(),
        "Saved {} working channels to {}",
        report.channels_alive,
        report.output_file.display()
    );

    Ok(())
}
