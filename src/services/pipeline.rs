use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::Config;
use crate::models::ChannelRecord;
use crate::services::m3u_parser::M3UParser;
use crate::services::merger::merge_channels;
use crate::services::prober::LivenessProber;
use crate::services::snapshot::{load_snapshot, save_snapshot};

/// Summary of a single pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub sources_attempted: usize,
    pub sources_failed: usize,
    pub channels_parsed: usize,
    pub channels_from_snapshot: usize,
    pub unique_channels: usize,
    pub channels_alive: usize,
    pub output_file: PathBuf,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

/// Fetch -> parse -> merge -> probe -> save
pub struct Pipeline {
    config: Config,
    parser: M3UParser,
    prober: LivenessProber,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let parser = M3UParser::new(
            &config.user_agent,
            config.fetch_timeout_ms,
            config.max_m3u_size_mb,
        )
        .context("Failed to create playlist HTTP client")?;
        let prober = LivenessProber::from_config(&config).context("Failed to create probe HTTP client")?;

        Ok(Self {
            config,
            parser,
            prober,
        })
    }

    /// Run the whole pipeline. Only a failure to write the output is an error.
    pub async fn run(&self) -> Result<PipelineReport> {
        let start = Instant::now();
        let mut report = PipelineReport {
            output_file: self.config.output_file.clone(),
            ..Default::default()
        };

        let merged = self.collect(&mut report).await;
        report.unique_channels = merged.len();

        let alive = if self.config.skip_probe {
            tracing::info!("Probing disabled, keeping all {} channels", merged.len());
            merged
        } else {
            self.filter_alive(merged).await
        };
        report.channels_alive = alive.len();

        save_snapshot(&self.config.output_file, &alive)
            .await
            .context("Failed to save channels")?;

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        report.finished_at = Utc::now();
        Ok(report)
    }

    /// Fetch and parse every source, then merge with the previous snapshot.
    /// Sources are merged in configuration order, the snapshot last.
    pub async fn collect(&self, report: &mut PipelineReport) -> Vec<ChannelRecord> {
        let mut sources: Vec<Vec<ChannelRecord>> = Vec::new();

        for url in &self.config.playlist_sources {
            report.sources_attempted += 1;
            match self.parser.fetch_and_parse(url).await {
                Ok(channels) => {
                    report.channels_parsed += channels.len();
                    sources.push(channels);
                }
                Err(e) => {
                    report.sources_failed += 1;
                    tracing::warn!("Failed to fetch playlist {}: {}", url, e);
                }
            }
        }

        if self.config.merge_previous {
            let previous = load_snapshot(&self.config.output_file).await;
            report.channels_from_snapshot = previous.len();
            sources.push(previous);
        }

        merge_channels(sources)
    }

    /// Probe every channel in order, keeping only the reachable ones
    pub async fn filter_alive(&self, channels: Vec<ChannelRecord>) -> Vec<ChannelRecord> {
        let total = channels.len();
        tracing::info!("Checking {} channels", total);

        let mut alive = Vec::with_capacity(total);
        for (index, channel) in channels.into_iter().enumerate() {
            let working = self.prober.probe_channel(&channel).await;
            tracing::info!(
                "[{}/{}] {} {} ({})",
                index + 1,
                total,
                if working { "OK" } else { "DEAD" },
                channel.title,
                channel.stream_url
            );
            if working {
                alive.push(channel);
            }
        }

        tracing::info!("{} of {} channels are working", alive.len(), total);
        alive
    }
}
