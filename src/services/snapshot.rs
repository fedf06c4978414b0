use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::models::{ChannelRecord, SnapshotEntry};

/// Errors raised while writing the channel snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize channels: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SnapshotError + '_ {
    move |source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load channels saved by a previous run.
///
/// Any failure (missing file, unreadable file, invalid JSON, non-array top
/// level) yields an empty list. Individual entries that cannot be decoded or
/// carry no stream URL are skipped.
pub async fn load_snapshot(path: &Path) -> Vec<ChannelRecord> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No previous snapshot at {}", path.display());
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("Failed to read snapshot {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let entries = match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(serde_json::Value::Array(entries)) => entries,
        Ok(_) => {
            tracing::warn!("Snapshot {} is not a JSON array, ignoring", path.display());
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("Failed to parse snapshot {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let total = entries.len();
    let channels: Vec<ChannelRecord> = entries
        .into_iter()
        .filter_map(|value| serde_json::from_value::<SnapshotEntry>(value).ok())
        .filter_map(SnapshotEntry::into_record)
        .collect();

    if channels.len() < total {
        tracing::warn!(
            "Skipped {} invalid snapshot entries in {}",
            total - channels.len(),
            path.display()
        );
    }
    tracing::info!("Loaded {} channels from {}", channels.len(), path.display());

    channels
}

/// Save channels as a pretty-printed JSON array (tmp file + atomic rename)
pub async fn save_snapshot(path: &Path, channels: &[ChannelRecord]) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_error(parent))?;
    }

    let json = serde_json::to_vec_pretty(channels)?;
    let tmp_path = tmp_path(path);

    let file = File::create(&tmp_path).await.map_err(io_error(&tmp_path))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&json).await.map_err(io_error(&tmp_path))?;
    writer.write_all(b"\n").await.map_err(io_error(&tmp_path))?;
    writer.flush().await.map_err(io_error(&tmp_path))?;
    writer.get_ref().sync_all().await.map_err(io_error(&tmp_path))?;
    drop(writer);

    fs::rename(&tmp_path, path).await.map_err(io_error(path))?;

    tracing::info!("Saved {} channels to {}", channels.len(), path.display());
    Ok(())
}
