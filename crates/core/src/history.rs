//! Local run log, one JSON object per line.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;
use uuid::Uuid;

use crate::{error::Result, types::RenderedVideo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    /// Seconds since the Unix epoch.
    pub finished_at: u64,
    pub outcome: RunOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scenes: usize,
    pub placeholders: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl RunRecord {
    pub fn succeeded(video: &RenderedVideo, topic: Option<String>) -> Self {
        Self {
            run_id: video.run_id,
            finished_at: now(),
            outcome: RunOutcome::Succeeded,
            output: Some(video.output.clone()),
            error: None,
            scenes: video.scenes.len(),
            placeholders: video.placeholder_scenes.len(),
            topic,
            thumbnail: None,
        }
    }

    pub fn failed(run_id: Uuid, error: impl Display, scenes: usize, topic: Option<String>) -> Self {
        Self {
            run_id,
            finished_at: now(),
            outcome: RunOutcome::Failed,
            output: None,
            error: Some(error.to_string()),
            scenes,
            placeholders: 0,
            topic,
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub async fn append_run_record(path: &Path, record: &RunRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut line = serde_json::to_string(record).map_err(std::io::Error::other)?;
    line.push('\n');

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Load every readable record. A missing file is an empty history; malformed lines are skipped.
pub async fn load_run_records(path: &Path) -> Result<Vec<RunRecord>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping {} line {}: {}", path.display(), number + 1, e),
        }
    }
    Ok(records)
}
