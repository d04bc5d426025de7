//! Joins composed segments into the final video.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::{
    error::{PipelineError, Result, ToolError},
    media::MediaTool,
    types::SegmentFile,
    workspace::RunLayout,
};

/// Render a concat-demuxer manifest, one `file '<path>'` line per segment in the given order.
///
/// Paths are absolute with `/` separators; single quotes are escaped the way
/// the demuxer expects (`'\''`).
pub fn render_manifest(segments: &[SegmentFile]) -> Result<String> {
    let mut manifest = String::new();
    for segment in segments {
        let absolute = std::path::absolute(&segment.path)?;
        let normalized = absolute.to_string_lossy().replace('\\', "/");
        manifest.push_str(&format!("file '{}'\n", normalized.replace('\'', r"'\''")));
    }
    Ok(manifest)
}

/// Write the manifest and stream-copy the segments into `final_video.mp4`.
pub async fn concatenate(
    media: &dyn MediaTool,
    layout: &RunLayout,
    segments: &[SegmentFile],
) -> Result<PathBuf> {
    if segments.is_empty() {
        return Err(PipelineError::ConcatenationFailed {
            reason: "no segments to join".to_string(),
        });
    }

    if let Some(missing) = first_missing(segments).await {
        return Err(PipelineError::ConcatenationFailed {
            reason: format!("segment {} is missing", missing.display()),
        });
    }

    let manifest_path = layout.manifest_path();
    fs::write(&manifest_path, render_manifest(segments)?).await?;

    let output = layout.final_path();
    info!(
        "Joining {} segments into {}",
        segments.len(),
        output.display()
    );

    media
        .concat(&manifest_path, &output)
        .await
        .map_err(|e| match e {
            ToolError::Unavailable { tool } => PipelineError::tool_unavailable(tool),
            other => PipelineError::ConcatenationFailed {
                reason: other.to_string(),
            },
        })?;

    Ok(output)
}

async fn first_missing(segments: &[SegmentFile]) -> Option<&Path> {
    for segment in segments {
        if !fs::try_exists(&segment.path).await.unwrap_or(false) {
            return Some(&segment.path);
        }
    }
    None
}
