use tracing::info;

use crate::{
    error::{PipelineError, Result, ToolError},
    media::MediaTool,
    types::{SceneAssets, SegmentFile},
    workspace::RunLayout,
};

/// Encode one scene's visual and narration into `segment_NN.mp4`.
pub async fn compose_segment(
    media: &dyn MediaTool,
    layout: &RunLayout,
    assets: &SceneAssets,
) -> Result<SegmentFile> {
    let path = layout.segment_path(assets.index);
    info!("Scene {}: composing {}", assets.index, path.display());

    media
        .encode_segment(&assets.visual, assets.visual_kind, &assets.audio, &path)
        .await
        .map_err(|e| match e {
            ToolError::Unavailable { tool } => PipelineError::tool_unavailable(tool),
            other => PipelineError::ComposeFailed {
                index: assets.index,
                reason: other.to_string(),
            },
        })?;

    Ok(SegmentFile {
        index: assets.index,
        path,
    })
}
