use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::{
    error::{PipelineError, Result, ToolError},
    media::MediaTool,
    provider::ProviderError,
    speech::SpeechSynthesizer,
    types::{NarrationSource, Scene, SceneAssets},
    visual::VisualGenerator,
    workspace::RunLayout,
};

/// Shortest silent placeholder, in seconds.
pub const MIN_PLACEHOLDER_SECONDS: u32 = 3;

/// Length of the silence that stands in for a narration, at about 2.5 spoken words per second.
pub fn placeholder_seconds(narration: &str) -> u32 {
    let words = narration.split_whitespace().count() as u32;
    let spoken = (words * 2).div_ceil(5);
    spoken.max(MIN_PLACEHOLDER_SECONDS)
}

/// Produces the narration audio and the visual for each scene.
pub struct AssetSynthesizer<'a> {
    speech: &'a dyn SpeechSynthesizer,
    visuals: &'a dyn VisualGenerator,
    media: &'a dyn MediaTool,
    layout: &'a RunLayout,
}

impl<'a> AssetSynthesizer<'a> {
    pub fn new(
        speech: &'a dyn SpeechSynthesizer,
        visuals: &'a dyn VisualGenerator,
        media: &'a dyn MediaTool,
        layout: &'a RunLayout,
    ) -> Self {
        Self {
            speech,
            visuals,
            media,
            layout,
        }
    }

    /// Generate both assets for one scene.
    ///
    /// A visual failure aborts the scene. A narration failure is logged and
    /// replaced by silence, so the scene still gets an audio track.
    pub async fn synthesize(&self, index: usize, scene: &Scene) -> Result<SceneAssets> {
        let visual_kind = self.visuals.kind();
        let visual = self.layout.visual_path(index, visual_kind);
        let audio = self.layout.audio_path(index);

        info!("Scene {}: generating visual with {}", index, self.visuals.name());
        self.visuals
            .generate(&scene.visual_prompt, &visual)
            .await
            .map_err(|source| PipelineError::VisualSynthesisFailed { index, source })?;

        info!("Scene {}: synthesizing narration with {}", index, self.speech.name());
        let spoken = match self.speech.synthesize(&scene.narration, &audio).await {
            Ok(()) => audio_written(self.speech.name(), &audio).await,
            Err(e) => Err(e),
        };
        let narration = match spoken {
            Ok(()) => NarrationSource::Synthesized,
            Err(source) => {
                let failure = PipelineError::NarrationSynthesisFailed { index, source };
                let seconds = placeholder_seconds(&scene.narration);
                warn!("{}; using {}s of silence instead", failure, seconds);

                self.media
                    .render_silence(seconds, &audio)
                    .await
                    .map_err(|e| placeholder_error(index, e))?;

                NarrationSource::Placeholder {
                    seconds,
                    reason: failure.to_string(),
                }
            }
        };

        Ok(SceneAssets {
            index,
            visual,
            visual_kind,
            audio,
            narration,
        })
    }
}

/// A synthesizer that reports success must have left a non-empty file behind.
async fn audio_written(
    provider_name: &'static str,
    audio: &Path,
) -> std::result::Result<(), ProviderError> {
    match fs::metadata(audio).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(ProviderError::InvalidResponse {
            provider_name,
            reason: format!("no audio written to {}", audio.display()),
        }),
    }
}

fn placeholder_error(index: usize, error: ToolError) -> PipelineError {
    match error {
        ToolError::Unavailable { tool } => PipelineError::tool_unavailable(tool),
        other => PipelineError::ComposeFailed {
            index,
            reason: format!("could not render placeholder narration: {}", other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_narration_gets_minimum() {
        assert_eq!(placeholder_seconds(""), 3);
        assert_eq!(placeholder_seconds("Wake up."), 3);
        assert_eq!(placeholder_seconds("one two three four five six seven"), 3);
    }

    #[test]
    fn test_long_narration_rounds_up() {
        // 8 words / 2.5 = 3.2
        assert_eq!(placeholder_seconds("a b c d e f g h"), 4);
        // 10 words / 2.5 = 4.0
        assert_eq!(placeholder_seconds("a b c d e f g h i j"), 4);
        assert_eq!(placeholder_seconds("a b c d e f g h i j k"), 5);
    }

    #[tokio::test]
    async fn test_empty_audio_file_is_not_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let audio = dir.path().join("audio_00.mp3");

        assert!(audio_written("Fake", &audio).await.is_err());
        std::fs::write(&audio, b"").unwrap();
        assert!(matches!(
            audio_written("Fake", &audio).await,
            Err(ProviderError::InvalidResponse { .. })
        ));
        std::fs::write(&audio, b"ID3").unwrap();
        assert!(audio_written("Fake", &audio).await.is_ok());
    }

    #[test]
    fn test_whitespace_runs_count_once() {
        assert_eq!(
            placeholder_seconds("  a\tb\n c  d e f g h  "),
            placeholder_seconds("a b c d e f g h")
        );
    }
}
