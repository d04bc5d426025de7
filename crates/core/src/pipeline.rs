//! Scene pipeline: segment, synthesize, compose, concatenate.
//!
//! Every stage finishes for the whole batch before the next one starts, and
//! scenes are handled one at a time in plan order.

use std::sync::Arc;

use tokio::fs;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    composer::compose_segment,
    concat::concatenate,
    error::{PipelineError, Result},
    media::MediaTool,
    segmenter::parse_scenes,
    speech::SpeechSynthesizer,
    status::{self, StatusStore, StatusValue},
    synthesizer::AssetSynthesizer,
    types::{NarrationSource, RenderedVideo, Stage},
    visual::VisualGenerator,
    workspace::RunLayout,
};

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Stage(Stage),
    ScenesFound(usize),
    SceneSynthesized {
        index: usize,
        total: usize,
        placeholder: bool,
    },
    SegmentComposed {
        index: usize,
        total: usize,
    },
}

pub struct ScenePipeline {
    speech: Box<dyn SpeechSynthesizer>,
    visuals: Box<dyn VisualGenerator>,
    media: Box<dyn MediaTool>,
    status: Arc<dyn StatusStore>,
    layout: RunLayout,
}

impl ScenePipeline {
    pub fn new(
        speech: Box<dyn SpeechSynthesizer>,
        visuals: Box<dyn VisualGenerator>,
        media: Box<dyn MediaTool>,
        status: Arc<dyn StatusStore>,
        layout: RunLayout,
    ) -> Self {
        Self {
            speech,
            visuals,
            media,
            status,
            layout,
        }
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    pub fn status(&self) -> &Arc<dyn StatusStore> {
        &self.status
    }

    pub async fn run(&self, plan: &str) -> Result<RenderedVideo> {
        self.run_with_progress(plan, |_| {}).await
    }

    pub async fn run_with_progress<F>(&self, plan: &str, mut on_progress: F) -> Result<RenderedVideo>
    where
        F: FnMut(Progress) + Send,
    {
        let run_id = Uuid::new_v4();
        self.status.set(status::RUN_ID, run_id.to_string().into());
        for counter in [
            status::SCENES_TOTAL,
            status::SCENES_SYNTHESIZED,
            status::NARRATION_PLACEHOLDERS,
            status::SEGMENTS_COMPOSED,
        ] {
            self.status.set(counter, StatusValue::Count(0));
        }

        match self.execute(run_id, plan, &mut on_progress).await {
            Ok(video) => {
                self.enter(Stage::Done, &mut on_progress);
                self.status.increment(status::RUNS_COMPLETED);
                self.status.set(
                    status::LAST_OUTPUT,
                    video.output.display().to_string().into(),
                );
                info!("Run {} finished: {}", run_id, video.output.display());
                Ok(video)
            }
            Err(e) => {
                self.enter(Stage::Failed, &mut on_progress);
                self.status.increment(status::RUNS_FAILED);
                self.status.set(status::LAST_ERROR, e.to_string().into());
                error!("Run {} failed: {}", run_id, e);
                Err(e)
            }
        }
    }

    fn enter<F: FnMut(Progress)>(&self, stage: Stage, on_progress: &mut F) {
        self.status.set(status::STAGE, stage.as_str().into());
        info!("Stage: {}", stage.as_str());
        on_progress(Progress::Stage(stage));
    }

    async fn execute<F>(&self, run_id: Uuid, plan: &str, on_progress: &mut F) -> Result<RenderedVideo>
    where
        F: FnMut(Progress) + Send,
    {
        self.enter(Stage::Segmenting, on_progress);
        let scenes = parse_scenes(plan);
        if scenes.is_empty() {
            return Err(PipelineError::SegmentationEmpty);
        }
        let total = scenes.len();
        self.status.set(status::SCENES_TOTAL, StatusValue::Count(total as u64));
        info!("Found {} scenes", total);
        on_progress(Progress::ScenesFound(total));

        // Nothing is paid for until the media tool is known to exist.
        self.media
            .locate()
            .await
            .map_err(|_| PipelineError::tool_unavailable(self.media.name()))?;

        self.enter(Stage::Synthesizing, on_progress);
        fs::create_dir_all(self.layout.root()).await?;
        remove_stale(&self.layout.final_path()).await?;

        let synthesizer = AssetSynthesizer::new(
            self.speech.as_ref(),
            self.visuals.as_ref(),
            self.media.as_ref(),
            &self.layout,
        );
        let mut assets = Vec::with_capacity(total);
        let mut placeholder_scenes = Vec::new();
        for (index, scene) in scenes.iter().enumerate() {
            let scene_assets = synthesizer.synthesize(index, scene).await?;
            let placeholder = matches!(
                scene_assets.narration,
                NarrationSource::Placeholder { .. }
            );

            self.status.increment(status::SCENES_SYNTHESIZED);
            if placeholder {
                self.status.increment(status::NARRATION_PLACEHOLDERS);
                placeholder_scenes.push(index);
            }
            on_progress(Progress::SceneSynthesized {
                index,
                total,
                placeholder,
            });
            assets.push(scene_assets);
        }

        self.enter(Stage::Composing, on_progress);
        let mut segments = Vec::with_capacity(total);
        for scene_assets in &assets {
            let segment = compose_segment(self.media.as_ref(), &self.layout, scene_assets).await?;
            self.status.increment(status::SEGMENTS_COMPOSED);
            on_progress(Progress::SegmentComposed {
                index: segment.index,
                total,
            });
            segments.push(segment);
        }

        self.enter(Stage::Concatenating, on_progress);
        let output = concatenate(self.media.as_ref(), &self.layout, &segments).await?;

        Ok(RenderedVideo {
            run_id,
            output,
            scenes,
            segments,
            placeholder_scenes,
        })
    }
}

async fn remove_stale(path: &std::path::Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            info!("Removed previous output {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
