use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One shot of the output video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub narration: String,
    pub visual_prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    Image,
    Video,
}

impl VisualKind {
    pub fn extension(&self) -> &'static str {
        match self {
            VisualKind::Image => "png",
            VisualKind::Video => "mp4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum NarrationSource {
    Synthesized,
    Placeholder { seconds: u32, reason: String },
}

/// Generated files for one scene, ready for the composer.
#[derive(Debug, Clone)]
pub struct SceneAssets {
    pub index: usize,
    pub visual: PathBuf,
    pub visual_kind: VisualKind,
    pub audio: PathBuf,
    pub narration: NarrationSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFile {
    pub index: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Segmenting,
    Synthesizing,
    Composing,
    Concatenating,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Segmenting => "segmenting",
            Stage::Synthesizing => "synthesizing",
            Stage::Composing => "composing",
            Stage::Concatenating => "concatenating",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

/// Result of one successful pipeline run.
#[derive(Debug, Clone)]
pub struct RenderedVideo {
    pub run_id: Uuid,
    pub output: PathBuf,
    pub scenes: Vec<Scene>,
    pub segments: Vec<SegmentFile>,
    pub placeholder_scenes: Vec<usize>,
}
