use std::path::{Path, PathBuf};

use crate::types::VisualKind;

pub const MANIFEST_FILE: &str = "segments.txt";
pub const FINAL_VIDEO_FILE: &str = "final_video.mp4";
pub const HISTORY_FILE: &str = "runs.jsonl";

/// File naming inside a run's working directory.
///
/// Names depend only on the scene index, so two runs sharing a directory
/// overwrite each other's files.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the path for a scene's generated image or clip
    pub fn visual_path(&self, index: usize, kind: VisualKind) -> PathBuf {
        self.root
            .join(format!("scene_{:02}.{}", index, kind.extension()))
    }

    /// Get the path for a scene's narration
    pub fn audio_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("audio_{:02}.mp3", index))
    }

    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("segment_{:02}.mp4", index))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn final_path(&self) -> PathBuf {
        self.root.join(FINAL_VIDEO_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }
}
