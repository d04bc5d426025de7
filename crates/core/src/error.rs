use std::path::PathBuf;
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No scenes found: the plan needs `Narration:` lines each followed by a `Prompt:` line")]
    SegmentationEmpty,

    #[error("Narration synthesis failed for scene {index}: {source}")]
    NarrationSynthesisFailed {
        index: usize,
        #[source]
        source: ProviderError,
    },

    #[error("Visual synthesis failed for scene {index}: {source}")]
    VisualSynthesisFailed {
        index: usize,
        #[source]
        source: ProviderError,
    },

    #[error("Segment encode failed for scene {index}: {reason}")]
    ComposeFailed { index: usize, reason: String },

    #[error("Concatenation failed: {reason}")]
    ConcatenationFailed { reason: String },

    #[error("{tool} not found. {remediation}")]
    ExternalToolUnavailable { tool: String, remediation: String },

    #[error("Script generation failed: {0}")]
    ScriptGenerationFailed(#[source] ProviderError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PipelineError {
    pub fn tool_unavailable(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        let remediation = format!(
            "Install {tool} (https://ffmpeg.org/download.html), add it to PATH, \
             or point SCENECAST_FFMPEG / --ffmpeg at the binary"
        );
        PipelineError::ExternalToolUnavailable { tool, remediation }
    }
}

/// Failures of the external media tool, before they are attributed to a pipeline stage.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{tool} could not be located")]
    Unavailable { tool: String },

    #[error("exited with {}: {stderr}", describe_exit(.exit_code))]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("no output written to {0}")]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
