pub mod composer;
pub mod concat;
pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod llm;
pub mod media;
pub mod pipeline;
pub mod provider;
pub mod script;
pub mod segmenter;
pub mod speech;
pub mod status;
pub mod synthesizer;
pub mod types;
pub mod visual;
pub mod workspace;

pub use config::PipelineConfig;
pub use error::{ConfigError, PipelineError, Result, ToolError};
pub use format::{format_age, format_render_summary, format_run_record, format_scenes};
pub use history::{RunOutcome, RunRecord, append_run_record, load_run_records};
pub use media::{EncodeProfile, Ffmpeg, MediaTool};
pub use pipeline::{Progress, ScenePipeline};
pub use provider::{LanguageModel, ProviderError, SpeechProvider, VisualProvider};
pub use script::ScriptWriter;
pub use segmenter::parse_scenes;
pub use speech::SpeechSynthesizer;
pub use status::{MemoryStatusStore, StatusStore, StatusValue};
pub use types::{NarrationSource, RenderedVideo, Scene, SceneAssets, SegmentFile, Stage, VisualKind};
pub use visual::VisualGenerator;
pub use workspace::RunLayout;
