//! Startup configuration, resolved once from the environment.

use std::{collections::BTreeMap, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use reqwest::Client;

use crate::{
    error::ConfigError,
    llm::ChatClient,
    media::{EncodeProfile, Ffmpeg},
    pipeline::ScenePipeline,
    provider::{API_KEY_VARS, LanguageModel, SpeechProvider, VisualProvider},
    script::ScriptWriter,
    speech::speech_client,
    status::StatusStore,
    visual::{ModelsLabClient, PollSettings},
    workspace::RunLayout,
};

pub const WORK_DIR_VAR: &str = "SCENECAST_WORK_DIR";
pub const FFMPEG_VAR: &str = "SCENECAST_FFMPEG";
pub const LLM_PROVIDER_VAR: &str = "SCENECAST_LLM_PROVIDER";
pub const SPEECH_PROVIDER_VAR: &str = "SCENECAST_SPEECH_PROVIDER";
pub const VISUAL_PROVIDER_VAR: &str = "SCENECAST_VISUAL_PROVIDER";
pub const VIDEO_SIZE_VAR: &str = "SCENECAST_VIDEO_SIZE";
pub const FPS_VAR: &str = "SCENECAST_FPS";
pub const VOICE_VAR: &str = "SCENECAST_VOICE";
pub const POLL_INTERVAL_VAR: &str = "SCENECAST_POLL_INTERVAL_SECS";
pub const POLL_ATTEMPTS_VAR: &str = "SCENECAST_POLL_ATTEMPTS";
pub const LLM_URL_VAR: &str = "SCENECAST_LLM_URL";
pub const SPEECH_URL_VAR: &str = "SCENECAST_SPEECH_URL";
pub const VISUAL_URL_VAR: &str = "SCENECAST_VISUAL_URL";

/// Longest side of a generated still or clip, in pixels.
const GENERATION_LONG_SIDE: u32 = 512;

/// Largest accepted output side, in pixels.
const MAX_VIDEO_SIDE: u32 = 8192;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub work_dir: PathBuf,
    pub ffmpeg: PathBuf,
    pub llm: LanguageModel,
    pub speech: SpeechProvider,
    pub visual: VisualProvider,
    pub profile: EncodeProfile,
    pub voice: Option<String>,
    pub poll: PollSettings,
    pub llm_url: Option<String>,
    pub speech_url: Option<String>,
    pub visual_url: Option<String>,
    api_keys: BTreeMap<&'static str, String>,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from any key lookup. Blank values count as unset.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut profile = EncodeProfile::default();
        if let Some(size) = get(VIDEO_SIZE_VAR) {
            let (width, height) = parse_size(&size)?;
            profile.width = width;
            profile.height = height;
        }
        if let Some(fps) = get(FPS_VAR) {
            profile.fps = parse_positive(FPS_VAR, &fps)?;
        }

        let mut poll = PollSettings::default();
        if let Some(secs) = get(POLL_INTERVAL_VAR) {
            poll.interval = Duration::from_secs(parse_positive(POLL_INTERVAL_VAR, &secs)? as u64);
        }
        if let Some(attempts) = get(POLL_ATTEMPTS_VAR) {
            poll.max_attempts = parse_positive(POLL_ATTEMPTS_VAR, &attempts)?;
        }

        let api_keys = API_KEY_VARS
            .iter()
            .filter_map(|&var| get(var).map(|value| (var, value)))
            .collect();

        Ok(Self {
            work_dir: get(WORK_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            ffmpeg: get(FFMPEG_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            llm: parse_provider(LLM_PROVIDER_VAR, get(LLM_PROVIDER_VAR))?,
            speech: parse_provider(SPEECH_PROVIDER_VAR, get(SPEECH_PROVIDER_VAR))?,
            visual: parse_provider(VISUAL_PROVIDER_VAR, get(VISUAL_PROVIDER_VAR))?,
            profile,
            voice: get(VOICE_VAR),
            poll,
            llm_url: get(LLM_URL_VAR),
            speech_url: get(SPEECH_URL_VAR),
            visual_url: get(VISUAL_URL_VAR),
            api_keys,
        })
    }

    pub fn api_key(&self, env_var: &str) -> Option<&str> {
        self.api_keys.get(env_var).map(String::as_str)
    }

    pub fn layout(&self) -> RunLayout {
        RunLayout::new(&self.work_dir)
    }

    pub fn build_pipeline(&self, status: Arc<dyn StatusStore>) -> ScenePipeline {
        let http = Client::new();

        let speech_config = self.speech.config();
        let speech = speech_client(
            self.speech,
            http.clone(),
            self.speech_url
                .clone()
                .unwrap_or_else(|| speech_config.api_url.to_string()),
            self.api_key(speech_config.env_var).map(str::to_string),
            self.voice.clone(),
        );

        let visual_config = self.visual.config();
        let (width, height) = generation_size(self.profile.width, self.profile.height);
        let visuals = ModelsLabClient::new(
            self.visual,
            http,
            self.visual_url
                .clone()
                .unwrap_or_else(|| visual_config.api_url.to_string()),
            self.api_key(visual_config.env_var).map(str::to_string),
        )
        .with_dimensions(width, height)
        .with_poll(self.poll);

        let media = Ffmpeg::new(&self.ffmpeg).with_profile(self.profile.clone());

        ScenePipeline::new(
            speech,
            Box::new(visuals),
            Box::new(media),
            status,
            self.layout(),
        )
    }

    pub fn script_writer(&self) -> ScriptWriter {
        let config = self.llm.config();
        ScriptWriter::new(ChatClient::new(
            self.llm,
            Client::new(),
            self.llm_url
                .clone()
                .unwrap_or_else(|| config.api_url.to_string()),
            self.api_key(config.env_var).map(str::to_string),
        ))
    }
}

fn parse_provider<P>(key: &'static str, value: Option<String>) -> Result<P, ConfigError>
where
    P: FromStr + Default,
    P::Err: std::fmt::Display,
{
    match value {
        None => Ok(P::default()),
        Some(value) => value.parse().map_err(|e: P::Err| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected a positive whole number".to_string(),
        }),
    }
}

/// Parse `WIDTHxHEIGHT`. Both sides must be even for yuv420p output.
fn parse_size(value: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: VIDEO_SIZE_VAR,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| invalid("expected WIDTHxHEIGHT, e.g. 1080x1920"))?;
    let width = parse_positive(VIDEO_SIZE_VAR, width.trim()).map_err(|_| invalid("bad width"))?;
    let height = parse_positive(VIDEO_SIZE_VAR, height.trim()).map_err(|_| invalid("bad height"))?;

    if width % 2 != 0 || height % 2 != 0 {
        return Err(invalid("width and height must be even"));
    }
    if width > MAX_VIDEO_SIDE || height > MAX_VIDEO_SIDE {
        return Err(invalid("width and height must be at most 8192"));
    }
    Ok((width, height))
}

/// Scale the output frame down so its longer side is 512, keeping multiples of 8.
fn generation_size(width: u32, height: u32) -> (u32, u32) {
    let long = u64::from(width.max(height).max(1));
    // side <= long, so the scaled value never exceeds GENERATION_LONG_SIDE
    let scale = |side: u32| {
        let scaled = u64::from(side) * u64::from(GENERATION_LONG_SIDE) / long;
        ((scaled as u32) / 8 * 8).max(8)
    };
    (scale(width), scale(height))
}
