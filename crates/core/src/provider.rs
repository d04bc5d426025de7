use std::{fmt, path::Path, str::FromStr};

use reqwest::{Response, StatusCode};
use tokio::{fs, io::AsyncWriteExt};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing API key for {provider_name}: {env_var} environment variable is not set")]
    MissingApiKey {
        provider_name: &'static str,
        env_var: &'static str,
    },

    #[error("{provider_name} rejected the request (HTTP {status}): {body}")]
    Rejected {
        provider_name: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider_name} quota exhausted: {body}")]
    QuotaExhausted {
        provider_name: &'static str,
        body: String,
    },

    #[error("Invalid API response from {provider_name}: {reason}")]
    InvalidResponse {
        provider_name: &'static str,
        reason: String,
    },

    #[error("{provider_name} job still processing after {attempts} polls")]
    TimedOut {
        provider_name: &'static str,
        attempts: u32,
    },

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

/// Language-model backends. All of them speak the OpenAI chat-completions dialect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LanguageModel {
    #[default]
    Openai,
    GithubModels,
    Grok,
}

impl LanguageModel {
    pub fn config(&self) -> ProviderConfig {
        match self {
            LanguageModel::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-4o",
                env_var: "OPENAI_API_KEY",
            },
            LanguageModel::GithubModels => ProviderConfig {
                api_url: "https://models.github.ai/inference/chat/completions",
                model: "openai/gpt-4.1",
                env_var: "GITHUB_TOKEN",
            },
            LanguageModel::Grok => ProviderConfig {
                api_url: "https://api.x.ai/v1/chat/completions",
                model: "grok-4-fast",
                env_var: "XAI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LanguageModel::Openai => "OpenAI",
            LanguageModel::GithubModels => "GitHub Models",
            LanguageModel::Grok => "Grok",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpeechProvider {
    #[default]
    ElevenLabs,
    Openai,
}

impl SpeechProvider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            SpeechProvider::ElevenLabs => ProviderConfig {
                api_url: "https://api.elevenlabs.io/v1/text-to-speech",
                model: "eleven_multilingual_v2",
                env_var: "ELEVENLABS_API_KEY",
            },
            SpeechProvider::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/audio/speech",
                model: "tts-1",
                env_var: "OPENAI_API_KEY",
            },
        }
    }

    pub fn default_voice(&self) -> &'static str {
        match self {
            SpeechProvider::ElevenLabs => "JBFqnCBsd6RMkjVDRZzb",
            SpeechProvider::Openai => "alloy",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpeechProvider::ElevenLabs => "ElevenLabs",
            SpeechProvider::Openai => "OpenAI TTS",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisualProvider {
    #[default]
    ModelsLabImage,
    ModelsLabVideo,
}

impl VisualProvider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            VisualProvider::ModelsLabImage => ProviderConfig {
                api_url: "https://modelslab.com/api/v6/realtime/text2img",
                model: "realtime-text2img",
                env_var: "MODELSLAB_API_KEY",
            },
            VisualProvider::ModelsLabVideo => ProviderConfig {
                api_url: "https://modelslab.com/api/v6/video/text2video_ultra",
                model: "text2video-ultra",
                env_var: "MODELSLAB_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VisualProvider::ModelsLabImage => "ModelsLab image",
            VisualProvider::ModelsLabVideo => "ModelsLab video",
        }
    }
}

/// Env vars holding credentials for any selectable provider.
pub const API_KEY_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "GITHUB_TOKEN",
    "XAI_API_KEY",
    "ELEVENLABS_API_KEY",
    "MODELSLAB_API_KEY",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown {} provider {:?} (expected one of: {})",
            self.kind,
            self.value,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for LanguageModel {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LanguageModel::Openai),
            "github-models" | "github" | "azure" => Ok(LanguageModel::GithubModels),
            "grok" | "xai" => Ok(LanguageModel::Grok),
            _ => Err(UnknownProvider {
                kind: "language model",
                value: s.to_string(),
                expected: &["openai", "github-models", "grok"],
            }),
        }
    }
}

impl FromStr for SpeechProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elevenlabs" => Ok(SpeechProvider::ElevenLabs),
            "openai" => Ok(SpeechProvider::Openai),
            _ => Err(UnknownProvider {
                kind: "speech",
                value: s.to_string(),
                expected: &["elevenlabs", "openai"],
            }),
        }
    }
}

impl FromStr for VisualProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "modelslab-image" | "image" => Ok(VisualProvider::ModelsLabImage),
            "modelslab-video" | "video" => Ok(VisualProvider::ModelsLabVideo),
            _ => Err(UnknownProvider {
                kind: "visual",
                value: s.to_string(),
                expected: &["modelslab-image", "modelslab-video"],
            }),
        }
    }
}

/// Map a non-success response to the matching provider error.
pub(crate) async fn check_status(
    provider_name: &'static str,
    response: Response,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("quota") {
        return Err(ProviderError::QuotaExhausted {
            provider_name,
            body,
        });
    }

    Err(ProviderError::Rejected {
        provider_name,
        status: status.as_u16(),
        body,
    })
}

/// Stream a response body to `path`, removing the file if the transfer breaks off.
pub(crate) async fn stream_to_file(mut response: Response, path: &Path) -> Result<u64, ProviderError> {
    let mut file = fs::File::create(path).await?;

    match copy_body(&mut response, &mut file).await {
        Ok(written) => Ok(written),
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(path).await;
            Err(e)
        }
    }
}

async fn copy_body(response: &mut Response, file: &mut fs::File) -> Result<u64, ProviderError> {
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names_parse() {
        assert_eq!("openai".parse::<LanguageModel>(), Ok(LanguageModel::Openai));
        assert_eq!(
            "GitHub-Models".parse::<LanguageModel>(),
            Ok(LanguageModel::GithubModels)
        );
        assert_eq!(
            " elevenlabs ".parse::<SpeechProvider>(),
            Ok(SpeechProvider::ElevenLabs)
        );
        assert_eq!(
            "modelslab-video".parse::<VisualProvider>(),
            Ok(VisualProvider::ModelsLabVideo)
        );
    }

    #[test]
    fn test_unknown_provider_lists_choices() {
        let err = "polly".parse::<SpeechProvider>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("polly"));
        assert!(message.contains("elevenlabs, openai"));
    }

    #[test]
    fn test_every_provider_key_is_known() {
        let vars = [
            LanguageModel::Openai.config().env_var,
            LanguageModel::GithubModels.config().env_var,
            LanguageModel::Grok.config().env_var,
            SpeechProvider::ElevenLabs.config().env_var,
            SpeechProvider::Openai.config().env_var,
            VisualProvider::ModelsLabImage.config().env_var,
            VisualProvider::ModelsLabVideo.config().env_var,
        ];
        for var in vars {
            assert!(API_KEY_VARS.contains(&var), "{var} missing from API_KEY_VARS");
        }
    }
}
