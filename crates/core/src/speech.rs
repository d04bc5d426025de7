use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::fs;
use tracing::info;

use crate::provider::{ProviderError, SpeechProvider, check_status, stream_to_file};

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Speak `text` and write the audio bytes to `output`.
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), ProviderError>;
}

/// Build the client for the selected provider.
pub fn speech_client(
    provider: SpeechProvider,
    http: Client,
    api_url: String,
    api_key: Option<String>,
    voice: Option<String>,
) -> Box<dyn SpeechSynthesizer> {
    let config = provider.config();
    let voice = voice.unwrap_or_else(|| provider.default_voice().to_string());
    match provider {
        SpeechProvider::ElevenLabs => Box::new(ElevenLabsClient {
            http,
            api_url,
            api_key,
            voice_id: voice,
            model_id: config.model.to_string(),
        }),
        SpeechProvider::Openai => Box::new(OpenAiSpeechClient {
            http,
            api_url,
            api_key,
            voice,
            model: config.model.to_string(),
        }),
    }
}

fn require_key<'a>(
    api_key: &'a Option<String>,
    provider: SpeechProvider,
) -> Result<&'a str, ProviderError> {
    api_key.as_deref().ok_or(ProviderError::MissingApiKey {
        provider_name: provider.name(),
        env_var: provider.config().env_var,
    })
}

/// Stream the audio body to `output`. A 2xx with no bytes is not a narration.
async fn save_audio(
    provider_name: &'static str,
    response: reqwest::Response,
    output: &Path,
) -> Result<(), ProviderError> {
    let written = stream_to_file(response, output).await?;
    if written == 0 {
        let _ = fs::remove_file(output).await;
        return Err(ProviderError::InvalidResponse {
            provider_name,
            reason: "speech response was empty".to_string(),
        });
    }

    info!("Speech saved to: {} ({} bytes)", output.display(), written);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    http: Client,
    api_url: String,
    api_key: Option<String>,
    voice_id: String,
    model_id: String,
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    fn name(&self) -> &'static str {
        SpeechProvider::ElevenLabs.name()
    }

    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), ProviderError> {
        let api_key = require_key(&self.api_key, SpeechProvider::ElevenLabs)?;
        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), self.voice_id);

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", api_key)
            .header("Accept", "audio/mpeg")
            .json(&json!({
                "text": text,
                "model_id": self.model_id,
            }))
            .send()
            .await?;
        let response = check_status(self.name(), response).await?;
        save_audio(self.name(), response, output).await
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiSpeechClient {
    http: Client,
    api_url: String,
    api_key: Option<String>,
    voice: String,
    model: String,
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechClient {
    fn name(&self) -> &'static str {
        SpeechProvider::Openai.name()
    }

    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), ProviderError> {
        let api_key = require_key(&self.api_key, SpeechProvider::Openai)?;

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&json!({
                "model": self.model,
                "input": text,
                "voice": self.voice,
                "response_format": "mp3",
            }))
            .send()
            .await?;
        let response = check_status(self.name(), response).await?;
        save_audio(self.name(), response, output).await
    }
}
