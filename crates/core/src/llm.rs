use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::provider::{LanguageModel, ProviderError, check_status};

/// One system/user exchange with sampling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Client for OpenAI-compatible chat-completions endpoints.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    provider: LanguageModel,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(
        provider: LanguageModel,
        http: Client,
        api_url: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            provider,
            api_url,
            model: provider.config().model.to_string(),
            api_key,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn provider(&self) -> LanguageModel {
        self.provider
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey {
                provider_name: self.provider.name(),
                env_var: self.provider.config().env_var,
            })?;

        debug!(
            "Requesting completion from {} ({})",
            self.provider.name(),
            self.model
        );

        let response = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": request.system,
                    },
                    {
                        "role": "user",
                        "content": request.user,
                    },
                ],
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
            }))
            .send()
            .await?;
        let response = check_status(self.provider.name(), response).await?;
        let response: serde_json::Value = response.json().await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider_name: self.provider.name(),
                reason: format!("no completion in response: {}", response),
            })?;

        Ok(content.to_string())
    }
}
