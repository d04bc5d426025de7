use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response, header::CONTENT_TYPE};
use serde_json::{Value, json};
use tokio::fs;
use tracing::info;

use crate::{
    provider::{ProviderError, VisualProvider, check_status, stream_to_file},
    types::VisualKind,
};

#[async_trait]
pub trait VisualGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this generator produces stills or clips.
    fn kind(&self) -> VisualKind;

    /// Generate a visual for `prompt` and write it to `output`.
    async fn generate(&self, prompt: &str, output: &Path) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// Where a finished generation job put its result.
#[derive(Debug, PartialEq)]
enum VisualPayload {
    Url(String),
    Inline(Vec<u8>),
}

/// ModelsLab text-to-image and text-to-video client.
#[derive(Debug, Clone)]
pub struct ModelsLabClient {
    http: Client,
    provider: VisualProvider,
    api_url: String,
    api_key: Option<String>,
    width: u32,
    height: u32,
    poll: PollSettings,
}

impl ModelsLabClient {
    pub fn new(
        provider: VisualProvider,
        http: Client,
        api_url: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            provider,
            api_url,
            api_key,
            width: 512,
            height: 512,
            poll: PollSettings::default(),
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey {
                provider_name: self.provider.name(),
                env_var: self.provider.config().env_var,
            })
    }

    fn request_body(&self, api_key: &str, prompt: &str) -> Value {
        match self.provider {
            VisualProvider::ModelsLabImage => json!({
                "key": api_key,
                "prompt": prompt,
                "negative_prompt": "bad quality",
                "width": self.width.to_string(),
                "height": self.height.to_string(),
                "samples": 1,
                "safety_checker": false,
                "seed": null,
                "base64": false,
                "webhook": null,
                "track_id": null,
            }),
            VisualProvider::ModelsLabVideo => json!({
                "key": api_key,
                "prompt": prompt,
                "aspect_ratio": aspect_ratio(self.width, self.height),
                "duration": 4,
                "motion": "medium",
                "quality": "medium",
                "webhook": null,
                "seed": null,
            }),
        }
    }

    async fn submit(&self, prompt: &str) -> Result<VisualPayload, ProviderError> {
        let api_key = self.api_key()?;

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&self.request_body(api_key, prompt))
            .send()
            .await?;
        let response = check_status(self.name(), response).await?;

        if is_media(&response) {
            return Ok(VisualPayload::Inline(response.bytes().await?.to_vec()));
        }

        let mut data: Value = response.json().await?;
        let mut polls = 0;

        loop {
            let status = data["status"].as_str().unwrap_or_default().to_string();
            match status.as_str() {
                "error" | "failed" => {
                    return Err(ProviderError::InvalidResponse {
                        provider_name: self.name(),
                        reason: describe_failure(&data),
                    });
                }
                "processing" => {
                    if polls >= self.poll.max_attempts {
                        return Err(ProviderError::TimedOut {
                            provider_name: self.name(),
                            attempts: polls,
                        });
                    }
                    let fetch_url = data["fetch_result"]
                        .as_str()
                        .ok_or_else(|| ProviderError::InvalidResponse {
                            provider_name: self.name(),
                            reason: "job is processing but no fetch_result URL was given"
                                .to_string(),
                        })?
                        .to_string();

                    polls += 1;
                    info!(
                        "{} job processing (poll {}/{})",
                        self.name(),
                        polls,
                        self.poll.max_attempts
                    );
                    tokio::time::sleep(self.poll.interval).await;
                    data = self.fetch(&fetch_url, api_key).await?;
                }
                _ => {
                    return result_url(&data).map(VisualPayload::Url).ok_or_else(|| {
                        ProviderError::InvalidResponse {
                            provider_name: self.name(),
                            reason: format!("no output in response: {}", data),
                        }
                    });
                }
            }
        }
    }

    async fn fetch(&self, fetch_url: &str, api_key: &str) -> Result<Value, ProviderError> {
        let response = self
            .http
            .post(fetch_url)
            .json(&json!({ "key": api_key }))
            .send()
            .await?;
        let response = check_status(self.name(), response).await?;
        Ok(response.json().await?)
    }

    async fn download(&self, url: &str, output: &Path) -> Result<u64, ProviderError> {
        info!("Downloading visual from: {}", url);
        let response = self.http.get(url).send().await?;
        let response = check_status(self.name(), response).await?;
        stream_to_file(response, output).await
    }
}

#[async_trait]
impl VisualGenerator for ModelsLabClient {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn kind(&self) -> VisualKind {
        match self.provider {
            VisualProvider::ModelsLabImage => VisualKind::Image,
            VisualProvider::ModelsLabVideo => VisualKind::Video,
        }
    }

    async fn generate(&self, prompt: &str, output: &Path) -> Result<(), ProviderError> {
        info!("Generating visual for prompt: {}", prompt);

        let written = match self.submit(prompt).await? {
            VisualPayload::Url(url) => self.download(&url, output).await?,
            VisualPayload::Inline(bytes) => {
                fs::write(output, &bytes).await?;
                bytes.len() as u64
            }
        };

        if written == 0 {
            let _ = fs::remove_file(output).await;
            return Err(ProviderError::InvalidResponse {
                provider_name: self.name(),
                reason: "generated visual is empty".to_string(),
            });
        }

        info!("Visual saved to: {}", output.display());
        Ok(())
    }
}

fn is_media(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("image/") || v.starts_with("video/"))
        .unwrap_or(false)
}

fn result_url(data: &Value) -> Option<String> {
    data["video"]
        .as_str()
        .or_else(|| data["output"][0].as_str())
        .map(str::to_string)
}

fn describe_failure(data: &Value) -> String {
    data["message"]
        .as_str()
        .or_else(|| data["messege"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| data.to_string())
}

fn aspect_ratio(width: u32, height: u32) -> &'static str {
    if width > height {
        "16:9"
    } else if width < height {
        "9:16"
    } else {
        "1:1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, provider: VisualProvider) -> ModelsLabClient {
        let endpoint = match provider {
            VisualProvider::ModelsLabImage => "/api/v6/realtime/text2img",
            VisualProvider::ModelsLabVideo => "/api/v6/video/text2video_ultra",
        };
        ModelsLabClient::new(
            provider,
            Client::new(),
            format!("{}{}", server.uri(), endpoint),
            Some("ml-key".to_string()),
        )
        .with_poll(PollSettings {
            interval: Duration::from_millis(5),
            max_attempts: 3,
        })
    }

    #[tokio::test]
    async fn test_image_url_is_downloaded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v6/realtime/text2img"))
            .and(body_partial_json(json!({
                "key": "ml-key",
                "prompt": "sunrise",
                "width": "512",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "output": [format!("{}/files/sunrise.png", server.uri())],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/sunrise.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNG-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("scene_00.png");
        let images = client(&server, VisualProvider::ModelsLabImage);
        images.generate("sunrise", &out).await.unwrap();

        assert_eq!(images.kind(), VisualKind::Image);
        assert_eq!(std::fs::read(&out).unwrap(), b"PNG-bytes");
    }

    #[tokio::test]
    async fn test_processing_job_is_polled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v6/video/text2video_ultra"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "processing",
                "id": 42,
                "fetch_result": format!("{}/api/v6/video/fetch/42", server.uri()),
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v6/video/fetch/42"))
            .and(body_partial_json(json!({ "key": "ml-key" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "output": [format!("{}/files/clip.mp4", server.uri())],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"MP4".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("scene_00.mp4");
        let clips = client(&server, VisualProvider::ModelsLabVideo);
        clips.generate("coffee cup", &out).await.unwrap();

        assert_eq!(clips.kind(), VisualKind::Video);
        assert_eq!(std::fs::read(&out).unwrap(), b"MP4");
    }

    #[tokio::test]
    async fn test_polling_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "processing",
                "fetch_result": format!("{}/fetch/1", server.uri()),
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = client(&server, VisualProvider::ModelsLabImage)
            .generate("sunrise", &dir.path().join("scene_00.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::TimedOut { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "message": "Invalid prompt",
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("scene_00.png");
        let err = client(&server, VisualProvider::ModelsLabImage)
            .generate("sunrise", &out)
            .await
            .unwrap_err();

        match err {
            ProviderError::InvalidResponse { reason, .. } => assert_eq!(reason, "Invalid prompt"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_inline_image_body_is_written() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"inline-png".to_vec(), "image/png"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("scene_03.png");
        client(&server, VisualProvider::ModelsLabImage)
            .generate("lake", &out)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"inline-png");
    }

    #[test]
    fn test_result_url_prefers_video_field() {
        let data = json!({ "video": "https://v", "output": ["https://o"] });
        assert_eq!(result_url(&data), Some("https://v".to_string()));
        let data = json!({ "output": ["https://o"] });
        assert_eq!(result_url(&data), Some("https://o".to_string()));
        assert_eq!(result_url(&json!({ "output": [] })), None);
    }

    #[test]
    fn test_aspect_ratio_follows_dimensions() {
        assert_eq!(aspect_ratio(1920, 1080), "16:9");
        assert_eq!(aspect_ratio(1080, 1920), "9:16");
        assert_eq!(aspect_ratio(512, 512), "1:1");
    }
}
