//! Text generation service

use crate::ControlsError;
use crate::store::read_api_key;
use async_trait::async_trait;
use retrodeck_config::ControlsConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Longest wait between retries is 500ms * 2^6
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Delay before retry number `attempt` (1-based)
fn backoff(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    Duration::from_millis(500 * 2u64.pow(exponent))
}

/// Free-form prompt in, free-form text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ControlsError>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API client
pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_base: String,
    model: String,
    max_tokens: u32,
    max_retries: u32,
    credentials_path: PathBuf,
}

impl AnthropicGenerator {
    pub fn new(
        config: &ControlsConfig,
        credentials_path: impl Into<PathBuf>,
    ) -> Result<Self, ControlsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(format!("RetroDeck/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            credentials_path: credentials_path.into(),
        })
    }

    async fn send_once(&self, api_key: &str, prompt: &str) -> Result<String, ControlsError> {
        let url = format!("{}/v1/messages", self.api_base);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlsError::Status(status.as_u16()));
        }

        let body: MessagesResponse = response.json().await?;
        body.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| ControlsError::Generation("response had no text block".into()))
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ControlsError> {
        // Checked first, and on every call, so no request goes out without a key
        let api_key = read_api_key(&self.credentials_path).ok_or(ControlsError::MissingCredentials)?;

        let mut attempt = 0;
        loop {
            match self.send_once(&api_key, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.max_retries && e.is_transient() => {
                    attempt += 1;
                    tracing::warn!(
                        "Generation request failed ({}), retry attempt {} of {}",
                        e,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
