//! Image generation capability
//!
//! Provides:
//! - The `ImageGenerator` trait (prompt + seed -> image bytes)
//! - A Cloudflare Workers AI client implementing it

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Image generation errors
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status}")]
    Api { status: u16 },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("failed to decode image: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("model returned an empty image")]
    EmptyImage,

    #[error("{0}")]
    Other(String),
}

/// What a model run returns: either the image itself or an object wrapping it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorOutput {
    Raw(Bytes),
    Wrapped { image: Bytes },
}

impl GeneratorOutput {
    /// Unwrap to the image bytes
    pub fn into_bytes(self) -> Bytes {
        match self {
            GeneratorOutput::Raw(bytes) => bytes,
            GeneratorOutput::Wrapped { image } => image,
        }
    }
}

/// External image generation capability
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        seed: u32,
    ) -> Result<GeneratorOutput, GenerateError>;
}

/// Workers AI connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkersAiConfig {
    pub base_url: String,
    pub account_id: Option<String>,
    pub api_token: Option<String>,
    /// Request timeout; unset means no client-side limit
    pub timeout_secs: Option<u64>,
}

impl Default for WorkersAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cloudflare.com/client/v4".to_string(),
            account_id: None,
            api_token: None,
            timeout_secs: None,
        }
    }
}

impl WorkersAiConfig {
    /// Check if credentials are configured
    pub fn is_configured(&self) -> bool {
        self.account_id().is_some() && self.api_token().is_some()
    }

    fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref().filter(|s| !s.is_empty())
    }

    fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref().filter(|s| !s.is_empty())
    }
}

/// Model run request
#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    prompt: &'a str,
    seed: u32,
}

/// JSON model run response (`{"result": {"image": ...}}` or `{"image": ...}`)
#[derive(Debug, Deserialize)]
struct RunResponse {
    result: Option<RunResult>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunResult {
    image: Option<String>,
}

/// Workers AI client
#[derive(Debug)]
pub struct WorkersAiClient {
    client: Client,
    base_url: String,
    account_id: String,
    api_token: String,
}

impl WorkersAiClient {
    /// Create a client, or `None` if credentials are missing
    pub fn from_config(config: &WorkersAiConfig) -> Result<Option<Self>, GenerateError> {
        let (Some(account_id), Some(api_token)) = (config.account_id(), config.api_token()) else {
            return Ok(None);
        };

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Some(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_id: account_id.to_string(),
            api_token: api_token.to_string(),
        }))
    }

    fn run_url(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url, self.account_id, model
        )
    }
}

#[async_trait]
impl ImageGenerator for WorkersAiClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        seed: u32,
    ) -> Result<GeneratorOutput, GenerateError> {
        debug!("Sending image generation request to Workers AI: {}", model);

        let response = self
            .client
            .post(self.run_url(model))
            .bearer_auth(&self.api_token)
            .json(&RunRequest { prompt, seed })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Workers AI error: {} - {}", status, body);
            return Err(GenerateError::Api {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?;

        decode_response(&content_type, body)
    }
}

/// Interpret a model run response body
fn decode_response(content_type: &str, body: Bytes) -> Result<GeneratorOutput, GenerateError> {
    if content_type.starts_with("image/") {
        return Ok(GeneratorOutput::Raw(body));
    }

    let parsed: RunResponse =
        serde_json::from_slice(&body).map_err(|e| GenerateError::Parse(e.to_string()))?;
    let encoded = parsed
        .result
        .and_then(|r| r.image)
        .or(parsed.image)
        .ok_or_else(|| GenerateError::Parse("no image in response".to_string()))?;

    Ok(GeneratorOutput::Wrapped {
        image: Bytes::from(BASE64.decode(encoded.as_bytes())?),
    })
}
