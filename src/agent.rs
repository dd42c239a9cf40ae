//! LLM client for the summarisation request.
//!
//! Talks to the Anthropic Messages API over reqwest. One call, one HTTP
//! request: no retries and no streaming. Failures are folded into the small
//! [`AgentError`] set the presentation layer knows how to word.

use crate::config::AgentConfig;
use crate::prompt::Prompt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-api-key";
const VERSION_HEADER: &str = "anthropic-version";
const BROWSER_ACCESS_HEADER: &str = "anthropic-dangerous-direct-browser-access";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Invalid API key. Please check your key in settings.")]
    InvalidCredential,
    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited,
    #[error("{0}")]
    Upstream(String),
    #[error("Empty response from API.")]
    EmptyResponse,
}

impl AgentError {
    /// Stable tag for logs and machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::InvalidCredential => "invalid-credential",
            AgentError::RateLimited => "rate-limited",
            AgentError::Upstream(_) => "upstream-error",
            AgentError::EmptyResponse => "empty-model-response",
        }
    }
}

/// API credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank input
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        (!key.is_empty()).then_some(Self(key))
    }

    /// Display form: first seven and last four characters
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() < 12 {
            return "****".to_string();
        }
        let head: String = chars[..7].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Client for the Messages endpoint.
#[derive(Debug, Clone)]
pub struct SummaryClient {
    http: Client,
    config: AgentConfig,
}

impl SummaryClient {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Send the prompt and return the model's raw text reply
    pub async fn request_summary(&self, prompt: &Prompt, key: &ApiKey) -> Result<String, AgentError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: &prompt.system,
            messages: [Message {
                role: "user",
                content: &prompt.user,
            }],
        };

        info!(
            model = %self.config.model,
            prompt_chars = prompt.user.len(),
            "requesting summary"
        );

        let response = self
            .http
            .post(&self.config.endpoint)
            .header(API_KEY_HEADER, key.expose())
            .header(VERSION_HEADER, &self.config.api_version)
            .header(BROWSER_ACCESS_HEADER, "true")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!(status = status.as_u16(), bytes = text.len(), "model endpoint responded");

        if !status.is_success() {
            let err = classify_failure(status, &text);
            warn!(status = status.as_u16(), kind = err.kind(), "summary request rejected");
            return Err(err);
        }

        extract_reply(&text)
    }

    fn transport_error(&self, err: reqwest::Error) -> AgentError {
        let err = err.without_url();
        if err.is_timeout() {
            return AgentError::Upstream(format!(
                "request timed out after {}s",
                self.config.timeout_secs
            ));
        }
        AgentError::Upstream(format!("Request failed: {err}"))
    }
}

/// Map a non-success status and its body to an error
pub fn classify_failure(status: StatusCode, body: &str) -> AgentError {
    match status {
        StatusCode::UNAUTHORIZED => AgentError::InvalidCredential,
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited,
        _ => {
            let detail = serde_json::from_str::<ErrorResponse>(body)
                .ok()
                .and_then(|parsed| parsed.error)
                .and_then(|error| error.message)
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| format!("API error ({})", status.as_u16()));
            AgentError::Upstream(detail)
        }
    }
}

/// Pull the first content block's text out of a success body
pub fn extract_reply(body: &str) -> Result<String, AgentError> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::Upstream(format!("Malformed API response: {e}")))?;
    parsed
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .filter(|text| !text.is_empty())
        .ok_or(AgentError::EmptyResponse)
}
