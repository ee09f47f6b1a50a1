//! Configuration constants and LLM client configuration.

use crate::error::{AuditError, Result};

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "qwen-plus-2025-07-28";

/// HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum number of characters kept in `AuditResult::text_excerpt`.
pub const EXCERPT_MAX_CHARS: usize = 80;

/// File extensions accepted by the text loader (lowercase, without dot).
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// File extensions accepted by the media loader, with their MIME types.
pub const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

/// Encoding used when the caller does not name one.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Configuration for an OpenAI-compatible chat client.
///
/// NOTE: Do NOT derive `Debug` here, `api_key` would be exposed.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    pub json_mode: bool,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Only `LLM_API_KEY` is required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| AuditError::Config("LLM_API_KEY not set".into()))?;

        let base_url = std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        let temperature = std::env::var("LLM_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);

        let max_tokens = std::env::var("LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok());

        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let json_mode = std::env::var("LLM_JSON_MODE")
            .ok()
            .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        Ok(Self {
            api_key,
            base_url,
            model,
            temperature,
            max_tokens,
            timeout_secs,
            json_mode,
        })
    }

    /// Create a config builder, mainly for tests and embedding code.
    pub fn builder(api_key: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            json_mode: true,
        }
    }
}

/// Builder for constructing a `ClientConfig`.
pub struct ClientConfigBuilder {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: Option<u32>,
    timeout_secs: u64,
    json_mode: bool,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn build(self) -> ClientConfig {
        ClientConfig {
            api_key: self.api_key,
            base_url: self.base_url,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
            json_mode: self.json_mode,
        }
    }
}
