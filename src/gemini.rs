//! Gemini summarization sink.
//!
//! [`GeminiSink`] renders a prompt from the report and posts it to the
//! Gemini `generateContent` endpoint with a blocking HTTP client. Wrap it in
//! a [`RetryingSink`](crate::RetryingSink) for backoff, or use
//! [`GeminiSink::with_retries`]. Client errors other than 429 come back as
//! [`VidsumError::SinkRejected`] and are not retried.
//!
//! This module is available when the `gemini` feature is enabled (default).
//!
//! # Example
//!
//! ```no_run
//! use vidsum::{GeminiConfig, GeminiSink, VidsumError, build_report};
//! use vidsum::sink::summarize_or_placeholder;
//!
//! let sink = GeminiSink::new(GeminiConfig::from_env()?)?.with_retries();
//! let report = build_report("talk.mp4", Vec::new(), Vec::new());
//! println!("{}", summarize_or_placeholder(&sink, &report));
//! # Ok::<(), VidsumError>(())
//! ```

use std::time::Duration;

use reqwest::{StatusCode, blocking::Client};
use serde::{Deserialize, Serialize};

use crate::{
    error::VidsumError,
    report::{PromptStyle, VideoReport},
    sink::{RetryPolicy, RetryingSink, SummarySink},
};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Settings for [`GeminiSink`].
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key sent as the `key` query parameter.
    pub api_key: String,
    /// Model name, e.g. `gemini-1.5-flash`.
    pub model: String,
    /// API root, without trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Which prompt to send.
    pub prompt_style: PromptStyle,
    /// Backoff used by [`GeminiSink::with_retries`].
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("prompt_style", &self.prompt_style)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GeminiConfig {
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-flash";

    /// Default API root.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Configuration with defaults and the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            prompt_style: PromptStyle::Summary,
            retry: RetryPolicy::default(),
        }
    }

    /// Read the key from `GEMINI_API_KEY`.
    ///
    /// # Errors
    ///
    /// [`VidsumError::SinkFailure`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self, VidsumError> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(VidsumError::SinkFailure(format!(
                "{API_KEY_ENV} is not configured"
            ))),
        }
    }

    /// Use `model` instead of the default.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send requests to `base_url` instead of the public endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Select the prompt.
    #[must_use]
    pub fn with_prompt_style(mut self, style: PromptStyle) -> Self {
        self.prompt_style = style;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry schedule.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Sends reports to Gemini.
#[derive(Debug, Clone)]
pub struct GeminiSink {
    config: GeminiConfig,
    client: Client,
}

impl GeminiSink {
    /// Build the HTTP client.
    ///
    /// # Errors
    ///
    /// [`VidsumError::SinkFailure`] if the TLS backend cannot be initialised.
    pub fn new(config: GeminiConfig) -> Result<Self, VidsumError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| VidsumError::SinkFailure(format!("HTTP client: {error}")))?;
        Ok(Self { config, client })
    }

    /// Wrap in a [`RetryingSink`] using the configured policy.
    pub fn with_retries(self) -> RetryingSink<Self> {
        let policy = self.config.retry.clone();
        RetryingSink::new(self, policy)
    }

    /// The sink's configuration.
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

impl SummarySink for GeminiSink {
    fn summarize(&self, report: &VideoReport) -> Result<String, VidsumError> {
        let prompt = self.config.prompt_style.render(report)?;
        log::info!(
            "Requesting {:?} from {} ({} scenes, {} prompt chars)",
            self.config.prompt_style,
            self.config.model,
            report.scenes_detected,
            prompt.len(),
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .json(&request)
            .send()
            .map_err(|error| {
                VidsumError::SinkFailure(format!("request failed: {}", error.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = format!("Gemini API returned {status}: {}", body.trim());
            // Bad key, unknown model or malformed request.
            if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                return Err(VidsumError::SinkRejected(message));
            }
            return Err(VidsumError::SinkFailure(message));
        }

        let parsed: GenerateResponse = response.json().map_err(|error| {
            VidsumError::SinkFailure(format!("invalid response: {}", error.without_url()))
        })?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.text)
            .ok_or_else(|| VidsumError::SinkFailure("No text in response".to_string()))
    }
}
