
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::{Embedder, EmbeddingError};
use crate::config::settings::MAX_RETRY_ATTEMPTS;
use crate::config::{ConfigError, EmbeddingConfig};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;
const BACKOFF_UNIT_MS: u64 = 500;

/// Blocking client for an OpenAI-compatible `/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    endpoint: Url,
    model: String,
    api_key: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiClient {
    /// Build a client reading the API key from the configured environment variable
    #[inline]
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let api_key = config.api_key()?;
        Self::new(config, api_key)
    }

    #[inline]
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        config.validate()?;
        let endpoint = config
            .base_url()?
            .join("embeddings")
            .map_err(|_| ConfigError::InvalidUrl(config.base_url.clone()))?;

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key: api_key.into(),
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
            retry_attempts: config.retry_attempts,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    /// Total attempts per request, clamped to `1..=MAX_RETRY_ATTEMPTS`
    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.clamp(1, MAX_RETRY_ATTEMPTS);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Generate the embedding for a single text
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: &self.model,
            input: [text],
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            EmbeddingError::Permanent(format!("failed to serialize embedding request: {}", e))
        })?;
        let authorization = format!("Bearer {}", self.api_key);

        let response_text = self.make_request_with_retry(|| {
            self.agent
                .post(self.endpoint.as_str())
                .header("Authorization", &authorization)
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let embedding = parse_embedding_response(&response_text)?;
        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String, EmbeddingError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(err) => {
                    let classified = classify_error(&err);
                    if !classified.is_transient() {
                        warn!("Non-retryable embedding error: {}", classified);
                        return Err(classified);
                    }

                    warn!(
                        "Transient embedding error: {}, attempt {}/{}",
                        classified, attempt, self.retry_attempts
                    );
                    last_error = Some(classified);

                    if attempt < self.retry_attempts {
                        let delay = backoff_delay(attempt);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("Embedding request to {} failed", self.endpoint);
        Err(last_error
            .unwrap_or_else(|| EmbeddingError::Transient("request was never attempted".to_string())))
    }
}

impl Embedder for OpenAiClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.generate_embedding(text)
    }
}

/// Wait before the attempt following `attempt`: 500ms, 1s, 2s, ...
fn backoff_delay(attempt: u32) -> Duration {
    let factor = EXPONENTIAL_BACKOFF_BASE
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(factor.saturating_mul(BACKOFF_UNIT_MS))
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    let timeout = if timeout.is_zero() {
        Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
    } else {
        timeout
    };
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Sort a transport or HTTP failure into transient and permanent
fn classify_error(error: &ureq::Error) -> EmbeddingError {
    match error {
        ureq::Error::StatusCode(status) if *status == 429 || *status >= 500 => {
            EmbeddingError::Transient(format!("HTTP {}", status))
        }
        ureq::Error::StatusCode(status) => EmbeddingError::Permanent(format!("HTTP {}", status)),
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => EmbeddingError::Transient(error.to_string()),
        _ => EmbeddingError::Permanent(error.to_string()),
    }
}

fn parse_embedding_response(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let response: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|data| data.embedding)
        .ok_or_else(|| EmbeddingError::MalformedResponse("response has no data".to_string()))?;

    if embedding.is_empty() {
        return Err(EmbeddingError::MalformedResponse(
            "embedding is empty".to_string(),
        ));
    }

    Ok(embedding)
}
