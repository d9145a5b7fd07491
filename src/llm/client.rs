use crate::error::{IncomeFlowError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_MODEL: &str = "granite3.2-vision";

const JSON_SYSTEM_PROMPT: &str = "You are a helpful assistant that provides accurate, structured information. When asked to extract or format data as JSON, you will ONLY output valid JSON without any additional text, explanations, or formatting.";

#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl OllamaConfig {
    /// Reads `OLLAMA_URL`, `OLLAMA_TIMEOUT` (seconds) and `OLLAMA_MAX_RETRIES`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`OllamaConfig::from_env`], with a custom variable source. Values that do not
    /// parse fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let base_url = lookup("OLLAMA_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.base_url);

        let timeout = lookup("OLLAMA_TIMEOUT")
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let max_retries = lookup("OLLAMA_MAX_RETRIES")
            .and_then(|retries| retries.trim().parse::<u32>().ok())
            .unwrap_or(defaults.max_retries);

        Self {
            base_url,
            timeout,
            max_retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerateOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Lower-cases the model name; anything outside the granite family falls back to the default.
pub fn normalize_model_name(model: &str) -> String {
    let model_name = model.to_lowercase();
    if model_name.contains("granite") {
        model_name
    } else {
        warn!("Unknown model '{}', defaulting to {}", model, DEFAULT_MODEL);
        DEFAULT_MODEL.to_string()
    }
}

pub(crate) fn build_request(prompt: &str, options: &QueryOptions) -> GenerateRequest {
    let lowered = prompt.to_lowercase();
    let system = (lowered.contains("json") || lowered.contains("extract"))
        .then(|| JSON_SYSTEM_PROMPT.to_string());

    GenerateRequest {
        model: normalize_model_name(&options.model),
        prompt: prompt.to_string(),
        stream: false,
        options: GenerateOptions {
            temperature: options.temperature,
            num_predict: options.max_tokens,
        },
        system,
    }
}

/// The first request plus every retry, saturating for absurd retry counts.
fn total_attempts(max_retries: u32) -> u32 {
    max_retries.saturating_add(1)
}

#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Sends one prompt to `/api/generate`, retrying failed requests with a linearly
    /// growing wait (2s, 4s, ...).
    pub async fn query(&self, prompt: &str, options: &QueryOptions) -> Result<String> {
        let request = build_request(prompt, options);
        let max_attempts = total_attempts(self.config.max_retries);

        for attempt in 1..=max_attempts {
            info!("Querying {} model...", request.model);
            let started = Instant::now();

            match self.send(&request).await {
                Ok(text) => {
                    info!(
                        "Model response received in {:.2} seconds",
                        started.elapsed().as_secs_f64()
                    );
                    return Ok(text);
                }
                Err(e) if attempt < max_attempts => {
                    let wait = Duration::from_secs(u64::from(attempt) * 2);
                    warn!(
                        "Error querying model (attempt {}/{}): {}. Retrying in {} seconds",
                        attempt,
                        max_attempts,
                        e,
                        wait.as_secs()
                    );
                    sleep(wait).await;
                }
                Err(e) => {
                    return Err(IncomeFlowError::ModelQueryFailed {
                        attempts: attempt,
                        message: format!(
                            "{}. Please check that the Ollama service is running with model {}",
                            e, request.model
                        ),
                    });
                }
            }
        }

        Err(IncomeFlowError::ModelQueryFailed {
            attempts: max_attempts,
            message: "no attempt was made".to_string(),
        })
    }

    async fn send(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.config.base_url);
        let res = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = res.json().await?;
        Ok(body.response.trim().to_string())
    }
}
