
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OllamaConfig;
use crate::embeddings::retry::{RetryPolicy, initialize_with_retry};
use crate::embeddings::{Embedder, validate_embeddings};
use crate::generation::Generator;
use crate::{RagError, Result};

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const GENERATION_TIMEOUT_SECONDS: u64 = 120;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    generation_model: String,
    dimension: usize,
    batch_size: usize,
    agent: ureq::Agent,
    generation_agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

fn agent_with_timeout(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Ollama model names carry an implicit `:latest` tag
fn model_matches(available: &str, wanted: &str) -> bool {
    available == wanted
        || available.strip_suffix(":latest") == Some(wanted)
        || wanted.strip_suffix(":latest") == Some(available)
}

fn describe_transport_error(error: &ureq::Error) -> String {
    match error {
        ureq::Error::StatusCode(status) if *status >= 500 => format!("Server error: HTTP {}", status),
        ureq::Error::StatusCode(status) => format!("Client error: HTTP {}", status),
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
            format!("Ollama server unreachable: {}", error)
        }
        ureq::Error::Timeout(_) => format!("Request timed out: {}", error),
        _ => format!("Request error: {}", error),
    }
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .map_err(|e| RagError::Config(e.to_string()))?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            generation_model: config.generation_model.clone(),
            dimension: config.embedding_dimension as usize,
            batch_size: (config.batch_size as usize).max(1),
            agent: agent_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
            generation_agent: agent_with_timeout(Duration::from_secs(GENERATION_TIMEOUT_SECONDS)),
        })
    }

    /// Build a client and wait for the server and model to become available.
    ///
    /// Uses [`RetryPolicy::model_init`]; fails with [`RagError::ModelUnavailable`]
    /// once the attempts are exhausted.
    #[inline]
    pub fn connect(config: &OllamaConfig) -> Result<Self> {
        Self::connect_with(config, &RetryPolicy::model_init(), std::thread::sleep)
    }

    #[inline]
    pub fn connect_with<S>(config: &OllamaConfig, policy: &RetryPolicy, sleep: S) -> Result<Self>
    where
        S: FnMut(Duration),
    {
        let client = Self::new(config)?;
        initialize_with_retry(policy, sleep, |_| client.health_check())?;
        Ok(client)
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = agent_with_timeout(timeout);
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Test connection to Ollama server and verify model availability
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models()?;
        if !models.iter().any(|m| model_matches(&m.name, &self.model)) {
            let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available
            );
            return Err(RagError::Embedding(format!(
                "Model '{}' is not available. Available models: {:?}",
                self.model, available
            )));
        }

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags")?;
        debug!("Fetching available models from {}", url);

        let response_text = self
            .agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| RagError::Embedding(describe_transport_error(&e)))?;

        let models: ModelsResponse = serde_json::from_str(&response_text)?;
        debug!("Found {} models", models.models.len());
        Ok(models.models)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RagError::Config(format!("Failed to build {} URL: {}", path, e)))
    }

    fn post_json<T: Serialize>(&self, agent: &ureq::Agent, path: &str, body: &T) -> Result<String> {
        let url = self.endpoint(path)?;
        let request_json = serde_json::to_string(body)?;

        agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| RagError::Embedding(describe_transport_error(&e)))
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let response_text = self.post_json(&self.agent, "/api/embed", &request)?;
        let response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        validate_embeddings(&response.embeddings, texts.len(), self.dimension)?;
        Ok(response.embeddings)
    }
}

impl Embedder for OllamaClient {
    /// Embed texts in batches of the configured size
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_single_batch(batch)?);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn model_name(&self) -> &str {
        &self.model
    }
}

impl Generator for OllamaClient {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Generating completion with {} (prompt length: {})",
            self.generation_model,
            prompt.len()
        );

        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
        };
        let response_text = self
            .post_json(&self.generation_agent, "/api/generate", &request)
            .map_err(|e| RagError::Generation(e.to_string()))?;
        let response: GenerateResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Generation(format!("Failed to parse generate response: {}", e)))?;

        Ok(response.response)
    }
}
