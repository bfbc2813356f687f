//! Ollama provider: architecture metadata from a running local server.
//!
//! `POST /api/show` returns a `model_info` map whose keys are prefixed by
//! the model family (`llama.context_length`, `qwen2.embedding_length`,
//! ...). The family name comes from `general.architecture`, so families
//! other than llama resolve without special cases.

use quantfit_core::{ModelArchitecture, QuantfitError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Address used when `OLLAMA_HOST` is unset.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

const SHOW_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    model_info: Map<String, Value>,
}

fn require_u32(info: &Map<String, Value>, key: &str, model: &str) -> Result<u32> {
    info.get(key).and_then(Value::as_f64).map(|v| v as u32).ok_or_else(|| {
        QuantfitError::ArchitectureUnavailable {
            model: model.to_string(),
            reason: format!("show response missing '{key}'"),
        }
    })
}

/// Convert a `model_info` map into an architecture record.
pub fn architecture_from_show(model: &str, info: &Map<String, Value>) -> Result<ModelArchitecture> {
    let family = info
        .get("general.architecture")
        .and_then(Value::as_str)
        .unwrap_or("llama")
        .to_string();

    let param_count = info
        .get("general.parameter_count")
        .and_then(Value::as_f64)
        .ok_or_else(|| QuantfitError::ArchitectureUnavailable {
            model: model.to_string(),
            reason: "show response missing 'general.parameter_count'".to_string(),
        })?;

    let key = |suffix: &str| format!("{family}.{suffix}");
    let num_attention_heads = require_u32(info, &key("attention.head_count"), model)?;
    let num_key_value_heads = info
        .get(&key("attention.head_count_kv"))
        .and_then(Value::as_f64)
        .map_or(num_attention_heads, |v| v as u32);

    Ok(ModelArchitecture {
        model_id: model.to_string(),
        params_billions: param_count / 1e9,
        max_position_embeddings: require_u32(info, &key("context_length"), model)?,
        num_layers: require_u32(info, &key("block_count"), model)?,
        hidden_size: require_u32(info, &key("embedding_length"), model)?,
        num_attention_heads,
        num_key_value_heads,
        intermediate_size: require_u32(info, &key("feed_forward_length"), model)?,
        vocab_size: require_u32(info, &key("vocab_size"), model)?,
    })
}

/// Fetches architecture records from a local Ollama server.
pub struct OllamaProvider {
    client: reqwest::Client,
    host: String,
    host_defaulted: bool,
}

impl OllamaProvider {
    /// Build a provider for the host in `OLLAMA_HOST`, falling back to
    /// [`DEFAULT_OLLAMA_HOST`].
    pub fn from_env() -> Result<Self> {
        match std::env::var("OLLAMA_HOST") {
            Ok(host) => Self::with_host(host),
            Err(_) => {
                let mut provider = Self::with_host(DEFAULT_OLLAMA_HOST.to_string())?;
                provider.host_defaulted = true;
                Ok(provider)
            }
        }
    }

    pub fn with_host(host: String) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(SHOW_TIMEOUT).build().map_err(|e| {
            QuantfitError::ArchitectureUnavailable {
                model: host.clone(),
                reason: format!("http client: {e}"),
            }
        })?;
        Ok(Self { client, host, host_defaulted: false })
    }

    /// Retrieve the architecture record for a model tag.
    pub async fn fetch(&self, model: &str) -> Result<ModelArchitecture> {
        if self.host_defaulted {
            warn!("OLLAMA_HOST is not set, using {DEFAULT_OLLAMA_HOST}");
        }
        let url = format!("{}/api/show", self.host);
        debug!(%url, model, "querying ollama");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await
            .map_err(|e| QuantfitError::ArchitectureUnavailable {
                model: model.to_string(),
                reason: format!("request to {url} failed: {e}"),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QuantfitError::ArchitectureNotFound { model: model.to_string() });
        }
        if !response.status().is_success() {
            return Err(QuantfitError::ArchitectureUnavailable {
                model: model.to_string(),
                reason: format!("ollama returned status {}", response.status()),
            });
        }

        let show: ShowResponse =
            response.json().await.map_err(|e| QuantfitError::ArchitectureUnavailable {
                model: model.to_string(),
                reason: format!("malformed show response: {e}"),
            })?;

        architecture_from_show(model, &show.model_info)
    }
}
