//! Hugging Face registry provider.
//!
//! Architecture parameters come from two files in a model repository: the
//! `config.json` manifest carries the transformer dimensions, and the
//! `model.safetensors.index.json` metadata carries the total shard size,
//! from which the parameter count is derived (shards are stored fp16, two
//! bytes per parameter).

use quantfit_core::{ModelArchitecture, QuantfitError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://huggingface.co";
const REGISTRY_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("quantfit/", env!("CARGO_PKG_VERSION"));

/// The subset of a registry `config.json` the estimator needs.
#[derive(Debug, Deserialize)]
pub struct RegistryManifest {
    pub max_position_embeddings: u32,
    pub num_hidden_layers: u32,
    pub hidden_size: u32,
    pub num_attention_heads: u32,
    /// Absent for pre-GQA manifests; defaults to the attention head count.
    pub num_key_value_heads: Option<u32>,
    pub intermediate_size: u32,
    pub vocab_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct SafetensorsIndex {
    pub metadata: IndexMetadata,
}

#[derive(Debug, Deserialize)]
pub struct IndexMetadata {
    pub total_size: f64,
}

/// Combine the two registry files into an architecture record.
pub fn architecture_from_manifest(
    repo: &str,
    manifest: RegistryManifest,
    index: &SafetensorsIndex,
) -> ModelArchitecture {
    let num_attention_heads = manifest.num_attention_heads;
    ModelArchitecture {
        model_id: repo.to_string(),
        params_billions: index.metadata.total_size / 2.0 / 1e9,
        max_position_embeddings: manifest.max_position_embeddings,
        num_layers: manifest.num_hidden_layers,
        hidden_size: manifest.hidden_size,
        num_attention_heads,
        num_key_value_heads: manifest.num_key_value_heads.unwrap_or(num_attention_heads),
        intermediate_size: manifest.intermediate_size,
        vocab_size: manifest.vocab_size,
    }
}

/// Fetches architecture records from the Hugging Face registry.
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HuggingFaceProvider {
    /// Build a provider, picking up `HUGGINGFACE_TOKEN` for gated repos.
    pub fn from_env() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Point the provider at a different registry root (tests, mirrors).
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REGISTRY_TIMEOUT)
            .build()
            .map_err(|e| QuantfitError::ArchitectureUnavailable {
                model: base_url.clone(),
                reason: format!("http client: {e}"),
            })?;
        Ok(Self { client, base_url, token: std::env::var("HUGGINGFACE_TOKEN").ok() })
    }

    /// Retrieve and assemble the architecture record for a repository id.
    pub async fn fetch(&self, repo: &str) -> Result<ModelArchitecture> {
        let manifest: RegistryManifest = self.get_json(repo, "config.json").await?;
        let index: SafetensorsIndex = self.get_json(repo, "model.safetensors.index.json").await?;
        debug!(repo, total_size = index.metadata.total_size, "registry manifest fetched");
        Ok(architecture_from_manifest(repo, manifest, &index))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, repo: &str, file: &str) -> Result<T> {
        let url = format!("{}/{}/raw/main/{}", self.base_url, repo, file);
        debug!(%url, "fetching registry file");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response =
            request.send().await.map_err(|e| QuantfitError::ArchitectureUnavailable {
                model: repo.to_string(),
                reason: e.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QuantfitError::ArchitectureNotFound { model: repo.to_string() });
        }
        if !response.status().is_success() {
            return Err(QuantfitError::ArchitectureUnavailable {
                model: repo.to_string(),
                reason: format!("{} returned status {}", file, response.status()),
            });
        }

        response.json().await.map_err(|e| QuantfitError::ArchitectureUnavailable {
            model: repo.to_string(),
            reason: format!("malformed {file}: {e}"),
        })
    }
}
