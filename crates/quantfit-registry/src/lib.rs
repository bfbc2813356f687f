//! Architecture metadata providers for quantfit.
//!
//! Two concrete sources exist: the Hugging Face model registry (manifest
//! plus safetensors index) and a locally running Ollama server (live
//! `/api/show` response). [`RegistryProvider`] dispatches between them on
//! the already-classified [`ModelSource`] variant; [`cache::CachedProvider`]
//! wraps any provider with a read-through cache.

pub mod cache;
pub mod huggingface;
pub mod ollama;

use async_trait::async_trait;
use quantfit_core::{ArchitectureProvider, ModelArchitecture, ModelSource, Result};

pub use cache::CachedProvider;
pub use huggingface::HuggingFaceProvider;
pub use ollama::OllamaProvider;

/// Dispatches resolution to the provider matching the source variant.
pub struct RegistryProvider {
    huggingface: HuggingFaceProvider,
    ollama: OllamaProvider,
}

impl RegistryProvider {
    /// Build both providers from the process environment
    /// (`HUGGINGFACE_TOKEN`, `OLLAMA_HOST`).
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            huggingface: HuggingFaceProvider::from_env()?,
            ollama: OllamaProvider::from_env()?,
        })
    }
}

#[async_trait]
impl ArchitectureProvider for RegistryProvider {
    async fn resolve(&self, source: &ModelSource) -> Result<ModelArchitecture> {
        match source {
            ModelSource::HuggingFace { repo } => self.huggingface.fetch(repo).await,
            ModelSource::Ollama { name } => self.ollama.fetch(name).await,
        }
    }
}
