//! The seam between the pure estimation core and metadata retrieval.

use crate::arch::{ModelArchitecture, ModelSource};
use crate::error::{QuantfitError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Supplies architecture records for model identifiers.
///
/// Implementations must be idempotent: the same source always yields the
/// same record, which is what makes read-through caching safe. The core
/// does not care whether a record came from a remote registry, a local
/// inference server or a cache in between.
#[async_trait]
pub trait ArchitectureProvider: Send + Sync {
    async fn resolve(&self, source: &ModelSource) -> Result<ModelArchitecture>;
}

/// A fixed in-memory provider.
///
/// Useful for tests and for embedding the estimator where architecture
/// records are already known and no network should be touched.
#[derive(Debug, Default)]
pub struct StaticProvider {
    models: HashMap<String, ModelArchitecture>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, arch: ModelArchitecture) -> Self {
        self.models.insert(arch.model_id.clone(), arch);
        self
    }
}

#[async_trait]
impl ArchitectureProvider for StaticProvider {
    async fn resolve(&self, source: &ModelSource) -> Result<ModelArchitecture> {
        self.models
            .get(source.id())
            .cloned()
            .ok_or_else(|| QuantfitError::ArchitectureNotFound { model: source.id().to_string() })
    }
}
