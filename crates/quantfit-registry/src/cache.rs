//! Read-through caching of resolved architecture records.

use async_trait::async_trait;
use quantfit_core::{ArchitectureProvider, ModelArchitecture, ModelSource, Result};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Wraps a provider with an in-memory read-through cache.
///
/// Keyed by model identifier and never invalidated: a model id's
/// architecture is static, so a hit is always valid for the lifetime of
/// the cache. The lock allows concurrent readers and a single writer;
/// it is never held across the inner provider's await point, so two
/// concurrent misses may both fetch and the second insert wins
/// (harmlessly, both fetched the same record).
///
/// Failures are not cached; a transient retrieval error leaves the entry
/// absent so the next call retries at the caller's discretion.
pub struct CachedProvider<P> {
    inner: P,
    entries: RwLock<HashMap<String, ModelArchitecture>>,
}

impl<P> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner, entries: RwLock::new(HashMap::new()) }
    }

    /// Number of cached records, for diagnostics.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<P: ArchitectureProvider> ArchitectureProvider for CachedProvider<P> {
    async fn resolve(&self, source: &ModelSource) -> Result<ModelArchitecture> {
        let key = source.id().to_string();

        if let Ok(entries) = self.entries.read() {
            if let Some(arch) = entries.get(&key) {
                debug!(model = %key, "architecture cache hit");
                return Ok(arch.clone());
            }
        }

        let arch = self.inner.resolve(source).await?;

        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, arch.clone());
        }
        Ok(arch)
    }
}
