//! The estimation orchestrator: one call, one complete answer.

use crate::arch::ModelSource;
use crate::error::Result;
use crate::memory::estimate_vram;
use crate::provider::ArchitectureProvider;
use crate::quant::{resolve_bpw, KvCacheQuant};
use crate::search::max_context;
use crate::sweep::{self, QuantTable};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Defaults applied when a request leaves a field unset.
pub const DEFAULT_VRAM_GB: f64 = 24.0;
pub const DEFAULT_CONTEXT_SIZE: u32 = 8192;
pub const DEFAULT_QUANT_LEVEL: &str = "Q4_K_M";

/// One estimation request.
#[derive(Debug, Clone)]
pub struct EstimateRequest {
    /// Raw model identifier; classified once via [`ModelSource::parse`].
    pub model: String,
    pub vram_gb: Option<f64>,
    pub context_size: Option<u32>,
    /// Table name or raw numeric BPW.
    pub quant_level: Option<String>,
    pub kv_cache: KvCacheQuant,
}

impl EstimateRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            vram_gb: None,
            context_size: None,
            quant_level: None,
            kv_cache: KvCacheQuant::Fp16,
        }
    }
}

/// The complete answer for one request.
#[derive(Debug, Clone, Serialize)]
pub struct VramEstimate {
    pub model_id: String,
    pub context_size: u32,
    pub kv_cache_quant: KvCacheQuant,
    pub available_vram_gb: f64,
    pub quant_level: String,
    /// Footprint at the requested settings, rounded to 2 decimal places.
    pub estimated_vram_gb: f64,
    pub fits_available: bool,
    /// Largest context fitting the budget at the requested precision.
    pub max_context_size: u32,
    /// Highest-precision scheme fitting the budget at the requested
    /// context; `None` when nothing in the table fits there.
    pub max_quant: Option<String>,
    /// Best feasible scheme per grid context size.
    pub recommendations: BTreeMap<u32, Option<String>>,
}

/// Composes the resolver, memory model, context search and sweep behind a
/// single entry point. Owns the architecture provider; callers decide
/// whether that provider caches.
pub struct Estimator {
    provider: Box<dyn ArchitectureProvider>,
}

impl Estimator {
    pub fn new(provider: impl ArchitectureProvider + 'static) -> Self {
        Self { provider: Box::new(provider) }
    }

    /// Run the full estimation pipeline.
    ///
    /// Identifier classification, metadata retrieval, validation and BPW
    /// resolution abort the request on failure. Past that point the
    /// remaining stages degrade partially instead: an infeasible sweep at
    /// the requested context leaves `max_quant` as `None` while the other
    /// fields are still reported.
    pub async fn estimate(&self, request: &EstimateRequest) -> Result<VramEstimate> {
        let source = ModelSource::parse(&request.model)?;
        debug!(model = %source, "resolving architecture");

        let arch = self.provider.resolve(&source).await?;
        arch.validate()?;

        let vram_gb = request.vram_gb.unwrap_or(DEFAULT_VRAM_GB);
        let context_size = request.context_size.unwrap_or(DEFAULT_CONTEXT_SIZE);
        let quant_level =
            request.quant_level.clone().unwrap_or_else(|| DEFAULT_QUANT_LEVEL.to_string());

        let bpw = resolve_bpw(&quant_level, request.kv_cache)?;

        let estimated_vram_gb = estimate_vram(&arch, &bpw, context_size, 1);
        let max_context_size = max_context(&arch, vram_gb, &bpw);

        let sweep_result = sweep::sweep(&arch, vram_gb, context_size, request.kv_cache);
        let max_quant = sweep_result.best_for_requested().ok().map(str::to_string);

        info!(
            model = %source,
            estimated_vram_gb,
            max_context_size,
            "estimation complete"
        );

        Ok(VramEstimate {
            model_id: arch.model_id,
            context_size,
            kv_cache_quant: request.kv_cache,
            available_vram_gb: vram_gb,
            quant_level,
            estimated_vram_gb,
            fits_available: estimated_vram_gb <= vram_gb,
            max_context_size,
            max_quant,
            recommendations: sweep_result.recommendations,
        })
    }

    /// Evaluate the full footprint matrix for a model.
    pub async fn quant_table(&self, model: &str, budget_gb: f64) -> Result<QuantTable> {
        let source = ModelSource::parse(model)?;
        let arch = self.provider.resolve(&source).await?;
        arch.validate()?;
        Ok(sweep::quant_table(&arch, budget_gb))
    }
}
