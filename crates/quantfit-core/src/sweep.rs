//! Quantisation sweep: best scheme per context size for a memory budget.

use crate::arch::ModelArchitecture;
use crate::error::{QuantfitError, Result};
use crate::memory::{estimate_vram, estimate_vram_raw};
use crate::quant::{BpwValues, KvCacheQuant, GGUF_QUANTS};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Context sizes every sweep reports on.
pub const RECOMMENDATION_CONTEXTS: [u32; 6] = [2048, 8192, 16384, 32768, 49152, 65536];

/// Outcome of a quantisation sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    /// The caller's requested context size, always present as a key in
    /// `recommendations`.
    pub requested_context: u32,
    /// Highest-precision feasible scheme per context size; `None` when
    /// nothing in the table fits the budget at that size.
    pub recommendations: BTreeMap<u32, Option<String>>,
}

impl SweepResult {
    /// The best scheme at the requested context size.
    ///
    /// Errors with [`QuantfitError::NoFeasibleQuantisation`] when nothing
    /// fits there; the per-context map stays available on `self` so a
    /// caller can still present partial results.
    pub fn best_for_requested(&self) -> Result<&str> {
        self.recommendations
            .get(&self.requested_context)
            .and_then(Option::as_deref)
            .ok_or(QuantfitError::NoFeasibleQuantisation { context: self.requested_context })
    }
}

/// Pick the highest-BPW table scheme that fits `budget_gb` at `context`.
///
/// Selection is by maximum BPW among feasible entries, so table iteration
/// order cannot change the winner; the strict `>` comparison makes the
/// earlier entry win the table's one duplicate-BPW pair.
fn best_quant_at(
    arch: &ModelArchitecture,
    budget_gb: f64,
    context: u32,
    kv: KvCacheQuant,
) -> Option<(&'static str, f64)> {
    let mut best: Option<(&'static str, f64)> = None;
    for &(name, bpw) in GGUF_QUANTS {
        let values = BpwValues::from_body(bpw, kv);
        let vram = estimate_vram_raw(arch, &values, context, 1);
        if vram <= budget_gb && best.map_or(true, |(_, max)| bpw > max) {
            best = Some((name, bpw));
        }
    }
    best
}

/// Sweep the quantisation table over the recommendation grid.
///
/// `requested_context` is inserted into the grid in sorted position when
/// absent (the `BTreeMap` collapses duplicates).
pub fn sweep(
    arch: &ModelArchitecture,
    budget_gb: f64,
    requested_context: u32,
    kv: KvCacheQuant,
) -> SweepResult {
    let mut contexts: Vec<u32> = RECOMMENDATION_CONTEXTS.to_vec();
    contexts.push(requested_context);

    let mut recommendations = BTreeMap::new();
    for context in contexts {
        let best = best_quant_at(arch, budget_gb, context, kv);
        debug!(context, best = best.map(|(name, _)| name), "sweep grid point");
        recommendations.insert(context, best.map(|(name, _)| name.to_string()));
    }

    SweepResult { requested_context, recommendations }
}

/// Highest feasible precision at exactly the requested context size.
///
/// Returns the scheme name and its BPW, or
/// [`QuantfitError::NoFeasibleBpw`] when no table entry fits.
pub fn max_bpw(
    arch: &ModelArchitecture,
    budget_gb: f64,
    context: u32,
    kv: KvCacheQuant,
) -> Result<(&'static str, f64)> {
    best_quant_at(arch, budget_gb, context, kv)
        .ok_or(QuantfitError::NoFeasibleBpw { context })
}

/// Footprint of one (scheme, context) cell at the three KV-cache
/// precisions.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ContextFootprint {
    pub fp16: f64,
    pub q8_0: f64,
    pub q4_0: f64,
}

/// One quantisation scheme's footprint across the context grid.
#[derive(Debug, Clone, Serialize)]
pub struct QuantTableRow {
    pub quant: &'static str,
    pub bpw: f64,
    pub contexts: BTreeMap<u32, ContextFootprint>,
}

/// Full footprint matrix: every table scheme at every grid context, each
/// at the three KV-cache precisions. Numeric values only; rendering is the
/// CLI's job.
#[derive(Debug, Clone, Serialize)]
pub struct QuantTable {
    pub model_id: String,
    pub budget_gb: f64,
    /// Rows sorted from lowest BPW to highest.
    pub rows: Vec<QuantTableRow>,
}

/// Evaluate the footprint matrix for an architecture and budget.
pub fn quant_table(arch: &ModelArchitecture, budget_gb: f64) -> QuantTable {
    let mut rows: Vec<QuantTableRow> = GGUF_QUANTS
        .iter()
        .map(|&(quant, bpw)| {
            let contexts = RECOMMENDATION_CONTEXTS
                .iter()
                .map(|&context| {
                    let cell = ContextFootprint {
                        fp16: estimate_vram(
                            arch,
                            &BpwValues::from_body(bpw, KvCacheQuant::Fp16),
                            context,
                            1,
                        ),
                        q8_0: estimate_vram(
                            arch,
                            &BpwValues::from_body(bpw, KvCacheQuant::Q8_0),
                            context,
                            1,
                        ),
                        q4_0: estimate_vram(
                            arch,
                            &BpwValues::from_body(bpw, KvCacheQuant::Q4_0),
                            context,
                            1,
                        ),
                    };
                    (context, cell)
                })
                .collect();
            QuantTableRow { quant, bpw, contexts }
        })
        .collect();

    rows.sort_by(|a, b| a.bpw.total_cmp(&b.bpw));

    QuantTable { model_id: arch.model_id.clone(), budget_gb, rows }
}
