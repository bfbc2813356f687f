//! Maximum-context search: inverts the memory model for a fixed precision.

use crate::arch::ModelArchitecture;
use crate::memory::estimate_vram_raw;
use crate::quant::BpwValues;
use tracing::debug;

/// Smallest context length the search will consider.
pub const CONTEXT_FLOOR: u32 = 512;

/// Granularity of the linear refinement walk, in tokens.
const REFINE_STEP: u32 = 100;

/// Largest context length whose estimated footprint fits `budget_gb`,
/// capped at the architecture's maximum supported context.
///
/// Two phases. Integer bisection over `[CONTEXT_FLOOR, max_position]`
/// first narrows to an exact bound, relying on the estimate being monotone
/// in context. A linear walk then advances in [`REFINE_STEP`]-token steps
/// until the estimate meets or exceeds the budget and backs off one step.
/// The walk quantises the answer to the coarser reporting granularity, so
/// results may sit up to one step below the true boundary; callers depend
/// on the stepped semantics, keep them.
///
/// When even [`CONTEXT_FLOOR`] tokens exceed the budget the floor is still
/// returned; there is no explicit infeasibility signal at the bottom of
/// the range.
pub fn max_context(arch: &ModelArchitecture, budget_gb: f64, bpw: &BpwValues) -> u32 {
    let ceiling = arch.max_position_embeddings.max(CONTEXT_FLOOR);
    let fits = |context: u32| estimate_vram_raw(arch, bpw, context, 1) <= budget_gb;

    let mut low = CONTEXT_FLOOR;
    let mut high = ceiling;
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if fits(mid) {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    debug!(bisected = low, budget_gb, "context bisection converged");

    let mut context = low;
    while context <= ceiling {
        if estimate_vram_raw(arch, bpw, context, 1) >= budget_gb {
            break;
        }
        context += REFINE_STEP;
    }

    context.saturating_sub(REFINE_STEP).max(CONTEXT_FLOOR)
}
