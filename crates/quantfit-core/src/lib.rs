//! Core estimation logic for quantfit.
//!
//! This crate answers three questions about running a transformer language
//! model on limited VRAM:
//!
//! - how much memory does a model need at a given quantisation level and
//!   context length ([`memory::estimate_vram`]),
//! - what is the largest context that fits a memory budget at a fixed
//!   precision ([`search::max_context`]),
//! - what is the highest precision that fits a memory budget at a fixed
//!   context ([`sweep`]).
//!
//! Everything in here is pure, synchronous computation. The only external
//! collaborator is the [`provider::ArchitectureProvider`] trait, which
//! supplies [`arch::ModelArchitecture`] records from a model registry or a
//! local inference server; implementations live in `quantfit-registry`.

pub mod arch;
pub mod error;
pub mod estimator;
pub mod memory;
pub mod provider;
pub mod quant;
pub mod search;
pub mod sweep;

pub use arch::{ModelArchitecture, ModelSource};
pub use error::{QuantfitError, Result};
pub use estimator::{EstimateRequest, Estimator, VramEstimate};
pub use provider::{ArchitectureProvider, StaticProvider};
pub use quant::{resolve_bpw, BpwValues, KvCacheQuant, GGUF_QUANTS};
pub use sweep::{QuantTable, SweepResult, RECOMMENDATION_CONTEXTS};
