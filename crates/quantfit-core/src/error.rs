//! Error types shared across the quantfit crates.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, QuantfitError>;

/// Every failure the estimation pipeline can surface.
///
/// Callers that want to react to a specific failure (the CLI prints
/// targeted hints) match on the variant, never on the rendered message.
#[derive(Debug, Error)]
pub enum QuantfitError {
    /// The quantisation specifier is neither a table entry nor a number.
    #[error("unknown quantisation level '{spec}'")]
    UnknownQuantisation { spec: String },

    /// The model identifier does not resolve in the registry.
    #[error("model '{model}' not found")]
    ArchitectureNotFound { model: String },

    /// Transient retrieval failure: network error, bad status, malformed
    /// manifest. Retrying is the caller's decision, never done here.
    #[error("could not retrieve architecture for '{model}': {reason}")]
    ArchitectureUnavailable { model: String, reason: String },

    /// The sweep found no table entry that fits the budget at the
    /// requested context length.
    #[error("no quantisation fits the memory budget at context {context}")]
    NoFeasibleQuantisation { context: u32 },

    /// The best-precision search found no feasible bits-per-weight value.
    #[error("no bits-per-weight value fits the memory budget at context {context}")]
    NoFeasibleBpw { context: u32 },

    /// An architecture record failed boundary validation. Zero or
    /// non-positive fields would break the monotonicity of the memory
    /// model, so they are rejected before it runs.
    #[error("invalid architecture for '{model}': {reason}")]
    InvalidArchitecture { model: String, reason: String },
}
