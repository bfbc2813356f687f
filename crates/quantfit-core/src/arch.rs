//! Model architecture records and model-source identifiers.

use crate::error::{QuantfitError, Result};
use serde::{Deserialize, Serialize};

/// Architecture parameters of a transformer model.
///
/// Fetched once per model identifier by an [`crate::ArchitectureProvider`]
/// and treated as immutable afterwards: the architecture of a given model id
/// never changes, which is what makes read-through caching safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArchitecture {
    pub model_id: String,
    /// Total parameter count in billions (e.g. `7.24` for a 7B model).
    pub params_billions: f64,
    /// Maximum context length the model supports.
    pub max_position_embeddings: u32,
    pub num_layers: u32,
    pub hidden_size: u32,
    pub num_attention_heads: u32,
    /// May be smaller than `num_attention_heads` under grouped-query
    /// attention, which shrinks the KV cache proportionally.
    pub num_key_value_heads: u32,
    pub intermediate_size: u32,
    pub vocab_size: u32,
}

impl ModelArchitecture {
    /// Reject records the memory model must never see.
    ///
    /// The estimation formula assumes strictly positive inputs; a zero
    /// field would silently produce a nonsense (but plausible-looking)
    /// estimate, so validation happens here at the boundary.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(QuantfitError::InvalidArchitecture {
                model: self.model_id.clone(),
                reason: reason.to_string(),
            })
        };

        if !(self.params_billions.is_finite() && self.params_billions > 0.0) {
            return fail("parameter count must be positive");
        }
        if self.max_position_embeddings == 0 {
            return fail("max_position_embeddings must be positive");
        }
        if self.num_layers == 0 {
            return fail("num_layers must be positive");
        }
        if self.hidden_size == 0 {
            return fail("hidden_size must be positive");
        }
        if self.num_attention_heads == 0 {
            return fail("num_attention_heads must be positive");
        }
        if self.num_key_value_heads == 0 {
            return fail("num_key_value_heads must be positive");
        }
        if self.intermediate_size == 0 {
            return fail("intermediate_size must be positive");
        }
        if self.vocab_size == 0 {
            return fail("vocab_size must be positive");
        }
        Ok(())
    }

    /// Real-valued head dimension (`hidden_size / num_attention_heads`).
    pub fn head_dim(&self) -> f64 {
        f64::from(self.hidden_size) / f64::from(self.num_attention_heads)
    }

    /// Fraction of attention heads that carry KV state, clamped to `(0, 1]`.
    /// Equals 1.0 for standard multi-head attention, below 1.0 under GQA.
    pub fn gqa_factor(&self) -> f64 {
        let ratio = f64::from(self.num_key_value_heads) / f64::from(self.num_attention_heads);
        ratio.clamp(f64::MIN_POSITIVE, 1.0)
    }
}

/// Where a model's architecture record comes from.
///
/// The identifier syntax is resolved exactly once, here: a name containing
/// `:` (an Ollama tag such as `llama3.1:8b`) addresses the local inference
/// server, anything else is a registry repository id. Nothing downstream
/// re-inspects the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelSource {
    /// A Hugging Face style repository id, e.g. `meta-llama/Llama-2-7b-hf`.
    HuggingFace { repo: String },
    /// A model tag on a locally running Ollama server, e.g. `llama3.1:8b`.
    Ollama { name: String },
}

impl ModelSource {
    /// Classify a raw model identifier.
    pub fn parse(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(QuantfitError::ArchitectureNotFound { model: identifier.to_string() });
        }
        if identifier.contains(':') {
            Ok(Self::Ollama { name: identifier.to_string() })
        } else {
            Ok(Self::HuggingFace { repo: identifier.to_string() })
        }
    }

    /// The raw identifier, used as cache key and in log lines.
    pub fn id(&self) -> &str {
        match self {
            Self::HuggingFace { repo } => repo,
            Self::Ollama { name } => name,
        }
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
