//! The GGUF quantisation table and bits-per-weight resolution.

use crate::error::{QuantfitError, Result};
use serde::{Deserialize, Serialize};

/// GGUF quantisation schemes and their effective bits per weight, ordered
/// from highest precision to lowest.
///
/// The values are the measured on-disk averages for llama.cpp quantisations
/// (block headers and scales included), not the nominal bit widths. The
/// ordering is part of the contract: sweep selection uses a strict `>`
/// comparison, so of the one duplicate pair (`Q5_K_S`/`Q5_0`, both 5.54)
/// the earlier entry wins deterministically.
pub const GGUF_QUANTS: &[(&str, f64)] = &[
    ("Q8_0", 8.5),
    ("Q6_K", 6.59),
    ("Q5_K_L", 5.75),
    ("Q5_K_M", 5.69),
    ("Q5_K_S", 5.54),
    ("Q5_0", 5.54),
    ("Q4_K_L", 4.9),
    ("Q4_K_M", 4.85),
    ("Q4_K_S", 4.58),
    ("Q4_0", 4.55),
    ("IQ4_NL", 4.5),
    ("Q3_K_L", 4.27),
    ("IQ4_XS", 4.25),
    ("Q3_K_M", 3.91),
    ("IQ3_M", 3.7),
    ("IQ3_S", 3.5),
    ("Q3_K_S", 3.5),
    ("Q2_K", 3.35),
    ("IQ3_XS", 3.3),
    ("IQ3_XXS", 3.06),
    ("IQ2_M", 2.7),
    ("IQ2_S", 2.5),
    ("IQ2_XS", 2.31),
    ("IQ2_XXS", 2.06),
    ("IQ1_S", 1.56),
];

/// Look up a scheme's BPW by name, case-insensitively.
pub fn lookup_quant(name: &str) -> Option<f64> {
    GGUF_QUANTS
        .iter()
        .find(|(quant, _)| quant.eq_ignore_ascii_case(name))
        .map(|&(_, bpw)| bpw)
}

/// KV-cache precision, chosen independently of the body quantisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvCacheQuant {
    #[default]
    Fp16,
    #[serde(rename = "q8_0")]
    Q8_0,
    #[serde(rename = "q4_0")]
    Q4_0,
}

impl KvCacheQuant {
    /// Bits per cached key/value element.
    pub fn bpw(self) -> f64 {
        match self {
            Self::Fp16 => 16.0,
            Self::Q8_0 => 8.0,
            Self::Q4_0 => 4.0,
        }
    }
}

impl std::str::FromStr for KvCacheQuant {
    type Err = QuantfitError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fp16" | "f16" => Ok(Self::Fp16),
            "q8_0" | "q8" => Ok(Self::Q8_0),
            "q4_0" | "q4" => Ok(Self::Q4_0),
            _ => Err(QuantfitError::UnknownQuantisation { spec: s.to_string() }),
        }
    }
}

impl std::fmt::Display for KvCacheQuant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fp16 => write!(f, "fp16"),
            Self::Q8_0 => write!(f, "q8_0"),
            Self::Q4_0 => write!(f, "q4_0"),
        }
    }
}

/// The three precisions the memory model distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpwValues {
    /// Bits per weight of the transformer body.
    pub body: f64,
    /// Bits per weight of the LM head (output projection).
    pub lm_head: f64,
    /// Bits per cached key/value element.
    pub kv_cache: f64,
}

impl BpwValues {
    /// Derive the full triple from a body BPW and a KV-cache selector.
    ///
    /// The LM head is conventionally kept at higher precision than the
    /// body: it is pinned to 8 bits when the body is above 6 bits, and
    /// floored at 6 bits otherwise. The rule is a function of the numeric
    /// body BPW only, so user-supplied raw numbers resolve the same way as
    /// named schemes.
    pub fn from_body(body: f64, kv: KvCacheQuant) -> Self {
        let lm_head = if body > 6.0 { 8.0 } else { 6.0 };
        Self { body, lm_head, kv_cache: kv.bpw() }
    }
}

/// Resolve a quantisation specifier into a [`BpwValues`] triple.
///
/// The specifier is either a name from [`GGUF_QUANTS`] or a raw numeric
/// bits-per-weight value such as `"4.85"`.
pub fn resolve_bpw(spec: &str, kv: KvCacheQuant) -> Result<BpwValues> {
    let body = match spec.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => n,
        Ok(_) => {
            return Err(QuantfitError::UnknownQuantisation { spec: spec.to_string() });
        }
        Err(_) => lookup_quant(spec).ok_or_else(|| QuantfitError::UnknownQuantisation {
            spec: spec.to_string(),
        })?,
    };
    Ok(BpwValues::from_body(body, kv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_descending() {
        for pair in GGUF_QUANTS.windows(2) {
            assert!(pair[0].1 >= pair[1].1, "{} before {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn named_lookup_is_case_insensitive() {
        assert_eq!(lookup_quant("Q4_K_M"), Some(4.85));
        assert_eq!(lookup_quant("q4_k_m"), Some(4.85));
        assert_eq!(lookup_quant("iq1_s"), Some(1.56));
        assert_eq!(lookup_quant("Q9_9"), None);
    }

    #[test]
    fn numeric_and_named_specifiers_resolve_identically() {
        for &(name, bpw) in GGUF_QUANTS {
            let named = resolve_bpw(name, KvCacheQuant::Fp16).unwrap();
            let numeric = resolve_bpw(&bpw.to_string(), KvCacheQuant::Fp16).unwrap();
            assert_eq!(named, numeric, "mismatch for {name}");
        }
    }

    #[test]
    fn lm_head_floor_and_pin() {
        assert_eq!(BpwValues::from_body(4.85, KvCacheQuant::Fp16).lm_head, 6.0);
        assert_eq!(BpwValues::from_body(6.0, KvCacheQuant::Fp16).lm_head, 6.0);
        assert_eq!(BpwValues::from_body(6.59, KvCacheQuant::Fp16).lm_head, 8.0);
        assert_eq!(BpwValues::from_body(8.5, KvCacheQuant::Fp16).lm_head, 8.0);
    }

    #[test]
    fn kv_cache_resolved_from_selector_only() {
        assert_eq!(resolve_bpw("Q8_0", KvCacheQuant::Q4_0).unwrap().kv_cache, 4.0);
        assert_eq!(resolve_bpw("IQ1_S", KvCacheQuant::Fp16).unwrap().kv_cache, 16.0);
        assert_eq!(resolve_bpw("5.0", KvCacheQuant::Q8_0).unwrap().kv_cache, 8.0);
    }

    #[test]
    fn bad_specifiers_are_rejected() {
        assert!(matches!(
            resolve_bpw("Q4_K_Z", KvCacheQuant::Fp16),
            Err(QuantfitError::UnknownQuantisation { .. })
        ));
        assert!(resolve_bpw("-4.0", KvCacheQuant::Fp16).is_err());
        assert!(resolve_bpw("0", KvCacheQuant::Fp16).is_err());
        assert!(resolve_bpw("NaN", KvCacheQuant::Fp16).is_err());
        assert!(resolve_bpw("inf", KvCacheQuant::Fp16).is_err());
    }

    #[test]
    fn kv_quant_parses() {
        assert_eq!("fp16".parse::<KvCacheQuant>().unwrap(), KvCacheQuant::Fp16);
        assert_eq!("Q8_0".parse::<KvCacheQuant>().unwrap(), KvCacheQuant::Q8_0);
        assert_eq!("q4".parse::<KvCacheQuant>().unwrap(), KvCacheQuant::Q4_0);
        assert!("int8".parse::<KvCacheQuant>().is_err());
    }
}
