//! Property tests for the invariants the search procedures rely on.

use proptest::prelude::*;
use quantfit_core::memory::estimate_vram_raw;
use quantfit_core::quant::{BpwValues, KvCacheQuant};
use quantfit_core::search::max_context;
use quantfit_core::sweep::sweep;
use quantfit_core::{ModelArchitecture, GGUF_QUANTS};

fn arch_strategy() -> impl Strategy<Value = ModelArchitecture> {
    (
        0.1f64..200.0,
        1u32..=120,
        64u32..=16384,
        1u32..=128,
        1024u32..=65536,
        1000u32..=300_000,
        512u32..=131_072,
    )
        .prop_flat_map(
            |(params, layers, hidden, heads, intermediate, vocab, max_position)| {
                (1u32..=heads).prop_map(move |kv_heads| ModelArchitecture {
                    model_id: "prop/model".to_string(),
                    params_billions: params,
                    max_position_embeddings: max_position,
                    num_layers: layers,
                    hidden_size: hidden,
                    num_attention_heads: heads,
                    num_key_value_heads: kv_heads,
                    intermediate_size: intermediate,
                    vocab_size: vocab,
                })
            },
        )
}

fn kv_strategy() -> impl Strategy<Value = KvCacheQuant> {
    prop_oneof![
        Just(KvCacheQuant::Fp16),
        Just(KvCacheQuant::Q8_0),
        Just(KvCacheQuant::Q4_0),
    ]
}

proptest! {
    #[test]
    fn estimate_is_monotone_in_context(
        arch in arch_strategy(),
        body in 1.0f64..16.0,
        kv in kv_strategy(),
        ctx_a in 512u32..=131_072,
        ctx_b in 512u32..=131_072,
    ) {
        let (lo, hi) = if ctx_a <= ctx_b { (ctx_a, ctx_b) } else { (ctx_b, ctx_a) };
        let bpw = BpwValues::from_body(body, kv);
        prop_assert!(
            estimate_vram_raw(&arch, &bpw, lo, 1) <= estimate_vram_raw(&arch, &bpw, hi, 1)
        );
    }

    #[test]
    fn estimate_is_monotone_in_body_bpw(
        arch in arch_strategy(),
        kv in kv_strategy(),
        body_a in 1.0f64..16.0,
        body_b in 1.0f64..16.0,
        ctx in 512u32..=65536,
    ) {
        let (lo, hi) = if body_a <= body_b { (body_a, body_b) } else { (body_b, body_a) };
        let low = BpwValues::from_body(lo, kv);
        let high = BpwValues::from_body(hi, kv);
        prop_assert!(
            estimate_vram_raw(&arch, &low, ctx, 1) <= estimate_vram_raw(&arch, &high, ctx, 1)
        );
    }

    #[test]
    fn max_context_is_non_decreasing_in_budget(
        arch in arch_strategy(),
        body in 1.0f64..16.0,
        kv in kv_strategy(),
        budget_a in 0.5f64..256.0,
        budget_b in 0.5f64..256.0,
    ) {
        let (lo, hi) = if budget_a <= budget_b { (budget_a, budget_b) } else { (budget_b, budget_a) };
        let bpw = BpwValues::from_body(body, kv);
        prop_assert!(max_context(&arch, lo, &bpw) <= max_context(&arch, hi, &bpw));
    }

    #[test]
    fn sweep_winner_is_the_feasible_maximum(
        arch in arch_strategy(),
        kv in kv_strategy(),
        budget in 0.5f64..256.0,
        context in 512u32..=65536,
    ) {
        let result = sweep(&arch, budget, context, kv);
        for (&ctx, best) in &result.recommendations {
            match best.as_deref() {
                Some(winner) => {
                    let winner_bpw = quantfit_core::quant::lookup_quant(winner).unwrap();
                    for &(name, bpw) in GGUF_QUANTS {
                        let values = BpwValues::from_body(bpw, kv);
                        let vram = estimate_vram_raw(&arch, &values, ctx, 1);
                        if bpw > winner_bpw {
                            prop_assert!(vram > budget, "{name} outranks winner yet fits");
                        }
                    }
                    let values = BpwValues::from_body(winner_bpw, kv);
                    prop_assert!(estimate_vram_raw(&arch, &values, ctx, 1) <= budget);
                }
                None => {
                    for &(_, bpw) in GGUF_QUANTS {
                        let values = BpwValues::from_body(bpw, kv);
                        prop_assert!(estimate_vram_raw(&arch, &values, ctx, 1) > budget);
                    }
                }
            }
        }
    }
}
