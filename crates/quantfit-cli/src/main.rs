//! quantfit: VRAM estimation and quantisation planning for LLMs.

use anyhow::{Context, Result};
use clap::Parser;
use quantfit_core::estimator::{DEFAULT_CONTEXT_SIZE, DEFAULT_QUANT_LEVEL, DEFAULT_VRAM_GB};
use quantfit_core::{EstimateRequest, Estimator, KvCacheQuant, QuantfitError};
use quantfit_registry::{CachedProvider, RegistryProvider};
use tracing::error;

mod table;

const EXIT_FAILURE: i32 = 1;

/// Estimate how much VRAM a model needs, the largest context that fits a
/// budget, and the best quantisation per context size.
#[derive(Parser)]
#[command(name = "quantfit")]
#[command(version)]
#[command(about = "VRAM estimation and quantisation planning for transformer LLMs")]
#[command(long_about = r#"
Estimates the VRAM footprint of a transformer model at a given quantisation
level and context length, then inverts the estimate both ways: the largest
context that fits your VRAM budget, and the highest precision that fits at
your context size.

Model identifiers containing ':' (e.g. llama3.1:8b) are resolved against a
local Ollama server (OLLAMA_HOST, default http://localhost:11434); anything
else is treated as a Hugging Face repository id and fetched from the
registry (set HUGGINGFACE_TOKEN for gated repos).

Examples:
  quantfit meta-llama/Llama-2-7b-hf
  quantfit llama3.1:8b --vram 12 --context 16384
  quantfit mistralai/Mistral-7B-v0.1 --quant Q5_K_M --kv-quant q8_0
"#)]
struct Cli {
    /// Hugging Face repo id, or Ollama model tag (contains ':')
    model: Option<String>,

    /// Model identifier (alternative to the positional argument)
    #[arg(long = "model", value_name = "MODEL", conflicts_with = "model")]
    model_opt: Option<String>,

    /// Available VRAM in GB
    #[arg(long, value_name = "GB", default_value_t = DEFAULT_VRAM_GB)]
    vram: f64,

    /// Context size in tokens
    #[arg(long, value_name = "TOKENS", default_value_t = DEFAULT_CONTEXT_SIZE)]
    context: u32,

    /// Quantisation level: a GGUF scheme name or a numeric bits-per-weight
    #[arg(long, value_name = "LEVEL", default_value = DEFAULT_QUANT_LEVEL)]
    quant: String,

    /// KV cache quantisation (fp16, q8_0, q4_0)
    #[arg(long, value_name = "LEVEL", default_value_t = KvCacheQuant::Fp16)]
    kv_quant: KvCacheQuant,

    /// Emit machine-readable JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    if let Err(err) = run(cli).await {
        error!("estimation failed: {err}");
        eprintln!("Error: {err:#}");
        print_hints(&err);
        std::process::exit(EXIT_FAILURE);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let model = cli
        .model_opt
        .clone()
        .or_else(|| cli.model.clone())
        .context("a model is required: pass it as the first argument or via --model")?;

    let provider = CachedProvider::new(RegistryProvider::from_env()?);
    let estimator = Estimator::new(provider);

    let request = EstimateRequest {
        model: model.clone(),
        vram_gb: Some(cli.vram),
        context_size: Some(cli.context),
        quant_level: Some(cli.quant.clone()),
        kv_cache: cli.kv_quant,
    };

    let estimate = estimator.estimate(&request).await?;
    let quant_table = estimator.quant_table(&model, cli.vram).await?;

    if cli.json {
        let payload = serde_json::json!({
            "estimate": estimate,
            "table": quant_table,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let color = !cli.no_color;
    println!("{}", table::render_quant_table(&quant_table, color));
    println!("{}", table::render_recommendations(&estimate));
    println!("{}", table::render_summary(&estimate));
    Ok(())
}

/// Print a follow-up suggestion for failures the user can act on.
/// Selection is by error variant, never by message text.
fn print_hints(err: &anyhow::Error) {
    let Some(err) = err.downcast_ref::<QuantfitError>() else {
        return;
    };
    match err {
        QuantfitError::ArchitectureUnavailable { model, .. } if model.contains(':') => {
            eprintln!();
            eprintln!("The model looks like an Ollama tag. Check that:");
            eprintln!("  1. the Ollama server is running (try 'ollama serve')");
            eprintln!("  2. OLLAMA_HOST points at it if it is not on localhost:11434");
            eprintln!("  3. the model is pulled (try 'ollama pull {model}')");
        }
        QuantfitError::ArchitectureNotFound { model } => {
            eprintln!();
            eprintln!("'{model}' did not resolve. Check the spelling; for gated or");
            eprintln!("private Hugging Face repos, set HUGGINGFACE_TOKEN.");
        }
        QuantfitError::UnknownQuantisation { .. } => {
            eprintln!();
            eprintln!("Valid quantisation levels are GGUF scheme names (e.g. Q4_K_M,");
            eprintln!("Q5_K_S, IQ2_M) or a numeric bits-per-weight value such as 4.85.");
        }
        _ => {}
    }
}

fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
