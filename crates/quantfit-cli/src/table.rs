//! Terminal rendering of the quantisation footprint matrix.
//!
//! The core hands over numbers only; everything about layout and colour
//! lives here. Cells that fit the budget render green, the rest red. For
//! contexts of 16K and above each cell carries the q8_0 and q4_0 KV-cache
//! variants in parentheses after the fp16 figure; below that threshold the
//! KV cache is too small for the distinction to matter.

use console::style;
use quantfit_core::sweep::ContextFootprint;
use quantfit_core::{QuantTable, VramEstimate, RECOMMENDATION_CONTEXTS};
use std::fmt::Write as _;

/// Context size at and above which the KV-cache variants are shown.
const KV_VARIANT_THRESHOLD: u32 = 16384;

fn context_label(context: u32) -> String {
    format!("{}K", context / 1024)
}

/// One rendered cell: colour codes applied, plus the visible width so the
/// column layout is computed on what the terminal actually shows.
struct Cell {
    text: String,
    width: usize,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let width = text.chars().count();
        Cell { text, width }
    }
}

fn paint(vram: f64, budget_gb: f64, color: bool) -> (String, usize) {
    let text = format!("{vram:.1}");
    let width = text.chars().count();
    if !color {
        return (text, width);
    }
    let styled = if vram <= budget_gb {
        style(text).green()
    } else {
        style(text).red()
    };
    (styled.to_string(), width)
}

fn footprint_cell(context: u32, cell: &ContextFootprint, budget_gb: f64, color: bool) -> Cell {
    let (fp16, fp16_w) = paint(cell.fp16, budget_gb, color);
    if context < KV_VARIANT_THRESHOLD {
        return Cell { text: fp16, width: fp16_w };
    }
    let (q8, q8_w) = paint(cell.q8_0, budget_gb, color);
    let (q4, q4_w) = paint(cell.q4_0, budget_gb, color);
    Cell { text: format!("{fp16}({q8},{q4})"), width: fp16_w + q8_w + q4_w + 3 }
}

/// Render the footprint matrix as an aligned text table.
pub fn render_quant_table(table: &QuantTable, color: bool) -> String {
    let mut header: Vec<Cell> = vec![Cell::plain("QUANT"), Cell::plain("BPW")];
    header.extend(RECOMMENDATION_CONTEXTS.iter().map(|&c| Cell::plain(context_label(c))));

    let mut grid: Vec<Vec<Cell>> = vec![header];
    for row in &table.rows {
        let mut cells = vec![Cell::plain(row.quant), Cell::plain(format!("{:.2}", row.bpw))];
        for &context in &RECOMMENDATION_CONTEXTS {
            match row.contexts.get(&context) {
                Some(cell) => cells.push(footprint_cell(context, cell, table.budget_gb, color)),
                None => cells.push(Cell::plain("-")),
            }
        }
        grid.push(cells);
    }

    let columns = grid[0].len();
    let mut widths = vec![0usize; columns];
    for row in &grid {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width);
        }
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "VRAM estimates for {} (budget {:.1} GB, fp16 KV cache; 16K+ columns show q8_0/q4_0 variants)",
        table.model_id, table.budget_gb
    );
    for (n, row) in grid.iter().enumerate() {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            let pad = widths[i] - cell.width;
            line.push_str(&cell.text);
            line.push_str(&" ".repeat(pad));
            if i + 1 < columns {
                line.push_str("  ");
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
        if n == 0 {
            let total: usize = widths.iter().sum::<usize>() + 2 * (columns - 1);
            out.push_str(&"-".repeat(total));
            out.push('\n');
        }
    }
    out
}

/// Render the per-context best-quantisation recommendations.
pub fn render_recommendations(estimate: &VramEstimate) -> String {
    let mut out = String::from("Maximum quantisation per context size:\n");
    for (&context, best) in &estimate.recommendations {
        let marker = if context == estimate.context_size { " (requested)" } else { "" };
        let quant = best.as_deref().unwrap_or("none fits");
        let _ = writeln!(out, "  {:>6}{}: {}", context, marker, quant);
    }
    out
}

/// Render the summary block of an estimation.
pub fn render_summary(estimate: &VramEstimate) -> String {
    let fits = if estimate.fits_available { "yes" } else { "no" };
    let max_quant = estimate.max_quant.as_deref().unwrap_or("none fits");
    format!(
        "Model: {}\n\
         Estimated VRAM at context {}: {:.2} GB\n\
         Fits available VRAM ({:.2} GB): {}\n\
         Max context at {} ({} KV cache): {}\n\
         Max quantisation at context {}: {}\n",
        estimate.model_id,
        estimate.context_size,
        estimate.estimated_vram_gb,
        estimate.available_vram_gb,
        fits,
        estimate.quant_level,
        estimate.kv_cache_quant,
        estimate.max_context_size,
        estimate.context_size,
        max_quant,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantfit_core::sweep::quant_table;
    use quantfit_core::ModelArchitecture;

    fn llama_7b() -> ModelArchitecture {
        ModelArchitecture {
            model_id: "meta-llama/Llama-2-7b-hf".to_string(),
            params_billions: 7.0,
            max_position_embeddings: 65536,
            num_layers: 32,
            hidden_size: 4096,
            num_attention_heads: 32,
            num_key_value_heads: 32,
            intermediate_size: 11008,
            vocab_size: 32000,
        }
    }

    #[test]
    fn table_has_a_row_per_scheme_and_aligned_columns() {
        let table = quant_table(&llama_7b(), 24.0);
        let rendered = render_quant_table(&table, false);
        let lines: Vec<&str> = rendered.lines().collect();

        // title + header + separator + one line per scheme
        assert_eq!(lines.len(), 3 + table.rows.len());
        assert!(lines[1].starts_with("QUANT"));
        assert!(lines[1].contains("2K"));
        assert!(lines[1].contains("64K"));
    }

    #[test]
    fn kv_variants_only_appear_from_16k_up() {
        let table = quant_table(&llama_7b(), 24.0);
        let row = &table.rows[0];
        let below = footprint_cell(8192, &row.contexts[&8192], 24.0, false);
        let above = footprint_cell(16384, &row.contexts[&16384], 24.0, false);
        assert!(!below.text.contains('('));
        assert!(above.text.contains('(') && above.text.contains(','));
    }

    #[test]
    fn colored_cells_report_visible_width() {
        let cell = ContextFootprint { fp16: 10.0, q8_0: 8.0, q4_0: 7.0 };
        let plain = footprint_cell(16384, &cell, 24.0, false);
        let colored = footprint_cell(16384, &cell, 24.0, true);
        assert_eq!(plain.width, colored.width);
        assert_eq!(plain.width, plain.text.chars().count());
    }

    #[test]
    fn context_labels_are_kilo_tokens() {
        assert_eq!(context_label(2048), "2K");
        assert_eq!(context_label(65536), "64K");
        assert_eq!(context_label(49152), "48K");
    }
}
