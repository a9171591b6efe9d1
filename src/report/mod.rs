//! Comparison table and JSON export of a finished [`ResultMatrix`].

use std::path::Path;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::core::BenchError;
use crate::scenario::{BackendOutcome, MatrixEntry, Outcome, ResultMatrix};

const HEADER: [&str; 10] = [
    "Size",
    "Batch",
    "Operation",
    "Backend",
    "Ops/sec",
    "Avg Latency (ms)",
    "Total Time (s)",
    "Preload (s)",
    "Backend Mem",
    "Status",
];

/// One row per backend outcome, in sweep order.
pub fn render(matrix: &ResultMatrix) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(HEADER.to_vec());

    for entry in matrix.entries() {
        for outcome in &entry.outcomes {
            table.add_row(row(entry, outcome));
        }
    }
    table.to_string()
}

fn row(entry: &MatrixEntry, outcome: &BackendOutcome) -> Vec<Cell> {
    let mut cells = vec![
        Cell::new(entry.key.dataset_size),
        Cell::new(
            entry
                .key
                .batch_size
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        Cell::new(entry.key.operation),
        Cell::new(&outcome.backend),
    ];
    match &outcome.outcome {
        Outcome::Completed(result) => {
            cells.extend([
                Cell::new(format!("{:.0}", result.ops_per_second)),
                Cell::new(format!("{:.3}", result.avg_latency_ms)),
                Cell::new(format!("{:.2}", result.duration_ms / 1000.0)),
                Cell::new(
                    result
                        .preload
                        .map(|p| format!("{:.2}", p.duration_ms / 1000.0))
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(
                    result
                        .backend_memory_delta
                        .map(format_signed_bytes)
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(format!("ok ({})", result.fanout)),
            ]);
        }
        Outcome::Failed { reason } => {
            cells.extend((0..5).map(|_| Cell::new("-")));
            cells.push(Cell::new(format!("FAILED: {reason}")).fg(Color::Red));
        }
    }
    cells
}

pub fn format_signed_bytes(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let sign = if bytes < 0 { "-" } else { "+" };
    let mut value = bytes.unsigned_abs() as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{sign}{value:.0} {}", UNITS[unit])
    } else {
        format!("{sign}{value:.2} {}", UNITS[unit])
    }
}

pub fn to_json(matrix: &ResultMatrix) -> Result<String, BenchError> {
    Ok(serde_json::to_string_pretty(matrix)?)
}

pub fn write_json(matrix: &ResultMatrix, path: &Path) -> Result<(), BenchError> {
    std::fs::write(path, to_json(matrix)?)?;
    Ok(())
}
