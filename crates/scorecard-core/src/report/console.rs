use crate::codec::Row;
use crate::engine::ERROR_PREFIX;
use crate::model::{columns, RunSummary};

const INPUT_PREVIEW_CHARS: usize = 60;

pub fn print_run(summary: &RunSummary, rows: &[Row]) {
    eprintln!(
        "\nTest run #{} (test set #{}): {} cases",
        summary.test_run_id, summary.test_set_id, summary.total
    );

    for row in rows {
        let id = row.get(columns::ID).unwrap_or_default();
        let reasoning = row.get(columns::REASONING).unwrap_or_default();
        if let Some(err) = reasoning.strip_prefix(ERROR_PREFIX) {
            eprintln!("💥 {:<20} ERROR: {}", id, err);
            continue;
        }
        let score = row.get(columns::SCORE).unwrap_or("0");
        eprintln!(
            "✅ {:<20} {:>6}  {}",
            id,
            score,
            preview(row.get(columns::INPUT).unwrap_or_default())
        );
    }

    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!(
        "Summary: {} total, {} scored, {} failed ({})",
        summary.total, summary.success_count, summary.failed_count, summary.status
    );
    if let Some(avg) = mean_score(rows) {
        eprintln!("Mean score: {:.3}", avg);
    }
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > INPUT_PREVIEW_CHARS {
        let cut: String = line.chars().take(INPUT_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

/// Mean over rows that were scored without error.
pub fn mean_score(rows: &[Row]) -> Option<f64> {
    let scores: Vec<f64> = rows
        .iter()
        .filter(|r| {
            !r.get(columns::REASONING)
                .unwrap_or_default()
                .starts_with(ERROR_PREFIX)
        })
        .filter_map(|r| r.get(columns::SCORE)?.parse().ok())
        .collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}
