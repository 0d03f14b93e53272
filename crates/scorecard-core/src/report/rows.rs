use std::collections::HashMap;

use crate::codec::Row;
use crate::errors::{Result, ScorecardError};
use crate::model::{columns, CaseResult, TestCase};
use crate::storage::{RunStore, TestCatalog};

/// One row per case of the run's test set, in creation order, joined with the
/// run's result for that case. Cases without a result get empty/zero values.
pub fn rows_for_run(
    catalog: &dyn TestCatalog,
    runs: &dyn RunStore,
    run_id: i64,
) -> Result<Vec<Row>> {
    let run = runs
        .get_run(run_id)?
        .ok_or_else(|| ScorecardError::not_found("test run", run_id))?;

    let cases = catalog.list_cases(run.test_set_id)?;
    let results = runs.list_results(run.id)?;
    let by_case: HashMap<i64, &CaseResult> =
        results.iter().map(|r| (r.test_case_id, r)).collect();

    Ok(cases
        .iter()
        .map(|tc| export_row(tc, by_case.get(&tc.id).copied()))
        .collect())
}

pub fn export_row(tc: &TestCase, result: Option<&CaseResult>) -> Row {
    let mut row = Row::new();
    row.insert(columns::ID, tc.case_id.clone());
    row.insert(columns::INPUT, tc.input.clone());
    row.insert(columns::EXPECTED, tc.expected.clone());
    match result {
        Some(r) => {
            row.insert(columns::ACTUAL, r.actual.clone());
            row.insert(columns::SCORE, format_score(r.score));
            row.insert(columns::REASONING, r.reasoning.clone());
        }
        None => {
            row.insert(columns::ACTUAL, "");
            row.insert(columns::SCORE, format_score(0.0));
            row.insert(columns::REASONING, "");
        }
    }
    for (k, v) in &tc.extra {
        row.insert(k.clone(), v.clone());
    }
    row
}

fn format_score(score: f64) -> String {
    score.to_string()
}
