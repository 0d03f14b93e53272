use scorecard_core::codec::{self, TableFormat};
use scorecard_core::engine::Runner;
use scorecard_core::model::{NewCaseResult, RunStatus};
use scorecard_core::providers::echo::EchoAnswerer;
use scorecard_core::providers::{Score, Scorer};
use scorecard_core::report::{ExportFormat, XLSX_CONTENT_TYPE};
use scorecard_core::storage::{RunStore, Store};
use scorecard_core::{ScorecardError, TestsService};
use std::sync::Arc;

struct Fixed;

#[async_trait::async_trait]
impl Scorer for Fixed {
    async fn score(&self, _i: &str, _e: &str, _a: &str) -> anyhow::Result<Score> {
        Ok(Score {
            score: 0.5,
            reasoning: "half right".into(),
        })
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn service(store: &Store) -> TestsService {
    let shared = Arc::new(store.clone());
    let runner = Runner::new(
        shared.clone(),
        shared.clone(),
        Arc::new(EchoAnswerer),
        Arc::new(Fixed),
    );
    TestsService::new(shared.clone(), shared).with_runner(runner)
}

const CSV: &str = "id,input,expected,topic\n1,2+2?,4,math\n2,capital of France?,Paris,geo\n";

#[tokio::test]
async fn run_rows_join_cases_with_results() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let svc = service(&store);
    let set = svc.upload_test_set(CSV.as_bytes(), "mixed.csv", None, None)?;

    let summary = svc.run_test_set(set.test_set_id).await?;
    let rows = svc.get_run_rows(summary.test_run_id)?;
    assert_eq!(rows.len(), 2);

    let first = &rows[0];
    let keys: Vec<&str> = first.keys().collect();
    assert_eq!(
        keys,
        vec!["id", "input", "expected", "actual", "score", "reasoning", "topic"]
    );
    assert_eq!(first.get("actual"), Some("2+2?"));
    assert_eq!(first.get("score"), Some("0.5"));
    assert_eq!(first.get("reasoning"), Some("half right"));
    assert_eq!(rows[1].get("topic"), Some("geo"));
    Ok(())
}

#[tokio::test]
async fn cases_without_results_get_default_columns() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let svc = service(&store);
    let set = svc.upload_test_set(CSV.as_bytes(), "mixed.csv", None, None)?;

    // A run that stored only the first result before being aborted.
    let run = store.create_run(set.test_set_id)?;
    let cases = svc.get_test_set(set.test_set_id)?.cases;
    store.insert_result(&NewCaseResult {
        test_run_id: run.id,
        test_case_id: cases[0].id,
        actual: "4".into(),
        score: 1.0,
        reasoning: "match".into(),
    })?;
    store.finalize_run(run.id, RunStatus::Failed)?;

    let rows = svc.get_run_rows(run.id)?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("score"), Some("1"));
    assert_eq!(rows[1].get("actual"), Some(""));
    assert_eq!(rows[1].get("score"), Some("0"));
    assert_eq!(rows[1].get("reasoning"), Some(""));
    Ok(())
}

#[tokio::test]
async fn download_names_the_file_after_the_run() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let svc = service(&store);
    let set = svc.upload_test_set(CSV.as_bytes(), "mixed.csv", None, None)?;
    let summary = svc.run_test_set(set.test_set_id).await?;

    let csv = svc.download_run_rows(summary.test_run_id, ExportFormat::parse("CSV"))?;
    assert_eq!(
        csv.filename,
        format!("test-run-{}-results.csv", summary.test_run_id)
    );
    assert!(csv.content_type.starts_with("text/csv"));
    let back = codec::parse_rows_as(&csv.bytes, TableFormat::Delimited)?;
    assert_eq!(back, svc.get_run_rows(summary.test_run_id)?);

    let xlsx = svc.download_run_rows(summary.test_run_id, ExportFormat::parse("pdf"))?;
    assert_eq!(xlsx.content_type, XLSX_CONTENT_TYPE);
    assert!(xlsx.filename.ends_with(".xlsx"));
    let sheet = codec::parse_rows_as(&xlsx.bytes, TableFormat::Spreadsheet)?;
    assert_eq!(sheet.len(), 2);
    assert_eq!(sheet[1].get("expected"), Some("Paris"));
    Ok(())
}

#[test]
fn unknown_run_is_not_found() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let svc = service(&store);
    let err = svc.get_run_rows(7).unwrap_err();
    assert!(matches!(err, ScorecardError::NotFound { id: 7, .. }));
    assert!(matches!(
        svc.download_run_rows(7, ExportFormat::Csv),
        Err(ScorecardError::NotFound { .. })
    ));
    Ok(())
}
