//! Entry points for callers: upload, browse, run and export.

use std::sync::Arc;

use crate::codec::{self, Row, TableFormat};
use crate::engine::Runner;
use crate::errors::{Result, ScorecardError};
use crate::model::{
    NewTestCase, NewTestSet, RunSummary, TestRun, TestSet, TestSetDetail, TestSetFilter,
    UploadSummary,
};
use crate::report::{self, ExportFile, ExportFormat};
use crate::storage::{RunStore, Store, TestCatalog};

#[derive(Clone)]
pub struct TestsService {
    catalog: Arc<dyn TestCatalog>,
    runs: Arc<dyn RunStore>,
    runner: Option<Runner>,
}

impl TestsService {
    pub fn new(catalog: Arc<dyn TestCatalog>, runs: Arc<dyn RunStore>) -> Self {
        Self {
            catalog,
            runs,
            runner: None,
        }
    }

    pub fn from_store(store: Store) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store)
    }

    /// Enables [`TestsService::run_test_set`].
    pub fn with_runner(mut self, runner: Runner) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Parses and validates the whole file before anything is stored; the set
    /// and its cases are then written in one transaction.
    pub fn upload_test_set(
        &self,
        bytes: &[u8],
        filename: &str,
        name: Option<&str>,
        project: Option<&str>,
    ) -> Result<UploadSummary> {
        let format = TableFormat::from_filename(filename)?;
        let rows = codec::parse_validated_test_rows_as(bytes, format)?;
        let cases: Vec<NewTestCase> = rows.iter().map(NewTestCase::from_row).collect();

        let new_set = NewTestSet {
            name: non_blank(name).unwrap_or(filename).to_string(),
            filename: filename.to_string(),
            project: non_blank(project).map(str::to_string),
        };
        let set = self.catalog.create_test_set(&new_set, &cases)?;
        let stored = self.catalog.count_cases(set.id)?;

        tracing::info!(
            event = "scorecard.upload",
            test_set_id = set.id,
            filename = %set.filename,
            cases = stored,
        );

        Ok(UploadSummary {
            test_set_id: set.id,
            name: set.name,
            filename: set.filename,
            project: set.project,
            test_case_count: stored,
        })
    }

    pub fn list_test_sets(&self, filter: &TestSetFilter) -> Result<Vec<TestSet>> {
        self.catalog.list_test_sets(filter)
    }

    pub fn get_test_set(&self, id: i64) -> Result<TestSetDetail> {
        let set = self
            .catalog
            .get_test_set(id)?
            .ok_or_else(|| ScorecardError::not_found("test set", id))?;
        let cases = self.catalog.list_cases(set.id)?;
        Ok(TestSetDetail {
            set,
            test_case_count: cases.len(),
            cases,
        })
    }

    pub async fn run_test_set(&self, id: i64) -> Result<RunSummary> {
        let runner = self.runner.as_ref().ok_or_else(|| {
            ScorecardError::Config("no answerer/scorer configured for runs".into())
        })?;
        runner.execute(id).await
    }

    pub fn list_runs_for_set(&self, test_set_id: i64) -> Result<Vec<TestRun>> {
        self.runs.list_runs(test_set_id)
    }

    pub fn get_run(&self, run_id: i64) -> Result<TestRun> {
        self.runs
            .get_run(run_id)?
            .ok_or_else(|| ScorecardError::not_found("test run", run_id))
    }

    pub fn get_run_rows(&self, run_id: i64) -> Result<Vec<Row>> {
        report::rows_for_run(self.catalog.as_ref(), self.runs.as_ref(), run_id)
    }

    pub fn download_run_rows(&self, run_id: i64, format: ExportFormat) -> Result<ExportFile> {
        let rows = self.get_run_rows(run_id)?;
        report::build_export(&rows, format, run_id)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
