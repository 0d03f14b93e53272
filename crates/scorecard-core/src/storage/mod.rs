//! Persistence seams used by the orchestrator and the service facade.

use crate::errors::Result;
use crate::model::{
    CaseResult, NewCaseResult, NewTestCase, NewTestSet, RunStatus, TestCase, TestRun, TestSet,
    TestSetFilter,
};

pub mod schema;
pub mod store;

pub use store::Store;

/// Test sets and their cases.
pub trait TestCatalog: Send + Sync {
    /// Inserts the set and all of its cases atomically. A duplicate case id
    /// fails the whole insert.
    fn create_test_set(&self, set: &NewTestSet, cases: &[NewTestCase]) -> Result<TestSet>;

    fn get_test_set(&self, id: i64) -> Result<Option<TestSet>>;

    /// Newest first.
    fn list_test_sets(&self, filter: &TestSetFilter) -> Result<Vec<TestSet>>;

    /// Creation order.
    fn list_cases(&self, test_set_id: i64) -> Result<Vec<TestCase>>;

    fn count_cases(&self, test_set_id: i64) -> Result<usize>;
}

/// Test runs and their per-case results.
pub trait RunStore: Send + Sync {
    /// Creates a run directly in `running`.
    fn create_run(&self, test_set_id: i64) -> Result<TestRun>;

    /// Moves a `running` run to a terminal status and stamps `completed_at`.
    fn finalize_run(&self, run_id: i64, status: RunStatus) -> Result<TestRun>;

    fn get_run(&self, run_id: i64) -> Result<Option<TestRun>>;

    /// Newest first.
    fn list_runs(&self, test_set_id: i64) -> Result<Vec<TestRun>>;

    /// Fails with `Duplicate` if the run already has a result for the case.
    fn insert_result(&self, result: &NewCaseResult) -> Result<CaseResult>;

    /// Insertion order.
    fn list_results(&self, run_id: i64) -> Result<Vec<CaseResult>>;
}
