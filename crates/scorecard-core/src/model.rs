use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::codec::Row;

/// Column names with fixed meaning in uploaded and exported files.
pub mod columns {
    pub const ID: &str = "id";
    pub const INPUT: &str = "input";
    pub const EXPECTED: &str = "expected";
    pub const ACTUAL: &str = "actual";
    pub const SCORE: &str = "score";
    pub const REASONING: &str = "reasoning";

    pub const REQUIRED: [&str; 3] = [ID, INPUT, EXPECTED];
    /// Never carried into a test case's extra columns.
    pub const RESERVED: [&str; 6] = [ID, INPUT, EXPECTED, ACTUAL, SCORE, REASONING];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSet {
    pub id: i64,
    pub name: String,
    pub filename: String,
    pub project: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTestSet {
    pub name: String,
    pub filename: String,
    pub project: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub test_set_id: i64,
    pub case_id: String,
    pub input: String,
    pub expected: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl TestCase {
    /// The row handed to the answerer and used as the base of export rows.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert(columns::ID, self.case_id.clone());
        row.insert(columns::INPUT, self.input.clone());
        row.insert(columns::EXPECTED, self.expected.clone());
        for (k, v) in &self.extra {
            row.insert(k.clone(), v.clone());
        }
        row
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTestCase {
    pub case_id: String,
    pub input: String,
    pub expected: String,
    pub extra: BTreeMap<String, String>,
}

impl NewTestCase {
    /// Splits a validated row into the fixed fields and the preserved extras.
    pub fn from_row(row: &Row) -> Self {
        let extra = row
            .iter()
            .filter(|(k, _)| !columns::RESERVED.contains(k))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            case_id: row.get(columns::ID).unwrap_or_default().trim().to_string(),
            input: row.get(columns::INPUT).unwrap_or_default().to_string(),
            expected: row.get(columns::EXPECTED).unwrap_or_default().to_string(),
            extra,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    pub id: i64,
    pub test_set_id: i64,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of one test case within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub id: i64,
    pub test_run_id: i64,
    pub test_case_id: i64,
    pub actual: String,
    pub score: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCaseResult {
    pub test_run_id: i64,
    pub test_case_id: i64,
    pub actual: String,
    pub score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub test_run_id: i64,
    pub test_set_id: i64,
    pub status: RunStatus,
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub test_set_id: i64,
    pub name: String,
    pub filename: String,
    pub project: Option<String>,
    pub test_case_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSetDetail {
    #[serde(flatten)]
    pub set: TestSet,
    pub test_case_count: usize,
    pub cases: Vec<TestCase>,
}

pub const DEFAULT_LIST_LIMIT: usize = 200;
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct TestSetFilter {
    pub keywords: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl TestSetFilter {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    pub fn keywords(&self) -> Option<&str> {
        self.keywords
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
