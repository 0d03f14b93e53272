use crate::errors::{Result, ScorecardError};
use crate::model::{
    CaseResult, NewCaseResult, NewTestCase, NewTestSet, RunStatus, TestCase, TestRun, TestSet,
    TestSetFilter,
};
use crate::storage::{RunStore, TestCatalog};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row as SqlRow};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SET_COLUMNS: &str = "id, name, filename, project, created_at";
const CASE_COLUMNS: &str = "id, test_set_id, case_id, input, expected, extra_json, created_at";
const RUN_COLUMNS: &str = "id, test_set_id, status, created_at, completed_at";
const RESULT_COLUMNS: &str = "id, test_run_id, test_case_id, actual, score, reasoning, created_at";

/// SQLite-backed catalog and run store.
#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::prepare(Connection::open(path)?)
    }

    pub fn memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        // SQLite's lower() and LIKE only fold ASCII.
        conn.create_scalar_function(
            "casefold",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub fn count_rows(&self, table: &str) -> Result<i64> {
        if !["test_sets", "test_cases", "test_runs", "results"].contains(&table) {
            return Err(ScorecardError::Other(anyhow::anyhow!(
                "invalid table name for count_rows: {}",
                table
            )));
        }
        let conn = self.conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        Ok(conn.query_row(&sql, [], |r| r.get(0))?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ScorecardError::Other(anyhow::anyhow!("store connection lock poisoned")))
    }
}

impl TestCatalog for Store {
    fn create_test_set(&self, set: &NewTestSet, cases: &[NewTestCase]) -> Result<TestSet> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created_at = Utc::now();
        let stamp = to_text(&created_at);

        tx.execute(
            "INSERT INTO test_sets(name, filename, project, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![set.name, set.filename, set.project, stamp],
        )?;
        let set_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO test_cases(test_set_id, case_id, input, expected, extra_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for case in cases {
                let extra = if case.extra.is_empty() {
                    None
                } else {
                    Some(serde_json::to_string(&case.extra).map_err(anyhow::Error::from)?)
                };
                stmt.execute(params![
                    set_id,
                    case.case_id,
                    case.input,
                    case.expected,
                    extra,
                    stamp
                ])
                .map_err(|e| {
                    unique_violation(e, || format!("test case id '{}' in test set", case.case_id))
                })?;
            }
        }

        tx.commit()?;
        Ok(TestSet {
            id: set_id,
            name: set.name.clone(),
            filename: set.filename.clone(),
            project: set.project.clone(),
            created_at,
        })
    }

    fn get_test_set(&self, id: i64) -> Result<Option<TestSet>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {SET_COLUMNS} FROM test_sets WHERE id = ?1");
        Ok(conn.query_row(&sql, params![id], map_set).optional()?)
    }

    fn list_test_sets(&self, filter: &TestSetFilter) -> Result<Vec<TestSet>> {
        let conn = self.conn()?;
        let needle = filter.keywords().map(str::to_lowercase);
        let sql = format!(
            "SELECT {SET_COLUMNS} FROM test_sets
             WHERE ?1 IS NULL
                OR instr(casefold(name), ?1) > 0
                OR instr(casefold(filename), ?1) > 0
                OR instr(casefold(IFNULL(project, '')), ?1) > 0
             ORDER BY id DESC
             LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    needle,
                    filter.effective_limit() as i64,
                    filter.offset as i64
                ],
                map_set,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn list_cases(&self, test_set_id: i64) -> Result<Vec<TestCase>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {CASE_COLUMNS} FROM test_cases WHERE test_set_id = ?1 ORDER BY id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![test_set_id], map_case)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn count_cases(&self, test_set_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM test_cases WHERE test_set_id = ?1",
            params![test_set_id],
            |r| r.get(0),
        )?;
        Ok(n as usize)
    }
}

impl RunStore for Store {
    fn create_run(&self, test_set_id: i64) -> Result<TestRun> {
        let conn = self.conn()?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO test_runs(test_set_id, status, created_at) VALUES (?1, ?2, ?3)",
            params![test_set_id, RunStatus::Running.as_str(), to_text(&created_at)],
        )?;
        Ok(TestRun {
            id: conn.last_insert_rowid(),
            test_set_id,
            status: RunStatus::Running,
            created_at,
            completed_at: None,
        })
    }

    fn finalize_run(&self, run_id: i64, status: RunStatus) -> Result<TestRun> {
        if !status.is_terminal() {
            return Err(ScorecardError::InvalidTransition {
                run_id,
                from: RunStatus::Running.to_string(),
                to: status.to_string(),
            });
        }

        let changed = {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE test_runs SET status = ?1, completed_at = ?2 WHERE id = ?3 AND status = 'running'",
                params![status.as_str(), to_text(&Utc::now()), run_id],
            )?
        };

        let run = self
            .get_run(run_id)?
            .ok_or_else(|| ScorecardError::not_found("test run", run_id))?;
        if changed == 0 {
            return Err(ScorecardError::InvalidTransition {
                run_id,
                from: run.status.to_string(),
                to: status.to_string(),
            });
        }
        Ok(run)
    }

    fn get_run(&self, run_id: i64) -> Result<Option<TestRun>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {RUN_COLUMNS} FROM test_runs WHERE id = ?1");
        Ok(conn.query_row(&sql, params![run_id], map_run).optional()?)
    }

    fn list_runs(&self, test_set_id: i64) -> Result<Vec<TestRun>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {RUN_COLUMNS} FROM test_runs WHERE test_set_id = ?1 ORDER BY id DESC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![test_set_id], map_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert_result(&self, result: &NewCaseResult) -> Result<CaseResult> {
        let conn = self.conn()?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO results(test_run_id, test_case_id, actual, score, reasoning, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                result.test_run_id,
                result.test_case_id,
                result.actual,
                result.score,
                result.reasoning,
                to_text(&created_at)
            ],
        )
        .map_err(|e| {
            unique_violation(e, || {
                format!(
                    "result for test case {} in test run {}",
                    result.test_case_id, result.test_run_id
                )
            })
        })?;

        Ok(CaseResult {
            id: conn.last_insert_rowid(),
            test_run_id: result.test_run_id,
            test_case_id: result.test_case_id,
            actual: result.actual.clone(),
            score: result.score,
            reasoning: result.reasoning.clone(),
            created_at,
        })
    }

    fn list_results(&self, run_id: i64) -> Result<Vec<CaseResult>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {RESULT_COLUMNS} FROM results WHERE test_run_id = ?1 ORDER BY id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![run_id], map_result)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn unique_violation(err: rusqlite::Error, what: impl FnOnce() -> String) -> ScorecardError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            ScorecardError::Duplicate(what())
        }
        _ => ScorecardError::Storage(err),
    }
}

fn to_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn timestamp(row: &SqlRow<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_timestamp(row: &SqlRow<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(_) => timestamp(row, idx).map(Some),
    }
}

fn map_set(row: &SqlRow<'_>) -> rusqlite::Result<TestSet> {
    Ok(TestSet {
        id: row.get(0)?,
        name: row.get(1)?,
        filename: row.get(2)?,
        project: row.get(3)?,
        created_at: timestamp(row, 4)?,
    })
}

fn map_case(row: &SqlRow<'_>) -> rusqlite::Result<TestCase> {
    let extra: BTreeMap<String, String> = match row.get::<_, Option<String>>(5)? {
        Some(s) if !s.trim().is_empty() => serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
        _ => BTreeMap::new(),
    };
    Ok(TestCase {
        id: row.get(0)?,
        test_set_id: row.get(1)?,
        case_id: row.get(2)?,
        input: row.get(3)?,
        expected: row.get(4)?,
        extra,
        created_at: timestamp(row, 6)?,
    })
}

fn map_run(row: &SqlRow<'_>) -> rusqlite::Result<TestRun> {
    let raw: String = row.get(2)?;
    let status = RunStatus::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown run status '{raw}'").into(),
        )
    })?;
    Ok(TestRun {
        id: row.get(0)?,
        test_set_id: row.get(1)?,
        status,
        created_at: timestamp(row, 3)?,
        completed_at: opt_timestamp(row, 4)?,
    })
}

fn map_result(row: &SqlRow<'_>) -> rusqlite::Result<CaseResult> {
    Ok(CaseResult {
        id: row.get(0)?,
        test_run_id: row.get(1)?,
        test_case_id: row.get(2)?,
        actual: row.get(3)?,
        score: row.get(4)?,
        reasoning: row.get(5)?,
        created_at: timestamp(row, 6)?,
    })
}
