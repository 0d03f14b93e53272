pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS test_sets (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  filename TEXT NOT NULL,
  project TEXT,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS test_cases (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  test_set_id INTEGER NOT NULL REFERENCES test_sets(id) ON DELETE CASCADE,
  case_id TEXT NOT NULL,
  input TEXT NOT NULL,
  expected TEXT NOT NULL,
  extra_json TEXT,
  created_at TEXT NOT NULL,
  UNIQUE(test_set_id, case_id)
);

CREATE TABLE IF NOT EXISTS test_runs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  test_set_id INTEGER NOT NULL REFERENCES test_sets(id) ON DELETE CASCADE,
  status TEXT NOT NULL CHECK (status IN ('pending', 'running', 'completed', 'failed')),
  created_at TEXT NOT NULL,
  completed_at TEXT
);

CREATE TABLE IF NOT EXISTS results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  test_run_id INTEGER NOT NULL REFERENCES test_runs(id) ON DELETE CASCADE,
  test_case_id INTEGER NOT NULL,
  actual TEXT NOT NULL DEFAULT '',
  score REAL NOT NULL DEFAULT 0,
  reasoning TEXT NOT NULL DEFAULT '',
  created_at TEXT NOT NULL,
  UNIQUE(test_run_id, test_case_id)
);

CREATE INDEX IF NOT EXISTS idx_test_cases_set ON test_cases(test_set_id, id);
CREATE INDEX IF NOT EXISTS idx_test_runs_set ON test_runs(test_set_id, id);
CREATE INDEX IF NOT EXISTS idx_results_run ON results(test_run_id);
"#;
