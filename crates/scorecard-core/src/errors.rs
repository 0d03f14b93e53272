use thiserror::Error;

pub type Result<T, E = ScorecardError> = std::result::Result<T, E>;

/// One row that failed required-field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    pub missing: Vec<&'static str>,
}

impl std::fmt::Display for RowIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: missing {}", self.row, self.missing.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum ScorecardError {
    #[error("unsupported file format '{0}' (expected csv, xlsx or xls)")]
    UnsupportedFormat(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("validation error: rows missing required fields (id, input, expected): {}", join_issues(.0))]
    Validation(Vec<RowIssue>),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("test set {0} has no test cases")]
    EmptyInput(i64),

    #[error("test set {0} already has a run in progress")]
    RunInProgress(i64),

    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("test run {run_id} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        run_id: i64,
        from: String,
        to: String,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScorecardError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Errors the caller can fix by changing the request rather than the environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::Format(_)
                | Self::Validation(_)
                | Self::NotFound { .. }
                | Self::EmptyInput(_)
                | Self::RunInProgress(_)
                | Self::Duplicate(_)
        )
    }
}

fn join_issues(issues: &[RowIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_row() {
        let err = ScorecardError::Validation(vec![
            RowIssue {
                row: 2,
                missing: vec!["expected"],
            },
            RowIssue {
                row: 5,
                missing: vec!["id", "input"],
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("row 2: missing expected"));
        assert!(msg.contains("row 5: missing id, input"));
        assert!(err.is_client_error());
    }

    #[test]
    fn storage_errors_are_not_client_errors() {
        let err = ScorecardError::from(rusqlite::Error::InvalidQuery);
        assert!(!err.is_client_error());
    }
}
