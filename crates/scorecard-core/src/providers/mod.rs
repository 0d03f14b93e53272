//! Collaborator contracts for a run: something that answers, something that grades.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::codec::Row;

pub mod echo;
pub mod http;
pub mod llm;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub score: f64,
    pub reasoning: String,
}

/// The service under test. Receives the full case row (id, input, expected and extras).
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn respond(&self, row: &Row) -> anyhow::Result<Answer>;
    fn name(&self) -> &'static str;
}

/// Grades a produced answer against the expected one.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, input: &str, expected: &str, actual: &str) -> anyhow::Result<Score>;
    fn name(&self) -> &'static str;
}
