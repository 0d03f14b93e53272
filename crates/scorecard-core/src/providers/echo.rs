use super::{Answer, Answerer};
use crate::codec::Row;
use crate::model::columns;
use async_trait::async_trait;

/// Answers every case with its own input. Useful for offline smoke runs.
pub struct EchoAnswerer;

#[async_trait]
impl Answerer for EchoAnswerer {
    async fn respond(&self, row: &Row) -> anyhow::Result<Answer> {
        Ok(Answer {
            answer: row.get(columns::INPUT).unwrap_or_default().to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}
