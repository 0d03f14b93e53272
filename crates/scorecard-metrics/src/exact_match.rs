use async_trait::async_trait;
use scorecard_core::providers::{Score, Scorer};

pub struct ExactMatchScorer;

#[async_trait]
impl Scorer for ExactMatchScorer {
    fn name(&self) -> &'static str {
        "exact"
    }

    async fn score(&self, _input: &str, expected: &str, actual: &str) -> anyhow::Result<Score> {
        if actual.trim() == expected.trim() {
            Ok(Score {
                score: 1.0,
                reasoning: "exact match".into(),
            })
        } else {
            Ok(Score {
                score: 0.0,
                reasoning: format!("expected '{}', got '{}'", expected.trim(), actual.trim()),
            })
        }
    }
}
