use async_trait::async_trait;
use scorecard_core::providers::{Score, Scorer};

/// Full credit when the answer mentions the expected text, ignoring case.
pub struct ContainsScorer;

#[async_trait]
impl Scorer for ContainsScorer {
    fn name(&self) -> &'static str {
        "contains"
    }

    async fn score(&self, _input: &str, expected: &str, actual: &str) -> anyhow::Result<Score> {
        let needle = expected.trim().to_lowercase();
        if actual.to_lowercase().contains(&needle) {
            Ok(Score {
                score: 1.0,
                reasoning: format!("answer contains '{}'", expected.trim()),
            })
        } else {
            Ok(Score {
                score: 0.0,
                reasoning: format!("missing substring: {}", expected.trim()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matches_case_insensitively() {
        let s = ContainsScorer;
        let hit = s
            .score("capital of France?", "paris", "The capital is Paris.")
            .await
            .unwrap();
        assert_eq!(hit.score, 1.0);

        let miss = s.score("q", "Lyon", "The capital is Paris.").await.unwrap();
        assert_eq!(miss.score, 0.0);
        assert_eq!(miss.reasoning, "missing substring: Lyon");
    }
}
