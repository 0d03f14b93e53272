use std::sync::Arc;

use scorecard_core::config::{ScorerConfig, ScorerKind};
use scorecard_core::providers::llm::openai::OpenAIClient;
use scorecard_core::providers::Scorer;
use scorecard_core::ScorecardError;

mod contains;
mod exact_match;
mod judge;

pub use contains::ContainsScorer;
pub use exact_match::ExactMatchScorer;
pub use judge::JudgeScorer;

/// Builds the scorer selected in config. The judge reads its API key from the
/// environment variable named by `scorer.api_key_env`.
pub fn build_scorer(cfg: &ScorerConfig) -> Result<Arc<dyn Scorer>, ScorecardError> {
    match cfg.kind {
        ScorerKind::Exact => Ok(Arc::new(ExactMatchScorer)),
        ScorerKind::Contains => Ok(Arc::new(ContainsScorer)),
        ScorerKind::Judge => {
            let api_key = std::env::var(&cfg.api_key_env).map_err(|_| {
                ScorecardError::Config(format!(
                    "scorer.kind 'judge' requires the {} environment variable",
                    cfg.api_key_env
                ))
            })?;
            let mut client = OpenAIClient::new(
                cfg.model.clone(),
                api_key,
                cfg.temperature,
                cfg.max_tokens,
            );
            if let Some(base_url) = &cfg.base_url {
                client = client.with_base_url(base_url.clone());
            }
            Ok(Arc::new(JudgeScorer::new(Arc::new(client))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_configured_scorer() {
        let exact = build_scorer(&ScorerConfig::default()).unwrap();
        assert_eq!(exact.name(), "exact");

        let contains = build_scorer(&ScorerConfig {
            kind: ScorerKind::Contains,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(contains.name(), "contains");
    }

    #[test]
    fn judge_without_key_is_a_config_error() {
        let cfg = ScorerConfig {
            kind: ScorerKind::Judge,
            api_key_env: "SCORECARD_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        assert!(matches!(build_scorer(&cfg), Err(ScorecardError::Config(_))));
    }
}
