use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use scorecard_core::providers::llm::LlmClient;
use scorecard_core::providers::{Score, Scorer};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You grade answers produced by an automated assistant. \
Compare the ANSWER with the EXPECTED answer for the given INPUT. \
Reply with a single JSON object: {\"score\": <number between 0 and 1>, \"reasoning\": \"<one or two sentences>\"}.";

#[derive(Debug, Deserialize)]
struct Verdict {
    score: f64,
    #[serde(default)]
    reasoning: String,
}

/// Asks an LLM to grade the answer. The reply must contain a JSON verdict;
/// anything else is an error and the case is recorded as failed.
pub struct JudgeScorer {
    client: Arc<dyn LlmClient>,
}

impl JudgeScorer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Scorer for JudgeScorer {
    fn name(&self) -> &'static str {
        "judge"
    }

    async fn score(&self, input: &str, expected: &str, actual: &str) -> anyhow::Result<Score> {
        let prompt = format!(
            "INPUT:\n{}\n\nEXPECTED:\n{}\n\nANSWER:\n{}\n",
            input, expected, actual
        );
        let resp = self.client.complete(Some(SYSTEM_PROMPT), &prompt).await?;
        let verdict = parse_verdict(&resp.text)
            .with_context(|| format!("judge {} returned an unusable verdict", resp.model))?;

        tracing::debug!(
            event = "scorecard.judge.verdict",
            provider = %resp.provider,
            model = %resp.model,
            score = verdict.score,
        );

        Ok(Score {
            score: verdict.score.clamp(0.0, 1.0),
            reasoning: verdict.reasoning,
        })
    }
}

fn parse_verdict(text: &str) -> anyhow::Result<Verdict> {
    // Models like to wrap JSON in prose or code fences.
    let re = Regex::new(r"(?s)\{.*\}")?;
    let json = re
        .find(text)
        .map(|m| m.as_str())
        .ok_or_else(|| anyhow::anyhow!("no JSON object in reply: {}", text.trim()))?;
    Ok(serde_json::from_str(json)?)
}
