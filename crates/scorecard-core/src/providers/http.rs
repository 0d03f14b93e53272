use super::{Answer, Answerer};
use crate::codec::Row;
use async_trait::async_trait;

/// Posts the case row as a JSON object and reads `answer` from the reply.
pub struct HttpAnswerer {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub client: reqwest::Client,
}

impl HttpAnswerer {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Answerer for HttpAnswerer {
    async fn respond(&self, row: &Row) -> anyhow::Result<Answer> {
        let mut req = self.client.post(&self.endpoint).json(row);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("answerer endpoint returned {}: {}", status, error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        parse_answer(&json)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn parse_answer(json: &serde_json::Value) -> anyhow::Result<Answer> {
    let answer = match json.get("answer") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => {
            anyhow::bail!("answerer response missing 'answer' field")
        }
        Some(other) => other.to_string(),
    };
    Ok(Answer { answer })
}
