use super::{LlmClient, LlmResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned replies in order, then repeats the last one.
pub struct FakeClient {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
}

impl FakeClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(&self, _system: Option<&str>, _prompt: &str) -> anyhow::Result<LlmResponse> {
        let next = self
            .replies
            .lock()
            .map_err(|_| anyhow::anyhow!("fake client lock poisoned"))?
            .pop_front();
        let mut last = self
            .last
            .lock()
            .map_err(|_| anyhow::anyhow!("fake client lock poisoned"))?;
        let text = match next {
            Some(t) => {
                *last = Some(t.clone());
                t
            }
            None => last
                .clone()
                .ok_or_else(|| anyhow::anyhow!("fake client has no scripted replies"))?,
        };
        Ok(LlmResponse {
            text,
            provider: "fake".into(),
            model: "fake".into(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
