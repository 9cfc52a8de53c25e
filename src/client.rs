use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::history::Message;

// ── Completion seam ───────────────────────────────────────────────────────────

/// One blocking-from-the-caller's-view completion request.
///
/// Implementations receive the full conversation and return the reply text.
/// A blank reply with no error must be reported as [`ChatError::EmptyResponse`].
pub trait ChatCompletion: Send + Sync + 'static {
    fn complete(
        &self,
        model: &str,
        history: &[Message],
    ) -> impl Future<Output = Result<String>> + Send;
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// OpenAI-compatible `/v1/chat/completions` client.
pub struct Client {
    http: reqwest::Client,
    pub endpoint: String,
    api_key: Option<String>,
}

impl Client {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key: None,
        }
    }

    pub fn set_api_key(&mut self, key: String) {
        self.api_key = Some(key);
    }

    fn url(&self) -> String {
        format!("{}/v1/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

impl ChatCompletion for Client {
    async fn complete(&self, model: &str, history: &[Message]) -> Result<String> {
        let body = ChatRequest { model, messages: history };

        let mut req = self
            .http
            .post(self.url())
            .header("Content-Type", "application/json")
            .json(&body);

        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        tracing::debug!(model, turns = history.len(), "sending completion request");
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, body }.into());
        }

        let parsed: ChatResponse = resp.json().await?;
        Ok(first_reply(parsed)?)
    }
}

/// Trimmed content of the first choice.
fn first_reply(resp: ChatResponse) -> Result<String, ChatError> {
    let text = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(ChatError::EmptyResponse);
    }
    Ok(text)
}
