//! Anthropic messages API client for the LLM reply strategy

use anyhow::{bail, Context, Result};
use serde_json::json;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MODEL: &str = "claude-sonnet-4-5-20250929";
const MAX_TOKENS: u32 = 500;

pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Send one user prompt and return the completion text.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": MODEL,
            "max_tokens": MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });

        tracing::debug!("LLM POST {}", MESSAGES_URL);
        let resp = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .context("LLM request failed")?;

        let status = resp.status();
        let payload: serde_json::Value =
            resp.json().await.context("LLM response was not JSON")?;
        if !status.is_success() {
            bail!("LLM endpoint returned HTTP {}: {}", status.as_u16(), payload);
        }

        payload["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("LLM response missing content text: {}", payload))
    }
}
