//! Thin client for the Telegram Bot HTTP API (long polling)

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::json;

const API_BASE: &str = "https://api.telegram.org";

/// Extra headroom over the long-poll window before reqwest gives up.
const POLL_GRACE_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("{}/bot{}", API_BASE, bot_token),
        }
    }

    /// Long-poll for updates after `offset`, holding the request open for
    /// up to `poll_secs`.
    pub async fn get_updates(&self, offset: i64, poll_secs: u64) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.base);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", poll_secs.to_string()),
            ])
            .timeout(Duration::from_secs(poll_secs + POLL_GRACE_SECS))
            .send()
            .await
            .context("getUpdates request failed")?;

        let reply: ApiReply<Vec<Update>> =
            resp.json().await.context("getUpdates: invalid JSON")?;
        if !reply.ok {
            bail!(
                "getUpdates rejected: {}",
                reply.description.unwrap_or_default()
            );
        }
        Ok(reply.result.unwrap_or_default())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("{}/sendMessage", self.base);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .context("sendMessage request failed")?;

        let reply: ApiReply<serde_json::Value> =
            resp.json().await.context("sendMessage: invalid JSON")?;
        if !reply.ok {
            bail!(
                "sendMessage rejected: {}",
                reply.description.unwrap_or_default()
            );
        }
        Ok(())
    }

    /// Show the "typing..." indicator while a reply is being composed.
    pub async fn send_typing(&self, chat_id: i64) -> Result<()> {
        let url = format!("{}/sendChatAction", self.base);
        self.http
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "action": "typing" }))
            .send()
            .await
            .context("sendChatAction request failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_text_update() {
        let raw = r#"{
            "ok": true,
            "result": [
                { "update_id": 42,
                  "message": { "message_id": 7,
                               "chat": { "id": 1001, "type": "private" },
                               "text": "top 3 in Dubai" } },
                { "update_id": 43,
                  "message": { "message_id": 8,
                               "chat": { "id": 1001, "type": "private" } } }
            ]
        }"#;
        let reply: ApiReply<Vec<Update>> = serde_json::from_str(raw).unwrap();
        assert!(reply.ok);
        let updates = reply.result.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].update_id, 42);
        assert_eq!(
            updates[0].message.as_ref().unwrap().text.as_deref(),
            Some("top 3 in Dubai")
        );
        // Non-text messages still parse; the dispatcher skips them.
        assert!(updates[1].message.as_ref().unwrap().text.is_none());
    }

    #[test]
    fn surfaces_api_rejections() {
        let raw = r#"{ "ok": false, "description": "Unauthorized" }"#;
        let reply: ApiReply<Vec<Update>> = serde_json::from_str(raw).unwrap();
        assert!(!reply.ok);
        assert_eq!(reply.description.as_deref(), Some("Unauthorized"));
    }
}
