//! Chat dispatch: long-poll loop and pluggable reply strategies
//!
//! One dispatcher drives both bot variants. The deterministic listing
//! reply and the LLM-composed reply are [`ReplyStrategy`] implementations
//! over the same core rather than separate near-identical bots.

pub mod filter;
pub mod telegram;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::api::{fetch_properties, ErpClient, Property, DEFAULT_LIMIT};
use crate::llm::LlmClient;
use filter::extract_criteria;
use telegram::TelegramClient;

const BOT_NAME: &str = "Property Connect";
const POLL_SECS: u64 = 30;
const POLL_RETRY: Duration = Duration::from_secs(5);

const TOKEN_FAILURE_REPLY: &str =
    "Sorry, I couldn't reach the property system right now. Please try again later.";

/// Everything a reply strategy may consult.
pub struct BotContext {
    pub erp: ErpClient,
    pub record_type: String,
}

/// Composes the outbound reply for one inbound free-text message.
#[async_trait]
pub trait ReplyStrategy: Send + Sync {
    async fn reply(&self, text: &str, ctx: &BotContext) -> Result<String>;
}

/// Deterministic variant: parsed criteria straight to a rendered listing.
pub struct ListingReplier;

#[async_trait]
impl ReplyStrategy for ListingReplier {
    async fn reply(&self, text: &str, ctx: &BotContext) -> Result<String> {
        let criteria = extract_criteria(text);
        let properties = fetch_properties(
            &ctx.erp,
            &ctx.record_type,
            &criteria.filters,
            criteria.limit.unwrap_or(DEFAULT_LIMIT),
            criteria.sort_by_price,
        )
        .await?;
        Ok(render_listing(&properties))
    }
}

/// LLM variant: the matching listings and the user's question go to the
/// completion endpoint, whose text becomes the reply.
pub struct LlmReplier {
    llm: LlmClient,
}

impl LlmReplier {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ReplyStrategy for LlmReplier {
    async fn reply(&self, text: &str, ctx: &BotContext) -> Result<String> {
        let criteria = extract_criteria(text);
        let properties = fetch_properties(
            &ctx.erp,
            &ctx.record_type,
            &criteria.filters,
            criteria.limit.unwrap_or(DEFAULT_LIMIT),
            criteria.sort_by_price,
        )
        .await?;

        let prompt = format!(
            "You are {}, a real-estate assistant. Here are the currently \
             matching property listings:\n{}\nAnswer the user's question \
             using only these listings. Question: {}",
            BOT_NAME,
            render_listing(&properties),
            text
        );
        self.llm.ask(&prompt).await
    }
}

/// Render listings the way the chat reply shows them.
pub fn render_listing(properties: &[Property]) -> String {
    if properties.is_empty() {
        return "No properties found matching your criteria.".to_string();
    }
    let mut reply = String::from("Here are the top properties:\n");
    for p in properties {
        reply.push_str(&format!(
            "- {} ({}): ${}, {} sqm, {}BR/{}BA\n",
            p.name, p.location, p.price, p.area, p.bedrooms, p.bathrooms
        ));
    }
    reply
}

/// Long-lived message loop over the Telegram long-poll API.
pub struct Dispatcher {
    telegram: TelegramClient,
    strategy: Box<dyn ReplyStrategy>,
    ctx: BotContext,
}

impl Dispatcher {
    pub fn new(
        telegram: TelegramClient,
        strategy: Box<dyn ReplyStrategy>,
        ctx: BotContext,
    ) -> Self {
        Self {
            telegram,
            strategy,
            ctx,
        }
    }

    pub async fn run(&self) -> Result<()> {
        tracing::info!("Bot is running...");
        let mut offset = 0i64;
        loop {
            let updates = match self.telegram.get_updates(offset, POLL_SECS).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!("Update poll failed: {:#}", e);
                    tokio::time::sleep(POLL_RETRY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else { continue };
                let Some(text) = message.text else { continue };
                self.handle_message(message.chat.id, &text).await;
            }
        }
    }

    async fn handle_message(&self, chat_id: i64, text: &str) {
        tracing::debug!("Message from chat {}", chat_id);

        if text.trim() == "/start" {
            let welcome = format!(
                "Welcome to {}! Ask me about available properties.",
                BOT_NAME
            );
            if let Err(e) = self.telegram.send_message(chat_id, &welcome).await {
                tracing::warn!("Failed to send welcome: {:#}", e);
            }
            return;
        }

        if let Err(e) = self.telegram.send_typing(chat_id).await {
            tracing::debug!("sendChatAction failed: {:#}", e);
        }

        // A handler that cannot obtain a token (or reach the ERP) reports a
        // clear failure to the user instead of a raw error; the loop keeps
        // running either way.
        let reply = match self.strategy.reply(text, &self.ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Reply composition failed: {:#}", e);
                TOKEN_FAILURE_REPLY.to_string()
            }
        };

        if let Err(e) = self.telegram.send_message(chat_id, &reply).await {
            tracing::warn!("Failed to send reply to chat {}: {:#}", chat_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Property> {
        vec![
            Property {
                name: "City Loft".into(),
                location: "Downtown Dubai".into(),
                price: 420000.0,
                area: "95".into(),
                bedrooms: 2,
                bathrooms: 2,
            },
            Property {
                name: "Sea View Villa".into(),
                location: "Dubai Marina".into(),
                price: 950000.0,
                area: "240".into(),
                bedrooms: 4,
                bathrooms: 3,
            },
        ]
    }

    #[test]
    fn renders_one_line_per_listing() {
        let reply = render_listing(&sample());
        assert!(reply.starts_with("Here are the top properties:\n"));
        assert!(reply.contains("- City Loft (Downtown Dubai): $420000, 95 sqm, 2BR/2BA"));
        assert!(reply.contains("- Sea View Villa (Dubai Marina): $950000, 240 sqm, 4BR/3BA"));
    }

    #[test]
    fn empty_result_renders_a_not_found_message() {
        assert_eq!(
            render_listing(&[]),
            "No properties found matching your criteria."
        );
    }
}
