//! propconnect - chat-driven property listing bridge for NetSuite
//!
//! Authenticates against the ERP REST API with the OAuth2 authorization
//! code flow, then answers chat messages with filtered property listings.

mod api;
mod auth;
mod bot;
mod config;
mod llm;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::ErpClient;
use auth::TokenLifecycleManager;
use bot::telegram::TelegramClient;
use bot::{BotContext, Dispatcher, ListingReplier, LlmReplier, ReplyStrategy};
use config::Config;
use llm::LlmClient;

/// How long the standalone `login` command waits for the redirect.
const LOGIN_DEADLINE: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "propconnect")]
#[command(about = "Chat-driven property listing bridge for NetSuite", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize against the ERP, then start the chat bot
    Run {
        /// Compose replies through the LLM instead of the plain listing
        #[arg(long)]
        llm: bool,
    },

    /// Run the authorization flow standalone and report token status
    Login,

    /// One-shot property query from the command line (no chat platform)
    Query {
        /// Free-text criteria, e.g. "top 3 affordable in Dubai"
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Login => {
            let config = Config::load()?;
            let auth = TokenLifecycleManager::new(config.oauth());
            let record = auth.authorize(Some(LOGIN_DEADLINE)).await?;
            println!("Authorization complete.");
            println!("Access token valid until {} (unix seconds).", record.expires_at);
        }
        Commands::Query { text } => {
            let config = Config::load()?;
            let auth = Arc::new(TokenLifecycleManager::new(config.oauth()));
            auth.authorize(Some(LOGIN_DEADLINE)).await?;

            let erp = ErpClient::new(&config.erp_base_url, auth);
            let criteria = bot::filter::extract_criteria(&text);
            let properties = api::fetch_properties(
                &erp,
                &config.record_type,
                &criteria.filters,
                criteria.limit.unwrap_or(api::DEFAULT_LIMIT),
                criteria.sort_by_price,
            )
            .await?;
            print!("{}", bot::render_listing(&properties));
        }
        Commands::Run { llm } => {
            let config = Config::load()?;

            let strategy: Box<dyn ReplyStrategy> = if llm {
                let Some(api_key) = config.anthropic_api_key.clone() else {
                    bail!("--llm requires ANTHROPIC_API_KEY to be configured");
                };
                Box::new(LlmReplier::new(LlmClient::new(api_key)))
            } else {
                Box::new(ListingReplier)
            };

            tracing::info!("Starting authorization flow...");
            let auth = Arc::new(TokenLifecycleManager::new(config.oauth()));
            auth.authorize(None).await?;
            tracing::info!("ERP access token obtained");

            let ctx = BotContext {
                erp: ErpClient::new(&config.erp_base_url, auth),
                record_type: config.record_type.clone(),
            };
            let dispatcher =
                Dispatcher::new(TelegramClient::new(&config.telegram_token), strategy, ctx);
            dispatcher.run().await?;
        }
    }

    Ok(())
}
