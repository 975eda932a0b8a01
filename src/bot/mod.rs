//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the school book office,
//! including all slash commands, autocomplete handlers, and bot context management.

/// Slash-command parameter choices mapped onto core types
pub mod choices;
/// Discord command implementations (books, people, rules, reconciliation, ...)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    config::school::SchoolConfig,
    core::promotion::SuccessorTable,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Discord rejects messages longer than 2000 characters.
const MESSAGE_LIMIT: usize = 1900;

/// Shared data available to all bot commands.
/// This structure holds the database connection and the school configuration
/// that commands need to access.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Settings from config.toml
    pub config: Arc<SchoolConfig>,
    /// Promotion policy built from `[promotion.successors]`
    pub promotion: SuccessorTable,
}

impl BotData {
    /// Creates a new `BotData` instance.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the promotion table is invalid.
    pub fn new(database: DatabaseConnection, config: Arc<SchoolConfig>) -> Result<Self> {
        let promotion = SuccessorTable::from_config(&config.promotion)?;
        Ok(Self {
            database,
            config,
            promotion,
        })
    }
}

/// Cuts a single line into pieces of at most `MESSAGE_LIMIT` bytes on char boundaries.
fn hard_wrap(line: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = line;
    while rest.len() > MESSAGE_LIMIT {
        let mut cut = MESSAGE_LIMIT;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }
    pieces.push(rest);
    pieces
}

/// Splits a reply into Discord-sized messages at line boundaries.
///
/// Lines longer than one message are cut mid-line.
#[must_use]
pub fn split_message(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.lines().flat_map(hard_wrap) {
        if !current.is_empty() && current.len() + line.len() + 1 > MESSAGE_LIMIT {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Sends a possibly long reply as several messages.
pub async fn say_long(ctx: poise::Context<'_, BotData, Error>, text: &str) -> Result<()> {
    for chunk in split_message(text) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error:?}", ctx.command().name);
            if let Err(e) = ctx.say(format!("❌ {error}")).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Starts the Discord client and blocks until it stops.
#[instrument(skip(token, config, database))]
pub async fn run_bot(
    token: String,
    config: Arc<SchoolConfig>,
    database: DatabaseConnection,
) -> Result<()> {
    let data = BotData::new(database, config)?;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::book(),
                commands::incident(),
                commands::reconcile(),
                commands::rules(),
                commands::promote(),
                commands::title(),
                commands::student(),
                commands::teacher(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot client...");
    client.start().await.map_err(|e| {
        error!("Client error: {e:?}");
        Error::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_message_keeps_short_text() {
        assert_eq!(split_message("a\nb"), vec!["a\nb".to_string()]);
        assert!(split_message("").is_empty());
    }

    #[test]
    fn test_split_message_breaks_at_lines() {
        let line = "x".repeat(100);
        let text = vec![line.as_str(); 40].join("\n");
        let chunks = split_message(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= MESSAGE_LIMIT));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_split_message_cuts_overlong_lines() {
        let text = "x".repeat(MESSAGE_LIMIT * 2 + 10);
        let chunks = split_message(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= MESSAGE_LIMIT));
        assert_eq!(chunks.concat(), text);

        let umlauts = "ä".repeat(MESSAGE_LIMIT);
        let chunks = split_message(&umlauts);
        assert!(chunks.iter().all(|c| c.len() <= MESSAGE_LIMIT));
        assert_eq!(chunks.concat(), umlauts);
    }
}
