// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, config)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::antispam::{AntiSpamService, SystemClock};
use crate::core::moderation::WarnService;
use crate::discord::antispam::spam_handler;
use crate::discord::member_events;
use crate::discord::{Data, Error};
use crate::infra::antispam::{InMemoryViolationStore, InMemoryWindowStore};
use crate::infra::config::BotConfig;
use crate::infra::moderation::SqliteWarnStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            spam_handler::handle_message(ctx, new_message, data).await;
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            member_events::handle_member_join(ctx, data, new_member).await;
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    let config_path =
        std::env::var("BOT_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let config = Arc::new(BotConfig::load(&config_path).expect("Failed to load bot config"));

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).expect("Failed to create data directory for SQLite files");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let anti_spam = Arc::new(AntiSpamService::new(
        config.anti_spam.clone(),
        InMemoryWindowStore::new(),
        InMemoryViolationStore::new(),
        Arc::new(SystemClock),
    ));

    let warn_pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}/moderation.db?mode=rwc", data_dir))
        .await
        .expect("Failed to connect to moderation DB");
    let warn_store = SqliteWarnStore::new(warn_pool);
    warn_store
        .migrate()
        .await
        .expect("Failed to migrate moderation DB");
    let warns = Arc::new(WarnService::new(warn_store));

    let data = Data {
        config: Arc::clone(&config),
        anti_spam: Arc::clone(&anti_spam),
        warns: Arc::clone(&warns),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::moderation::ban(),
                discord::commands::moderation::kick(),
                discord::commands::moderation::timeout(),
                discord::commands::moderation::clear(),
                discord::commands::moderation::warn(),
                discord::commands::moderation::warnlist(),
                discord::commands::moderation::clearwarns(),
                discord::commands::antispam::antispam(),
                discord::commands::info::avatar(),
                discord::commands::info::serverinfo(),
                discord::commands::info::userinfo(),
                discord::commands::utility::weather(),
                discord::commands::utility::remind(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                // Register slash commands globally (can take up to an hour to
                // propagate). For faster development, use register_in_guild.
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("commands registered, bot is ready");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
