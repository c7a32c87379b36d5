// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "antispam/mod.rs"]
pub mod antispam;

#[path = "member_events.rs"]
pub mod member_events;

use crate::core::antispam::AntiSpamService;
use crate::core::moderation::WarnService;
use crate::infra::antispam::{InMemoryViolationStore, InMemoryWindowStore};
use crate::infra::config::BotConfig;
use crate::infra::moderation::SqliteWarnStore;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state injected into every command and event handler.
pub struct Data {
    pub config: Arc<BotConfig>,
    pub anti_spam: Arc<AntiSpamService<InMemoryWindowStore, InMemoryViolationStore>>,
    pub warns: Arc<WarnService<SqliteWarnStore>>,
}
