// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "antispam/in_memory.rs"]
pub mod antispam;

#[path = "moderation/warn_stores.rs"]
pub mod moderation;

#[path = "config/bot_config.rs"]
pub mod config;
