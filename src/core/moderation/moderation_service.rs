// Warning service - core business logic for moderator-issued warnings.
//
// The automatic anti-spam pipeline lives in `core::antispam`; this service
// only covers the `/warn`-family commands: record a warning, list a user's
// history, clear it.
//
// NO Discord dependencies here - just pure domain logic.

use super::moderation_models::WarnRecord;
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Trait for persisting warnings.
///
/// Following the same port pattern as the anti-spam stores.
#[async_trait]
pub trait WarnStore: Send + Sync {
    /// Persist a warning. Returns the user's new total in that guild.
    async fn add_warn(&self, record: WarnRecord) -> Result<u32, ModerationError>;

    /// All warnings for a user in a guild, newest first.
    async fn list_warns(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Vec<WarnRecord>, ModerationError>;

    /// Remove every warning for a user in a guild. Returns how many were removed.
    async fn clear_warns(&self, user_id: u64, guild_id: u64) -> Result<u64, ModerationError>;
}

pub struct WarnService<S: WarnStore> {
    store: S,
}

impl<S: WarnStore> WarnService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a warning against a user. Returns the new total so the caller
    /// can surface "warning 3 for this user".
    pub async fn warn(
        &self,
        user_id: u64,
        guild_id: u64,
        moderator_id: u64,
        reason: &str,
    ) -> Result<u32, ModerationError> {
        let reason = if reason.trim().is_empty() {
            "No reason provided".to_string()
        } else {
            reason.trim().to_string()
        };
        let total = self
            .store
            .add_warn(WarnRecord {
                user_id,
                guild_id,
                moderator_id,
                reason,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(user_id, guild_id, moderator_id, total, "warning recorded");
        Ok(total)
    }

    pub async fn history(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Vec<WarnRecord>, ModerationError> {
        self.store.list_warns(user_id, guild_id).await
    }

    pub async fn clear(&self, user_id: u64, guild_id: u64) -> Result<u64, ModerationError> {
        let removed = self.store.clear_warns(user_id, guild_id).await?;
        tracing::info!(user_id, guild_id, removed, "warnings cleared");
        Ok(removed)
    }
}
