// Activity window tracker - per-user, time-bounded record of recent messages.
//
// Leaf component of the anti-spam pipeline: it owns the window store and
// nothing else. The window feeds the violation scorer.

use super::antispam_models::{
    AntiSpamError, AntiSpamSettings, MessageEvent, MessageFingerprint,
};
use super::feature_extract::extract_features;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Storage port for per-user message windows.
///
/// The push + prune must be atomic per user so concurrent events for
/// different users never observe a half-updated window.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Append `fingerprint` to the user's window, discard everything older
    /// than `cutoff` from the front, and return the surviving window in
    /// chronological order (oldest first).
    async fn record_and_prune(
        &self,
        user_id: u64,
        fingerprint: MessageFingerprint,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MessageFingerprint>, AntiSpamError>;
}

/// Returns true when the message should skip all anti-spam processing.
///
/// Total and side-effect-free: disabled engine, missing guild/member
/// context, administrator authors, exempt channels/categories, and exempt
/// roles all short-circuit the pipeline.
pub fn is_exempt(event: &MessageEvent, settings: &AntiSpamSettings) -> bool {
    if !settings.enabled {
        return true;
    }
    let (Some(_guild_id), Some(member)) = (event.guild_id, event.member.as_ref()) else {
        return true;
    };
    if member.is_admin {
        return true;
    }
    if settings.exempt_channel_ids.contains(&event.channel_id) {
        return true;
    }
    if let Some(parent_id) = event.channel_parent_id {
        if settings.exempt_category_ids.contains(&parent_id) {
            return true;
        }
    }
    member
        .role_ids
        .iter()
        .any(|id| settings.exempt_role_ids.contains(id))
}

pub struct ActivityWindowTracker<W: WindowStore> {
    settings: Arc<AntiSpamSettings>,
    store: W,
}

impl<W: WindowStore> ActivityWindowTracker<W> {
    pub fn new(settings: Arc<AntiSpamSettings>, store: W) -> Self {
        Self { settings, store }
    }

    /// Fingerprint the message and merge it into the author's window.
    pub async fn record(
        &self,
        event: &MessageEvent,
        now: DateTime<Utc>,
    ) -> Result<Vec<MessageFingerprint>, AntiSpamError> {
        let fingerprint = MessageFingerprint {
            timestamp: now,
            content: event.content.trim().to_string(),
            features: extract_features(&event.content),
        };
        let cutoff = now - Duration::milliseconds(self.settings.window_ms as i64);
        self.store
            .record_and_prune(event.author_id, fingerprint, cutoff)
            .await
    }
}
