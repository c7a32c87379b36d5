// Moderation domain models - data structures for the manual moderation
// commands (warnings issued by moderators, as opposed to the automatic
// anti-spam escalation).
//
// These are pure domain types with no Discord dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A warning issued to a user by a moderator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarnRecord {
    pub user_id: u64,
    pub guild_id: u64,
    pub moderator_id: u64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}
