// Anti-spam domain models - data structures for the scoring/escalation engine.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts platform events into these and back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AntiSpamError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Outcome of one moderation executor call.
///
/// Executor calls are best-effort: a failure is reported as a status value
/// and logged by the caller, never raised as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Success,
    /// The platform refused the action (hierarchy, missing permission,
    /// member not restrictable/kickable).
    CapabilityDenied,
    /// A notification could not be delivered (closed DMs, channel send failed).
    DeliveryFailed,
}

/// Derived metrics extracted from one message's content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFeatures {
    /// Distinct user mentions + role mentions + an everyone/here flag.
    pub mention_count: u32,
    /// `http(s)://` occurrences.
    pub link_count: u32,
    /// Emoji glyphs/sequences, including Discord custom emoji tokens.
    pub emoji_count: u32,
    /// Uppercase letters / total letters, 0.0 when there are no letters.
    pub caps_ratio: f64,
}

/// One observed message, retained only while inside the sliding window.
#[derive(Debug, Clone)]
pub struct MessageFingerprint {
    pub timestamp: DateTime<Utc>,
    /// Trimmed message text; identity comparison basis for duplicate detection.
    pub content: String,
    pub features: MessageFeatures,
}

/// Per-user cumulative escalation state.
///
/// Lives for the process lifetime, independent of the activity window.
/// `current_step` is the dedup guard: it only ever increases, so a user
/// oscillating at or above a threshold is not re-punished at the same rung.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserViolationState {
    pub cumulative_score: u32,
    /// Instant of the last score mutation, used to compute decay.
    pub last_update: Option<DateTime<Utc>>,
    /// Index into the punishment ladder already reached; `None` means
    /// "no punishment yet".
    pub current_step: Option<usize>,
}

/// Guild-member context attached to an inbound message event.
#[derive(Debug, Clone, Default)]
pub struct MemberInfo {
    pub joined_at: Option<DateTime<Utc>>,
    pub role_ids: Vec<u64>,
    pub is_admin: bool,
}

/// Inbound message event, supplied by the platform-event layer.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub author_id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub channel_parent_id: Option<u64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub account_created_at: Option<DateTime<Utc>>,
    /// `None` when the message lacks guild-member context (e.g. DMs).
    pub member: Option<MemberInfo>,
}

/// What a single escalation rung does when reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PunishmentKind {
    Warn,
    Timeout,
    Kick,
}

/// One rung of the punishment ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunishmentStep {
    pub kind: PunishmentKind,
    /// Only meaningful for `Timeout`; falls back to 10 minutes when absent.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Anti-spam configuration. Loaded once at startup, immutable for the
/// lifetime of the process (reloadable only by restart).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiSpamSettings {
    pub enabled: bool,
    pub exempt_role_ids: Vec<u64>,
    pub exempt_channel_ids: Vec<u64>,
    pub exempt_category_ids: Vec<u64>,
    /// Sliding window length in milliseconds.
    pub window_ms: u64,
    /// Max messages per window before the rate rule triggers.
    pub max_messages: u32,
    /// Identical/near-identical adjacent pairs in the window before the
    /// duplication rule triggers.
    pub max_duplicates: u32,
    pub max_mentions_per_message: u32,
    pub max_links_per_window: u32,
    pub max_emojis_per_message: u32,
    /// Fraction of uppercase letters that triggers the caps rule.
    pub max_caps_ratio_per_message: f64,
    pub min_account_age_ms: u64,
    pub min_server_age_ms: u64,
    /// Ordered escalation ladder; rung i is bound to score threshold 2*(i+1).
    pub punishments: Vec<PunishmentStep>,
    /// One point of cumulative score is forgiven per elapsed interval.
    pub decay_ms: u64,
    /// Remove all manageable roles on any violation, independent of escalation.
    pub strip_roles_on_violation: bool,
    /// Users whose only ever consequence is the role strip.
    pub strip_only_user_ids: Vec<u64>,
}

impl Default for AntiSpamSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            exempt_role_ids: Vec::new(),
            exempt_channel_ids: Vec::new(),
            exempt_category_ids: Vec::new(),
            window_ms: 7_000,
            max_messages: 6,
            max_duplicates: 3,
            max_mentions_per_message: 5,
            max_links_per_window: 5,
            max_emojis_per_message: 15,
            max_caps_ratio_per_message: 0.7,
            min_account_age_ms: 3 * 24 * 60 * 60 * 1000, // 3 days
            min_server_age_ms: 12 * 60 * 60 * 1000,      // 12 hours since join
            punishments: Self::default_punishments(),
            decay_ms: 30 * 60 * 1000, // 30 minutes per forgiven point
            strip_roles_on_violation: false,
            strip_only_user_ids: Vec::new(),
        }
    }
}

impl AntiSpamSettings {
    /// The warn / 10m timeout / 1h timeout / kick ladder.
    pub fn default_punishments() -> Vec<PunishmentStep> {
        vec![
            PunishmentStep {
                kind: PunishmentKind::Warn,
                duration_ms: None,
            },
            PunishmentStep {
                kind: PunishmentKind::Timeout,
                duration_ms: Some(10 * 60 * 1000),
            },
            PunishmentStep {
                kind: PunishmentKind::Timeout,
                duration_ms: Some(60 * 60 * 1000),
            },
            PunishmentStep {
                kind: PunishmentKind::Kick,
                duration_ms: None,
            },
        ]
    }

    /// Normalize invalid values once at load time.
    ///
    /// Configuration problems are never fatal: a broken threshold degrades
    /// to "rule never triggers" or to the documented default.
    pub fn validate(mut self) -> Self {
        let defaults = Self::default();
        if self.window_ms == 0 {
            tracing::warn!("anti-spam window_ms is 0, falling back to default");
            self.window_ms = defaults.window_ms;
        }
        if self.decay_ms == 0 {
            tracing::warn!("anti-spam decay_ms is 0, falling back to default");
            self.decay_ms = defaults.decay_ms;
        }
        if !self.max_caps_ratio_per_message.is_finite()
            || !(0.0..=1.0).contains(&self.max_caps_ratio_per_message)
        {
            // A ratio is always <= 1.0, so a threshold of 1.0 never triggers.
            tracing::warn!("anti-spam caps ratio threshold is invalid, disabling the caps rule");
            self.max_caps_ratio_per_message = 1.0;
        }
        if self.punishments.is_empty() {
            tracing::warn!("anti-spam punishment ladder is empty, using the default ladder");
            self.punishments = Self::default_punishments();
        }
        self
    }
}
