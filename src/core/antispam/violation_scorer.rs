// Violation scorer - converts one window snapshot into an integer severity
// score for the triggering event.
//
// Deterministic, pure function of (settings, window, event, now). Each rule
// is checked independently and its delta added; there is no early exit.

use super::antispam_models::{AntiSpamSettings, MessageEvent, MessageFingerprint};
use super::feature_extract::similarity;
use chrono::{DateTime, Utc};

/// Adjacent window entries at or above this similarity count as a duplicate pair.
pub const DUPLICATE_SIMILARITY: f64 = 0.9;
/// The caps rule only applies to messages at least this long.
const MIN_CAPS_CONTENT_LEN: usize = 12;

/// Score the triggering event against the author's current window.
///
/// Returns 0 when no rule triggers. Missing account/join timestamps are
/// treated as age 0 ("too new"), failing the corresponding age check.
pub fn score_event(
    settings: &AntiSpamSettings,
    window: &[MessageFingerprint],
    event: &MessageEvent,
    now: DateTime<Utc>,
) -> u32 {
    if window.is_empty() {
        return 0;
    }
    let mut score = 0u32;

    // Rate of messages in the window.
    if window.len() > settings.max_messages as usize {
        score += 2;
    }

    // Duplicates / near-duplicates across adjacent non-empty contents.
    let contents: Vec<&str> = window
        .iter()
        .map(|f| f.content.as_str())
        .filter(|c| !c.is_empty())
        .collect();
    let duplicate_pairs = contents
        .windows(2)
        .filter(|pair| similarity(pair[0], pair[1]) >= DUPLICATE_SIMILARITY)
        .count();
    if duplicate_pairs >= settings.max_duplicates as usize {
        score += 2;
    }

    // Per-message checks on the triggering (last) entry.
    if let Some(last) = window.last() {
        if last.features.mention_count > settings.max_mentions_per_message {
            score += 2;
        }
        if last.features.emoji_count > settings.max_emojis_per_message {
            score += 1;
        }
        if last.features.caps_ratio > settings.max_caps_ratio_per_message
            && last.content.chars().count() >= MIN_CAPS_CONTENT_LEN
        {
            score += 1;
        }
    }

    // Link volume across the whole window.
    let link_sum: u32 = window.iter().map(|f| f.features.link_count).sum();
    if link_sum > settings.max_links_per_window {
        score += 2;
    }

    // Account and membership age.
    if age_ms(event.account_created_at, now) < settings.min_account_age_ms {
        score += 1;
    }
    let joined_at = event.member.as_ref().and_then(|m| m.joined_at);
    if age_ms(joined_at, now) < settings.min_server_age_ms {
        score += 1;
    }

    score
}

fn age_ms(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
    since
        .map(|t| (now - t).num_milliseconds().max(0) as u64)
        .unwrap_or(0)
}
