// Feature extraction and string similarity for the anti-spam heuristics.
//
// Everything here is pure and best-effort: malformed content degrades to
// zero counts, it never fails.

use super::antispam_models::MessageFeatures;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_USER_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@!?(\d+)>").unwrap());
static RE_ROLE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@&(\d+)>").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://\S+").unwrap());
// Unicode emoji plus Discord custom emoji tokens like <:name:123> / <a:name:123>.
static RE_EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<a?:\w+:\d+>|\p{Emoji_Presentation}|\p{Extended_Pictographic}").unwrap()
});

/// Derive per-message metrics from raw content.
pub fn extract_features(content: &str) -> MessageFeatures {
    let user_mentions: HashSet<&str> = RE_USER_MENTION
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let role_mentions: HashSet<&str> = RE_ROLE_MENTION
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let everyone = content.contains("@everyone") || content.contains("@here");
    let mention_count =
        user_mentions.len() as u32 + role_mentions.len() as u32 + u32::from(everyone);

    let link_count = RE_LINK.find_iter(content).count() as u32;
    let emoji_count = RE_EMOJI.find_iter(content).count() as u32;

    let mut letters = 0u32;
    let mut uppercase = 0u32;
    for c in content.chars() {
        if c.is_alphabetic() {
            letters += 1;
            if c.is_uppercase() {
                uppercase += 1;
            }
        }
    }
    let caps_ratio = if letters == 0 {
        0.0
    } else {
        f64::from(uppercase) / f64::from(letters)
    };

    MessageFeatures {
        mention_count,
        link_count,
        emoji_count,
        caps_ratio,
    }
}

/// Positional (Hamming-style) similarity between two strings.
///
/// Equal strings (including both empty) compare as 1.0; otherwise an empty
/// side compares as 0.0; otherwise matching positions over max(len).
/// Deliberately cheap and order-sensitive: an inserted or deleted character
/// shifts every following position, so near-duplicates with shifted content
/// score lower than an edit-distance metric would report. The punishment
/// thresholds were tuned against this bias; do not swap in edit distance.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let len = a_chars.len().max(b_chars.len());
    let same = a_chars.iter().zip(&b_chars).filter(|(x, y)| x == y).count();
    same as f64 / len as f64
}
