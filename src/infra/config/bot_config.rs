// Bot configuration loaded from a JSON file at startup.
//
// Secrets (the Discord token) stay in the environment; everything that is
// safe to commit lives here. A missing file falls back to defaults so the
// bot can boot in a fresh checkout.

use crate::core::antispam::AntiSpamSettings;
use anyhow::Context as _;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Guild the join/welcome features are scoped to. `None` disables them.
    pub guild_id: Option<u64>,
    /// Channel for welcome messages on member join.
    pub welcome_channel_id: Option<u64>,
    /// Role granted automatically to new members.
    pub auto_role_id: Option<u64>,
    pub anti_spam: AntiSpamSettings,
}

impl BotConfig {
    /// Load configuration from `path`. A missing file yields defaults; a
    /// present-but-invalid file is a startup error, not something to limp
    /// past with half-applied settings.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str::<Self>(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.anti_spam = std::mem::take(&mut config.anti_spam).validate();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = BotConfig::load("definitely/not/here.json").unwrap();
        assert!(config.guild_id.is_none());
        assert!(config.anti_spam.enabled);
        assert_eq!(config.anti_spam.window_ms, 7_000);
    }

    #[test]
    fn partial_json_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{
                "guild_id": 1234,
                "anti_spam": {{ "max_messages": 3, "punishments": [{{ "kind": "kick" }}] }}
            }}"#
        )
        .expect("write config");

        let config = BotConfig::load(file.path()).unwrap();
        assert_eq!(config.guild_id, Some(1234));
        assert_eq!(config.anti_spam.max_messages, 3);
        assert_eq!(config.anti_spam.window_ms, 7_000);
        assert_eq!(config.anti_spam.punishments.len(), 1);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{{ not json").expect("write config");
        assert!(BotConfig::load(file.path()).is_err());
    }
}
