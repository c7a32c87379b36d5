// Anti-spam slash commands.
//
// Settings are immutable at runtime (loaded once from config.json), so the
// only verb here is `status`.

use crate::core::antispam::step_threshold;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Anti-spam inspection commands.
#[poise::command(
    slash_command,
    subcommands("status"),
    required_permissions = "MANAGE_MESSAGES",
    guild_only
)]
pub async fn antispam(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - poise routes to the subcommand.
    Ok(())
}

/// Show the active anti-spam settings.
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let settings = ctx.data().anti_spam.settings();

    let ladder: Vec<String> = settings
        .punishments
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let threshold = step_threshold(i);
            let action = match step.duration_ms {
                Some(ms) => format!("{:?} ({} min)", step.kind, ms / 60_000),
                None => format!("{:?}", step.kind),
            };
            format!("score ≥ {threshold}: {action}")
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("🛡️ Anti-Spam Status")
        .color(if settings.enabled { 0x00FF00 } else { 0xFF0000 })
        .field(
            "Status",
            if settings.enabled {
                "✅ Enabled"
            } else {
                "❌ Disabled"
            },
            false,
        )
        .field(
            "Window",
            format!(
                "{} messages / {} s, {} duplicate pairs",
                settings.max_messages,
                settings.window_ms / 1000,
                settings.max_duplicates
            ),
            true,
        )
        .field(
            "Per-message limits",
            format!(
                "{} mentions, {} emoji, {:.0}% caps",
                settings.max_mentions_per_message,
                settings.max_emojis_per_message,
                settings.max_caps_ratio_per_message * 100.0
            ),
            true,
        )
        .field(
            "Links",
            format!("{} per window", settings.max_links_per_window),
            true,
        )
        .field("Escalation ladder", ladder.join("\n"), false)
        .field(
            "Score decay",
            format!("1 point / {} min", settings.decay_ms / 60_000),
            true,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
