// Informational lookup commands. Everything here is read-only: cache
// lookups plus an embed reply.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const INFO_EMBED_COLOR: u32 = 0x0099FF;

/// Show a user's avatar.
#[poise::command(slash_command)]
pub async fn avatar(
    ctx: Context<'_>,
    #[description = "User to show (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let user = user.as_ref().unwrap_or_else(|| ctx.author());

    let embed = serenity::CreateEmbed::new()
        .title(format!("Avatar of {}", user.name))
        .image(user.face())
        .color(INFO_EMBED_COLOR);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show information about this server.
#[poise::command(slash_command, guild_only)]
pub async fn serverinfo(ctx: Context<'_>) -> Result<(), Error> {
    // Cache guard stays inside this block; no awaits while it lives.
    let (name, owner_id, member_count, created_ts, channels, roles, icon_url) = {
        let guild = ctx.guild().ok_or("Must be used in a server")?;
        (
            guild.name.clone(),
            guild.owner_id,
            guild.member_count,
            guild.id.created_at().unix_timestamp(),
            guild.channels.len(),
            guild.roles.len(),
            guild.icon_url(),
        )
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(name)
        .color(INFO_EMBED_COLOR)
        .field("👑 Owner", format!("<@{owner_id}>"), true)
        .field("👥 Members", member_count.to_string(), true)
        .field("📅 Created", format!("<t:{created_ts}:F>"), true)
        .field("📊 Channels", channels.to_string(), true)
        .field("🎭 Roles", roles.to_string(), true);
    if let Some(icon) = icon_url {
        embed = embed.thumbnail(icon);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show information about a user.
#[poise::command(slash_command, guild_only)]
pub async fn userinfo(
    ctx: Context<'_>,
    #[description = "User to look up (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let user = user.unwrap_or_else(|| ctx.author().clone());

    // Member details come from the cache; an uncached member just shows
    // the account-level fields.
    let (joined_ts, role_names) = match ctx.guild() {
        Some(guild) => match guild.members.get(&user.id) {
            Some(member) => {
                let names: Vec<String> = member
                    .roles
                    .iter()
                    .filter_map(|rid| guild.roles.get(rid))
                    .map(|r| r.name.clone())
                    .collect();
                (member.joined_at.map(|ts| ts.unix_timestamp()), names)
            }
            None => (None, Vec::new()),
        },
        None => (None, Vec::new()),
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Info for {}", user.name))
        .thumbnail(user.face())
        .color(INFO_EMBED_COLOR)
        .field("🆔 ID", user.id.to_string(), true)
        .field(
            "📅 Account created",
            format!("<t:{}:F>", user.id.created_at().unix_timestamp()),
            true,
        );
    if let Some(ts) = joined_ts {
        embed = embed.field("📅 Joined", format!("<t:{ts}:F>"), true);
    }
    if !role_names.is_empty() {
        embed = embed.field("🎭 Roles", role_names.join(", "), false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
