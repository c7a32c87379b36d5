// Manual moderation slash commands.
//
// Same pattern as every command file: extract primitives from Discord
// types, call the core service, format the reply.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

fn audit_reason(reason: &Option<String>) -> &str {
    reason.as_deref().unwrap_or("No reason provided")
}

/// Ban a user from the server.
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Reason for the ban"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    guild_id
        .ban_with_reason(ctx.http(), user.id, 0, audit_reason(&reason))
        .await?;

    ctx.say(format!(
        "🔨 **{}** has been banned. Reason: {}",
        user.name,
        audit_reason(&reason)
    ))
    .await?;
    Ok(())
}

/// Kick a user from the server.
#[poise::command(slash_command, guild_only, required_permissions = "KICK_MEMBERS")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "User to kick"] user: serenity::User,
    #[description = "Reason for the kick"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    guild_id
        .kick_with_reason(ctx.http(), user.id, audit_reason(&reason))
        .await?;

    ctx.say(format!(
        "👢 **{}** has been kicked. Reason: {}",
        user.name,
        audit_reason(&reason)
    ))
    .await?;
    Ok(())
}

/// Time a user out for a number of minutes.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn timeout(
    ctx: Context<'_>,
    #[description = "User to time out"] user: serenity::User,
    #[description = "Duration in minutes"]
    #[min = 1]
    #[max = 40320] // Discord's cap: 28 days
    minutes: u32,
    #[description = "Reason for the timeout"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let until = serenity::Timestamp::from_unix_timestamp(
        chrono::Utc::now().timestamp() + i64::from(minutes) * 60,
    )
    .map_err(|e| format!("Invalid timeout duration: {e}"))?;

    guild_id
        .edit_member(
            ctx.http(),
            user.id,
            serenity::EditMember::new()
                .disable_communication_until_datetime(until)
                .audit_log_reason(audit_reason(&reason)),
        )
        .await?;

    ctx.say(format!(
        "🔇 **{}** has been timed out for {} minutes. Reason: {}",
        user.name,
        minutes,
        audit_reason(&reason)
    ))
    .await?;
    Ok(())
}

/// Bulk-delete recent messages in this channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "How many messages to delete (1-100)"]
    #[min = 1]
    #[max = 100]
    amount: u8,
) -> Result<(), Error> {
    let channel_id = ctx.channel_id();

    let messages = channel_id
        .messages(ctx.http(), serenity::GetMessages::new().limit(amount))
        .await?;
    let ids: Vec<serenity::MessageId> = messages.iter().map(|m| m.id).collect();
    let deleted = ids.len();

    if deleted == 1 {
        // The bulk endpoint rejects single-message batches.
        channel_id.delete_message(ctx.http(), ids[0]).await?;
    } else if deleted > 1 {
        channel_id.delete_messages(ctx.http(), ids).await?;
    }

    ctx.send(
        poise::CreateReply::default()
            .content(format!("🧹 Deleted {deleted} messages."))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Warn a user and record it in their history.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "User to warn"] user: serenity::User,
    #[description = "Reason for the warning"] reason: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let total = ctx
        .data()
        .warns
        .warn(user.id.get(), guild_id.get(), ctx.author().id.get(), &reason)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    // Best-effort DM; closed DMs are not an error.
    let guild_name = ctx
        .guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "this server".to_string());
    if let Ok(dm) = user.create_dm_channel(ctx.serenity_context()).await {
        let _ = dm
            .id
            .say(
                ctx.http(),
                format!("You have been warned in **{guild_name}**: {reason}"),
            )
            .await;
    }

    ctx.say(format!(
        "⚠️ <@{}> has been warned (warning #{total}): {reason}",
        user.id
    ))
    .await?;
    Ok(())
}

/// List a user's warnings.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn warnlist(
    ctx: Context<'_>,
    #[description = "User to look up"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let history = ctx
        .data()
        .warns
        .history(user.id.get(), guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if history.is_empty() {
        ctx.say(format!("**{}** has no warnings. 🎉", user.name))
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = history
        .iter()
        .take(15)
        .enumerate()
        .map(|(i, w)| {
            format!(
                "**{}.** {} (by <@{}> on <t:{}:d>)",
                i + 1,
                w.reason,
                w.moderator_id,
                w.created_at.timestamp()
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("Warnings for {} ({})", user.name, history.len()))
        .color(0xFFA500)
        .description(lines.join("\n"));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Clear all warnings for a user.
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn clearwarns(
    ctx: Context<'_>,
    #[description = "User whose warnings to clear"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let removed = ctx
        .data()
        .warns
        .clear(user.id.get(), guild_id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    ctx.say(format!(
        "🧹 Cleared {removed} warning(s) for **{}**.",
        user.name
    ))
    .await?;
    Ok(())
}
