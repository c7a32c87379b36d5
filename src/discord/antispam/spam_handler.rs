// Translates incoming Discord messages into core message events and feeds
// them through the anti-spam pipeline.

use super::executor::SerenityModerationExecutor;
use crate::core::antispam::{MemberInfo, MessageEvent};
use crate::discord::Data;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

fn ts_to_utc(ts: serenity::Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.unix_timestamp(), 0)
}

/// Build the platform-agnostic event for a guild message.
///
/// Member context comes from the cache when available, falling back to the
/// partial member attached to the gateway event. Missing context degrades
/// to `None` fields; the core decides what that means.
fn build_event(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    guild_id: serenity::GuildId,
) -> MessageEvent {
    // All cache access stays inside this block so no guard lives across an await.
    let (channel_parent_id, member) = match ctx.cache.guild(guild_id) {
        Some(guild) => {
            let parent_id = guild
                .channels
                .get(&msg.channel_id)
                .and_then(|c| c.parent_id)
                .map(|id| id.get());
            let member = guild.members.get(&msg.author.id).map(|m| {
                let is_admin = guild.owner_id == msg.author.id
                    || m.roles
                        .iter()
                        .filter_map(|rid| guild.roles.get(rid))
                        .any(|r| r.permissions.administrator());
                MemberInfo {
                    joined_at: m.joined_at.and_then(ts_to_utc),
                    role_ids: m.roles.iter().map(|r| r.get()).collect(),
                    is_admin,
                }
            });
            (parent_id, member)
        }
        None => (None, None),
    };

    // Cache miss: the gateway's partial member still carries roles and the
    // join timestamp, just no resolved permissions.
    let member = member.or_else(|| {
        msg.member.as_deref().map(|partial| MemberInfo {
            joined_at: partial.joined_at.and_then(ts_to_utc),
            role_ids: partial.roles.iter().map(|r| r.get()).collect(),
            is_admin: false,
        })
    });

    MessageEvent {
        author_id: msg.author.id.get(),
        guild_id: Some(guild_id.get()),
        channel_id: msg.channel_id.get(),
        channel_parent_id,
        content: msg.content.clone(),
        created_at: ts_to_utc(msg.timestamp).unwrap_or_else(Utc::now),
        account_created_at: ts_to_utc(msg.author.id.created_at()),
        member,
    }
}

/// Run one message through the anti-spam pipeline.
pub async fn handle_message(ctx: &serenity::Context, msg: &serenity::Message, data: &Data) {
    if msg.author.bot {
        return;
    }
    let Some(guild_id) = msg.guild_id else {
        return;
    };

    let event = build_event(ctx, msg, guild_id);
    let executor = SerenityModerationExecutor {
        ctx,
        guild_id,
        channel_id: msg.channel_id,
    };

    if let Err(e) = data.anti_spam.process_message(&event, &executor).await {
        tracing::error!(user_id = event.author_id, "anti-spam pipeline failed: {e}");
    }
}
