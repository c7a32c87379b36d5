// Serenity-backed moderation executor.
//
// Translates the core's punishment decisions into Discord REST calls.
// Every method reports an `ExecStatus` instead of erroring: the escalation
// engine logs failures and moves on.

use crate::core::antispam::{ExecStatus, ModerationExecutor};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;

pub struct SerenityModerationExecutor<'a> {
    pub ctx: &'a serenity::Context,
    pub guild_id: serenity::GuildId,
    /// Channel the triggering message arrived in; warnings go there.
    pub channel_id: serenity::ChannelId,
}

impl SerenityModerationExecutor<'_> {
    /// Cache-based hierarchy precheck. `true` when the bot outranks the
    /// target (or the cache can't tell, in which case we let the REST call
    /// be the judge).
    fn outranks(&self, user_id: serenity::UserId) -> bool {
        let bot_id = self.ctx.cache.current_user().id;
        // The guard must not be held across an await; this whole check is sync.
        let Some(guild) = self.ctx.cache.guild(self.guild_id) else {
            return true;
        };
        if guild.owner_id == user_id {
            return false;
        }
        let top_position = |member: &serenity::Member| {
            member
                .roles
                .iter()
                .filter_map(|rid| guild.roles.get(rid))
                .map(|r| r.position)
                .max()
                .unwrap_or(0)
        };
        let Some(bot_member) = guild.members.get(&bot_id) else {
            return true;
        };
        let target_position = guild
            .members
            .get(&user_id)
            .map(|m| top_position(m))
            .unwrap_or(0);
        top_position(bot_member) > target_position
    }
}

#[async_trait]
impl ModerationExecutor for SerenityModerationExecutor<'_> {
    async fn warn_user(&self, user_id: u64, text: &str) -> ExecStatus {
        let notice = format!("⚠️ <@{user_id}> {text}");
        match self.channel_id.say(&self.ctx.http, notice).await {
            Ok(_) => ExecStatus::Success,
            Err(e) => {
                tracing::debug!(user_id, "warn notice send failed: {e}");
                ExecStatus::DeliveryFailed
            }
        }
    }

    async fn timeout_member(&self, user_id: u64, duration_ms: u64, reason: &str) -> ExecStatus {
        let user_id = serenity::UserId::new(user_id);
        if !self.outranks(user_id) {
            return ExecStatus::CapabilityDenied;
        }
        let until_secs = chrono::Utc::now().timestamp() + (duration_ms / 1000) as i64;
        let until = match serenity::Timestamp::from_unix_timestamp(until_secs) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::error!(%user_id, "timeout timestamp out of range: {e}");
                return ExecStatus::CapabilityDenied;
            }
        };
        let edit = serenity::EditMember::new()
            .disable_communication_until_datetime(until)
            .audit_log_reason(reason);
        match self.guild_id.edit_member(&self.ctx.http, user_id, edit).await {
            Ok(_) => ExecStatus::Success,
            Err(e) => {
                tracing::debug!(%user_id, "timeout rejected: {e}");
                ExecStatus::CapabilityDenied
            }
        }
    }

    async fn kick_member(&self, user_id: u64, reason: &str) -> ExecStatus {
        let user_id = serenity::UserId::new(user_id);
        if !self.outranks(user_id) {
            return ExecStatus::CapabilityDenied;
        }
        match self
            .guild_id
            .kick_with_reason(&self.ctx.http, user_id, reason)
            .await
        {
            Ok(_) => ExecStatus::Success,
            Err(e) => {
                tracing::debug!(%user_id, "kick rejected: {e}");
                ExecStatus::CapabilityDenied
            }
        }
    }

    async fn remove_roles(&self, user_id: u64, role_ids: &[u64], reason: &str) -> ExecStatus {
        let user_id = serenity::UserId::new(user_id);
        if !self.outranks(user_id) {
            return ExecStatus::CapabilityDenied;
        }

        // Decide which roles are actually removable before touching REST:
        // the @everyone role (id == guild id), managed roles, and anything
        // at or above the bot's top role stay.
        let removable: Vec<serenity::RoleId> = {
            let bot_id = self.ctx.cache.current_user().id;
            match self.ctx.cache.guild(self.guild_id) {
                Some(guild) => {
                    let bot_top = guild
                        .members
                        .get(&bot_id)
                        .map(|m| {
                            m.roles
                                .iter()
                                .filter_map(|rid| guild.roles.get(rid))
                                .map(|r| r.position)
                                .max()
                                .unwrap_or(0)
                        })
                        .unwrap_or(0);
                    role_ids
                        .iter()
                        .filter(|&&id| id != self.guild_id.get())
                        .map(|&id| serenity::RoleId::new(id))
                        .filter(|id| {
                            guild
                                .roles
                                .get(id)
                                .map(|r| !r.managed && r.position < bot_top)
                                .unwrap_or(false)
                        })
                        .collect()
                }
                None => role_ids
                    .iter()
                    .filter(|&&id| id != self.guild_id.get())
                    .map(|&id| serenity::RoleId::new(id))
                    .collect(),
            }
        };

        if removable.is_empty() {
            return ExecStatus::Success;
        }

        let mut denied = false;
        for role_id in removable {
            if let Err(e) = self
                .ctx
                .http
                .remove_member_role(self.guild_id, user_id, role_id, Some(reason))
                .await
            {
                tracing::debug!(%user_id, %role_id, "role removal rejected: {e}");
                denied = true;
            }
        }
        if denied {
            ExecStatus::CapabilityDenied
        } else {
            ExecStatus::Success
        }
    }

    async fn send_direct_message(&self, user_id: u64, text: &str) -> ExecStatus {
        let user_id = serenity::UserId::new(user_id);
        let channel = match user_id.create_dm_channel(self.ctx).await {
            Ok(channel) => channel,
            Err(e) => {
                tracing::debug!(%user_id, "could not open DM channel: {e}");
                return ExecStatus::DeliveryFailed;
            }
        };
        match channel.id.say(&self.ctx.http, text).await {
            Ok(_) => ExecStatus::Success,
            Err(e) => {
                tracing::debug!(%user_id, "DM send failed: {e}");
                ExecStatus::DeliveryFailed
            }
        }
    }
}
