// Member join handling: auto-role and welcome message.

use crate::discord::Data;
use poise::serenity_prelude::{self as serenity, Mentionable};

pub async fn handle_member_join(
    ctx: &serenity::Context,
    data: &Data,
    new_member: &serenity::Member,
) {
    // These features are scoped to the configured home guild.
    if let Some(home_guild) = data.config.guild_id {
        if new_member.guild_id.get() != home_guild {
            return;
        }
    }

    if let Some(role_id) = data.config.auto_role_id {
        if let Err(e) = new_member
            .add_role(&ctx.http, serenity::RoleId::new(role_id))
            .await
        {
            tracing::warn!(
                user_id = new_member.user.id.get(),
                role_id,
                "failed to grant auto-role: {e}"
            );
        }
    }

    if let Some(channel_id) = data.config.welcome_channel_id {
        let greeting = format!("Welcome to the server, {}! 👋", new_member.mention());
        if let Err(e) = serenity::ChannelId::new(channel_id)
            .say(&ctx.http, greeting)
            .await
        {
            tracing::warn!(channel_id, "failed to send welcome message: {e}");
        }
    }
}
