use crate::{Data, Error};

use nyx_core::data::settings::emoji_key;
use poise::serenity_prelude::{self as serenity, GuildId, Reaction, RoleId, UserId};

/// The guild, member and role a reaction maps to, if it is a reaction role.
fn lookup(ctx: &serenity::Context, reaction: &Reaction, data: &Data) -> Option<(GuildId, UserId, RoleId)> {
    let guild_id = reaction.guild_id?;
    let user_id = reaction.user_id?;

    if user_id == ctx.cache.current_user().id {
        return None;
    }
    if reaction.member.as_ref().is_some_and(|m| m.user.bot) {
        return None;
    }
    if data.guild_settings(guild_id).blacklisted {
        return None;
    }

    let role_id = data
        .database
        .reaction_role(reaction.message_id, &emoji_key(&reaction.emoji))?;
    Some((guild_id, user_id, role_id))
}

pub async fn reaction_add(ctx: &serenity::Context, reaction: &Reaction, data: &Data) -> Result<(), Error> {
    let Some((guild_id, user_id, role_id)) = lookup(ctx, reaction, data) else {
        return Ok(());
    };

    if let Err(e) = ctx
        .http
        .add_member_role(guild_id, user_id, role_id, Some("Reaction role"))
        .await
    {
        tracing::warn!(guild = %guild_id, user = %user_id, role = %role_id, error = %e, "Failed to grant reaction role");
    }
    Ok(())
}

pub async fn reaction_remove(ctx: &serenity::Context, reaction: &Reaction, data: &Data) -> Result<(), Error> {
    let Some((guild_id, user_id, role_id)) = lookup(ctx, reaction, data) else {
        return Ok(());
    };

    if let Err(e) = ctx
        .http
        .remove_member_role(guild_id, user_id, role_id, Some("Reaction role removed"))
        .await
    {
        tracing::warn!(guild = %guild_id, user = %user_id, role = %role_id, error = %e, "Failed to remove reaction role");
    }
    Ok(())
}
