pub mod checks;

use std::time::Duration;

pub use checks::*;
use nyx_core::data::structs::{Context, Error};
use nyx_core::embeds;
use poise::serenity_prelude::{
    self as serenity, Cache, ChannelId, CreateEmbed, CreateMessage, GuildId, Permissions,
};
use poise::CreateReply;

pub async fn handle_cooldown(remaining_cooldown: Duration, ctx: Context<'_>) -> Result<(), Error> {
    let msg = format!(
        "You're too fast. Please wait {} seconds before retrying",
        remaining_cooldown.as_secs().max(1)
    );
    ctx.send(CreateReply::default().content(msg).ephemeral(true))
        .await?;

    Ok(())
}

/// The bot's permissions in a guild channel or thread, from the cache.
#[must_use]
pub fn bot_channel_permissions(
    cache: &Cache,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Option<Permissions> {
    let guild = cache.guild(guild_id)?;

    let (channel, is_thread) = if let Some(channel) = guild.channels.get(&channel_id) {
        (channel, false)
    } else {
        let thread = guild.threads.iter().find(|t| t.id == channel_id)?;
        (guild.channels.get(&thread.parent_id?)?, true)
    };

    let member = guild.members.get(&cache.current_user().id)?;
    let mut permissions = guild.user_permissions_in(channel, member);

    if is_thread && permissions.send_messages_in_threads() {
        permissions |= Permissions::SEND_MESSAGES;
    }

    Some(permissions)
}

/// Embed in the invoking guild's configured colour.
#[must_use]
pub fn guild_embed(ctx: Context<'_>) -> CreateEmbed {
    embeds::themed(ctx.data().embed_colour(ctx.guild_id()))
}

pub async fn say_embed(ctx: Context<'_>, embed: CreateEmbed) -> Result<(), Error> {
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub async fn say_error(ctx: Context<'_>, description: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        CreateReply::default()
            .embed(embeds::error(description))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Posts to the guild's mod-log channel if one is configured. Failures are only logged.
pub async fn send_mod_log(ctx: Context<'_>, embed: CreateEmbed) {
    let Some(guild_id) = ctx.guild_id() else {
        return;
    };
    let Some(channel) = ctx.data().guild_settings(guild_id).mod_log_channel else {
        return;
    };

    if let Err(e) = channel
        .send_message(ctx.http(), CreateMessage::new().embed(embed))
        .await
    {
        tracing::warn!(%guild_id, %channel, error = %e, "Failed to post to mod-log");
    }
}

/// Downloads a file, refusing anything bigger than `max_bytes`.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    max_bytes: usize,
) -> Result<Vec<u8>, Error> {
    let response = client.get(url).send().await?.error_for_status()?;

    if response
        .content_length()
        .is_some_and(|len| len as usize > max_bytes)
    {
        return Err(format!("That file is larger than {} MiB.", max_bytes / (1024 * 1024)).into());
    }

    let bytes = response.bytes().await?;
    if bytes.len() > max_bytes {
        return Err(format!("That file is larger than {} MiB.", max_bytes / (1024 * 1024)).into());
    }
    Ok(bytes.to_vec())
}

/// Avatar url of a user as a static png, sized for image filters.
#[must_use]
pub fn avatar_png(user: &serenity::User) -> String {
    png_avatar_url(&user.face())
}

fn png_avatar_url(face: &str) -> String {
    let base = face.split_once('?').map_or(face, |(base, _)| base);
    let base = base
        .strip_suffix(".webp")
        .or_else(|| base.strip_suffix(".gif"))
        .map_or_else(|| base.to_owned(), |stem| format!("{stem}.png"));
    format!("{base}?size=512")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_urls_become_static_png() {
        assert_eq!(
            png_avatar_url("https://cdn.discordapp.com/avatars/1/abc.webp?size=1024"),
            "https://cdn.discordapp.com/avatars/1/abc.png?size=512"
        );
        assert_eq!(
            png_avatar_url("https://cdn.discordapp.com/avatars/1/a_abc.gif?size=1024"),
            "https://cdn.discordapp.com/avatars/1/a_abc.png?size=512"
        );
        assert_eq!(
            png_avatar_url("https://cdn.discordapp.com/embed/avatars/3.png"),
            "https://cdn.discordapp.com/embed/avatars/3.png?size=512"
        );
    }
}
