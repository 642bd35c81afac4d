use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::utils::{guild_embed, say_embed, say_error};
use crate::{Context, Error};

use nyx_core::embeds::{self, format_hex_colour, parse_hex_colour};
use nyx_core::stats::BotStats;
use poise::serenity_prelude::{self as serenity, Mentionable};
use poise::CreateReply;

const MAX_PREFIX_LEN: usize = 5;

/// Show the commands, or the help of a single command.
#[poise::command(slash_command, prefix_command, category = "Core")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to show help for"]
    #[rest]
    command: Option<String>,
) -> Result<(), Error> {
    let prefix = match ctx.guild_id() {
        Some(guild_id) => ctx.data().guild_settings(guild_id).prefix,
        None => ctx.data().database.defaults().prefix,
    };

    let footer = format!("Prefix here is `{prefix}`. Slash commands work everywhere.");
    let config = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: &footer,
        ephemeral: true,
        ..Default::default()
    };

    poise::builtins::help(ctx, command.as_deref(), config).await?;
    Ok(())
}

/// Check the bot's latency.
#[poise::command(slash_command, prefix_command, category = "Core")]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let start = Instant::now();
    let msg = ctx.say("Pinging...").await?;
    let api_latency = start.elapsed().as_millis();

    let gateway = ctx.ping().await;
    let gateway = if gateway.is_zero() {
        "Unknown".to_owned()
    } else {
        format!("{}ms", gateway.as_millis())
    };

    let embed = guild_embed(ctx)
        .title("Pong!")
        .field("API", format!("{api_latency}ms"), true)
        .field("Gateway", gateway, true);

    msg.edit(ctx, CreateReply::default().content("").embed(embed))
        .await?;
    Ok(())
}

/// Version, uptime and usage of the bot.
#[poise::command(slash_command, prefix_command, category = "Core")]
pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let stats = BotStats::collect(
        ctx.cache(),
        &data.database,
        data.commands_run.load(Ordering::Relaxed),
        data.time_started,
    );

    let embed = guild_embed(ctx)
        .title(format!("About {}", ctx.cache().current_user().name))
        .description("A modular Discord bot written in Rust with serenity and poise.")
        .field("Version", &stats.version, true)
        .field("Uptime", stats.uptime(), true)
        .field("Servers", stats.guilds.to_string(), true)
        .field("Users", stats.users.to_string(), true)
        .field("Commands run", stats.commands_run.to_string(), true);

    say_embed(ctx, embed).await
}

fn channel_or_unset(channel: Option<serenity::ChannelId>) -> String {
    channel.map_or_else(|| "Not set".to_owned(), |c| c.mention().to_string())
}

/// Show this server's settings.
#[poise::command(slash_command, prefix_command, category = "Core", guild_only)]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let settings = ctx.data().guild_settings(guild_id);

    let embed = embeds::themed(settings.embed_colour)
        .title("Server settings")
        .field("Prefix", format!("`{}`", settings.prefix), true)
        .field("Embed colour", format_hex_colour(settings.embed_colour), true)
        .field(
            "Leveling",
            if settings.leveling_enabled { "Enabled" } else { "Disabled" },
            true,
        )
        .field("Welcome channel", channel_or_unset(settings.welcome_channel), true)
        .field("Mod-log channel", channel_or_unset(settings.mod_log_channel), true);

    say_embed(ctx, embed).await
}

fn validate_prefix(prefix: &str) -> Result<&str, String> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err("The prefix can't be empty.".to_owned());
    }
    if prefix.chars().count() > MAX_PREFIX_LEN {
        return Err(format!(
            "The prefix can be at most {MAX_PREFIX_LEN} characters long."
        ));
    }
    if prefix.chars().any(char::is_whitespace) || prefix.contains('`') {
        return Err("The prefix can't contain spaces or backticks.".to_owned());
    }
    Ok(prefix)
}

/// Change the command prefix for this server.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Core",
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn prefix(
    ctx: Context<'_>,
    #[description = "The new prefix"] prefix: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let prefix = match validate_prefix(&prefix) {
        Ok(prefix) => prefix.to_owned(),
        Err(why) => return say_error(ctx, why).await,
    };

    let settings = ctx.data().database.set_prefix(guild_id, prefix).await?;
    say_embed(
        ctx,
        embeds::success(format!("Prefix set to `{}`.", settings.prefix)),
    )
    .await
}

/// Change the embed colour used in this server.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Core",
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn colour(
    ctx: Context<'_>,
    #[description = "Hex colour, like #7B68EE"] colour: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let Some(colour) = parse_hex_colour(&colour) else {
        return say_error(ctx, format!("`{colour}` is not a hex colour like `#7B68EE`.")).await;
    };

    ctx.data().database.set_embed_colour(guild_id, colour).await?;
    say_embed(
        ctx,
        embeds::themed(colour).description(format!(
            "Embed colour set to `{}`.",
            format_hex_colour(colour)
        )),
    )
    .await
}

/// Set or clear the channel for welcome and farewell messages.
#[poise::command(
    slash_command,
    prefix_command,
    rename = "welcome-channel",
    category = "Core",
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn welcome_channel(
    ctx: Context<'_>,
    #[description = "Leave empty to disable"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let channel = channel.map(|c| c.id);
    ctx.data()
        .database
        .set_welcome_channel(guild_id, channel)
        .await?;

    let description = match channel {
        Some(channel) => format!("Welcome messages will be sent in {}.", channel.mention()),
        None => "Welcome messages are disabled.".to_owned(),
    };
    say_embed(ctx, embeds::success(description)).await
}

/// Set or clear the channel moderation actions are logged to.
#[poise::command(
    slash_command,
    prefix_command,
    rename = "modlog-channel",
    category = "Core",
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn modlog_channel(
    ctx: Context<'_>,
    #[description = "Leave empty to disable"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let channel = channel.map(|c| c.id);
    ctx.data()
        .database
        .set_mod_log_channel(guild_id, channel)
        .await?;

    let description = match channel {
        Some(channel) => format!("Moderation actions will be logged in {}.", channel.mention()),
        None => "The mod-log is disabled.".to_owned(),
    };
    say_embed(ctx, embeds::success(description)).await
}

/// Turn message XP on or off for this server.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Core",
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn leveling(
    ctx: Context<'_>,
    #[description = "Whether members earn XP"] enabled: bool,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    ctx.data().database.set_leveling(guild_id, enabled).await?;
    let state = if enabled { "enabled" } else { "disabled" };
    say_embed(ctx, embeds::success(format!("Leveling is now {state}."))).await
}

#[must_use]
pub fn commands() -> [crate::Command; 9] {
    [
        help(),
        ping(),
        about(),
        settings(),
        prefix(),
        colour(),
        welcome_channel(),
        modlog_channel(),
        leveling(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        assert_eq!(validate_prefix(" ?? "), Ok("??"));
        assert_eq!(validate_prefix("n!"), Ok("n!"));
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("   ").is_err());
        assert!(validate_prefix("toolong").is_err());
        assert!(validate_prefix("a b").is_err());
        assert!(validate_prefix("`").is_err());
        // counted in characters, not bytes.
        assert_eq!(validate_prefix("ñ!"), Ok("ñ!"));
    }
}
