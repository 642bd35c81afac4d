pub mod database;

use crate::utils::{say_embed, say_error};
use crate::{Context, Error};

use nyx_ansi::{RESET, YELLOW};
use nyx_core::config::BotConfig;
use nyx_core::embeds;
use poise::serenity_prelude::{self as serenity, GuildId};

/// Refresh the settings caches and re-read the configuration.
#[poise::command(
    prefix_command,
    category = "Owner",
    check = "crate::utils::owner_check",
    hide_in_help
)]
pub async fn reload(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let started = std::time::Instant::now();

    let (guilds, users, reaction_roles) = data.database.refresh_caches().await?;

    let config = match BotConfig::from_env() {
        Ok(config) => {
            let pending = data.config.read().restart_required(&config);
            data.database.set_defaults(config.guild_defaults());
            *data.config.write() = config;
            reload_summary(&pending)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Kept the previous configuration");
            format!("Kept the previous configuration: {e}")
        }
    };

    tracing::info!(guilds, users, reaction_roles, "Caches reloaded");
    say_embed(
        ctx,
        embeds::success(format!(
            "Reloaded {guilds} guilds, {users} users and {reaction_roles} reaction roles in {:.2?}.\n{config}",
            started.elapsed()
        )),
    )
    .await
}

fn reload_summary(pending: &[&str]) -> String {
    let mut summary = "Default prefix, embed colour, owners and API settings reloaded.".to_owned();
    if !pending.is_empty() {
        summary.push_str(&format!(
            "\nChanged but only applied after a restart: {}.",
            pending.join(", ")
        ));
    }
    summary
}

#[poise::command(
    prefix_command,
    category = "Owner",
    check = "crate::utils::owner_check",
    hide_in_help,
    subcommands("user", "guild"),
    subcommand_required
)]
pub async fn blacklist(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Toggle whether a user can use the bot.
#[poise::command(prefix_command, check = "crate::utils::owner_check", hide_in_help)]
pub async fn user(ctx: Context<'_>, user: serenity::User) -> Result<(), Error> {
    let database = &ctx.data().database;
    let blacklisted = !database.is_user_blacklisted(user.id);

    database.set_user_blacklist(user.id, blacklisted).await?;

    let state = if blacklisted { "blacklisted" } else { "unblacklisted" };
    tracing::info!(user = %user.id, blacklisted, "Updated user blacklist");
    say_embed(ctx, embeds::success(format!("**{}** is now {state}.", user.tag()))).await
}

/// Toggle whether a guild can use the bot. Blacklisting a guild also leaves it.
#[poise::command(prefix_command, check = "crate::utils::owner_check", hide_in_help)]
pub async fn guild(ctx: Context<'_>, guild_id: u64) -> Result<(), Error> {
    if guild_id == 0 {
        return say_error(ctx, "That is not a guild id.").await;
    }
    let guild_id = GuildId::new(guild_id);

    let database = &ctx.data().database;
    let blacklisted = !database.guild_settings(guild_id).blacklisted;
    database.set_guild_blacklist(guild_id, blacklisted).await?;

    let mut note = String::new();
    if blacklisted && ctx.cache().guild(guild_id).is_some() {
        match guild_id.leave(ctx.http()).await {
            Ok(()) => note.push_str(" I left it."),
            Err(e) => {
                tracing::warn!(guild = %guild_id, error = %e, "Failed to leave blacklisted guild");
                note.push_str(" I could not leave it.");
            }
        }
    }

    println!("{YELLOW}[blacklist] guild {guild_id} blacklisted: {blacklisted}{RESET}");
    let state = if blacklisted { "blacklisted" } else { "unblacklisted" };
    say_embed(ctx, embeds::success(format!("Guild `{guild_id}` is now {state}.{note}"))).await
}

/// Shut the bot down.
#[poise::command(
    prefix_command,
    category = "Owner",
    check = "crate::utils::owner_check",
    hide_in_help
)]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    say_embed(ctx, embeds::warning("Shutting down.")).await?;
    tracing::info!(by = %ctx.author().id, "Shutdown requested");

    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}

#[must_use]
pub fn commands() -> [crate::Command; 4] {
    let [dbstats] = database::commands();
    [reload(), blacklist(), dbstats, shutdown()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_summary_lists_startup_only_values() {
        assert_eq!(
            reload_summary(&[]),
            "Default prefix, embed colour, owners and API settings reloaded."
        );
        assert!(reload_summary(&["DATABASE_URL", "RPC_BIND"])
            .ends_with("\nChanged but only applied after a restart: DATABASE_URL, RPC_BIND."));
    }
}
