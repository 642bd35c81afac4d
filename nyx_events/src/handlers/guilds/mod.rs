pub mod members;

use crate::{Data, Error};

use nyx_ansi::{RESET, YELLOW};
use poise::serenity_prelude::{self as serenity, Guild, UnavailableGuild};

pub async fn guild_create(
    ctx: &serenity::Context,
    guild: &Guild,
    is_new: Option<bool>,
    data: &Data,
) -> Result<(), Error> {
    if data.guild_settings(guild.id).blacklisted {
        tracing::info!(guild = %guild.id, name = %guild.name, "Leaving blacklisted guild");
        guild.id.leave(&ctx.http).await?;
        return Ok(());
    }

    if is_new == Some(true) {
        data.database.ensure_guild(guild.id).await?;

        println!(
            "{YELLOW}Joined {} (ID:{})!\nNow in {} guild(s){RESET}",
            guild.name,
            guild.id,
            ctx.cache.guilds().len()
        );
    }
    Ok(())
}

pub async fn guild_delete(
    ctx: &serenity::Context,
    incomplete: &UnavailableGuild,
    full: Option<&Guild>,
    data: &Data,
) -> Result<(), Error> {
    // an outage, not a removal.
    if incomplete.unavailable {
        return Ok(());
    }

    data.database.remove_guild(incomplete.id).await?;

    let name = full.map_or("Unknown", |guild| guild.name.as_str());
    println!(
        "{YELLOW}Left {name} (ID:{})!\nNow in {} guild(s){RESET}",
        incomplete.id,
        ctx.cache.guilds().len()
    );
    Ok(())
}
