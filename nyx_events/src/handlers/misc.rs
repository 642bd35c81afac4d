use std::sync::atomic::Ordering;

use crate::{Data, Error};

use nyx_ansi::{BOLD, HI_GREEN, RESET};
use poise::serenity_prelude::{self as serenity, ActivityData, Ready};

pub async fn ready(ctx: &serenity::Context, ready: &Ready, data: &Data) -> Result<(), Error> {
    // fired again on every reconnect.
    if data.has_started.swap(true, Ordering::SeqCst) {
        tracing::info!("Reconnected as {}", ready.user.name);
        return Ok(());
    }

    let prefix = data.database.defaults().prefix;
    ctx.set_activity(Some(ActivityData::listening(format!("{prefix}help"))));

    println!(
        "{HI_GREEN}{BOLD}Logged in as {}{RESET}{HI_GREEN} in {} guild(s), ready after {:.2?}{RESET}",
        ready.user.tag(),
        ready.guilds.len(),
        data.time_started.elapsed()
    );
    tracing::info!(user = %ready.user.id, guilds = ready.guilds.len(), "Ready");
    Ok(())
}
