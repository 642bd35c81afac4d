#![warn(clippy::pedantic)]
// clippy warns for u64 -> i64 conversions despite this being totally okay in this scenario.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::wildcard_imports,
    clippy::module_name_repetitions,
    clippy::unreadable_literal,
    clippy::unused_async
)]

use poise::serenity_prelude::{self as serenity, FullEvent};
use nyx_core::data::structs::{Data, Error, FrameworkContext};

pub mod handlers;
use handlers::*;

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: FrameworkContext<'_>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot, .. } => {
            misc::ready(ctx, data_about_bot, data).await?;
        }
        FullEvent::Message { new_message, .. } => {
            messages::message(ctx, new_message, data).await?;
        }
        FullEvent::ReactionAdd { add_reaction, .. } => {
            reactions::reaction_add(ctx, add_reaction, data).await?;
        }
        FullEvent::ReactionRemove {
            removed_reaction, ..
        } => {
            reactions::reaction_remove(ctx, removed_reaction, data).await?;
        }
        FullEvent::GuildCreate { guild, is_new, .. } => {
            guilds::guild_create(ctx, guild, *is_new, data).await?;
        }
        FullEvent::GuildDelete { incomplete, full, .. } => {
            guilds::guild_delete(ctx, incomplete, full.as_ref(), data).await?;
        }
        FullEvent::GuildMemberAddition { new_member, .. } => {
            guilds::members::guild_member_addition(ctx, new_member, data).await?;
        }
        FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            guilds::members::guild_member_removal(ctx, *guild_id, user, data).await?;
        }
        _ => {}
    }
    Ok(())
}
