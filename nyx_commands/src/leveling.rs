use std::fmt::Write;

use crate::utils::{guild_embed, say_embed, say_error};
use crate::{Context, Error};

use nyx_core::embeds;
use nyx_core::leveling::{level_from_xp, progress_bar};
use poise::serenity_prelude::{self as serenity, CreateEmbedFooter, Mentionable};

const LEADERBOARD_SIZE: i64 = 10;

/// Show a member's level and rank.
#[poise::command(slash_command, prefix_command, category = "Leveling", guild_only, aliases("level", "xp"))]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "Member to show, yourself by default"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let user = user.as_ref().unwrap_or_else(|| ctx.author());

    if user.bot {
        return say_error(ctx, "Bots don't earn XP.").await;
    }

    let Some(entry) = ctx.data().database.level_entry(guild_id, user.id).await? else {
        return say_embed(
            ctx,
            embeds::info(format!("**{}** hasn't earned any XP yet.", user.name)),
        )
        .await;
    };

    let progress = level_from_xp(entry.xp);
    let mut embed = guild_embed(ctx)
        .title(format!("{}'s rank", user.name))
        .thumbnail(user.face())
        .field("Level", progress.level.to_string(), true)
        .field("Rank", format!("#{}", entry.rank), true)
        .field("Total XP", entry.xp.to_string(), true)
        .field(
            "Progress",
            format!(
                "{} {}/{}",
                progress_bar(&progress, 12),
                progress.current,
                progress.needed
            ),
            false,
        )
        .footer(CreateEmbedFooter::new(format!("{} messages counted", entry.messages)));

    if !ctx.data().guild_settings(guild_id).leveling_enabled {
        embed = embed.description("Leveling is currently disabled in this server.");
    }

    say_embed(ctx, embed).await
}

/// The members with the most XP.
#[poise::command(slash_command, prefix_command, category = "Leveling", guild_only, aliases("lb", "top"))]
pub async fn leaderboard(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let entries = ctx
        .data()
        .database
        .leaderboard(guild_id, LEADERBOARD_SIZE)
        .await?;

    if entries.is_empty() {
        return say_embed(ctx, embeds::info("Nobody has earned any XP yet.")).await;
    }

    let mut description = String::new();
    for entry in &entries {
        let level = level_from_xp(entry.xp).level;
        let medal = match entry.rank {
            1 => "🥇",
            2 => "🥈",
            3 => "🥉",
            _ => "▫️",
        };
        writeln!(
            description,
            "{medal} **#{}** {} - level {level} ({} XP)",
            entry.rank,
            entry.user_id.mention(),
            entry.xp
        )?;
    }

    let title = ctx
        .guild()
        .map_or_else(|| "Leaderboard".to_owned(), |g| format!("{} leaderboard", g.name));

    say_embed(ctx, guild_embed(ctx).title(title).description(description)).await
}

#[must_use]
pub fn commands() -> [crate::Command; 2] {
    [rank(), leaderboard()]
}
