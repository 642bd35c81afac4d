use std::time::Instant;

use crate::{Data, Error};

use nyx_ansi::{HI_GREEN, RESET};
use nyx_core::embeds;
use nyx_core::leveling::{roll_xp, LevelChange};
use poise::serenity_prelude::{self as serenity, CreateMessage, Mentionable, Message};

/// Cooldown entries kept before expired ones are pruned.
const COOLDOWN_PRUNE_THRESHOLD: usize = 10_000;

pub async fn message(ctx: &serenity::Context, msg: &Message, data: &Data) -> Result<(), Error> {
    if msg.author.bot {
        return Ok(());
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let settings = data.guild_settings(guild_id);
    if !settings.leveling_enabled
        || settings.blacklisted
        || data.database.is_user_blacklisted(msg.author.id)
    {
        return Ok(());
    }

    let now = Instant::now();
    if data.xp_cooldowns.len() > COOLDOWN_PRUNE_THRESHOLD {
        data.xp_cooldowns.prune(now);
    }
    if !data.xp_cooldowns.try_claim(guild_id, msg.author.id, now) {
        return Ok(());
    }

    let change = data.database.add_xp(guild_id, msg.author.id, roll_xp()).await?;
    if !change.levelled_up() {
        return Ok(());
    }

    let colour = nyx_ansi::from_colour(settings.embed_colour).unwrap_or_else(|| HI_GREEN.to_owned());
    println!(
        "{colour}[{guild_id}] {} reached level {}{RESET}",
        msg.author.tag(),
        change.after
    );

    let embed = embeds::themed(settings.embed_colour)
        .description(level_up_text(&msg.author.mention().to_string(), &change));
    if let Err(e) = msg
        .channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await
    {
        tracing::debug!(channel = %msg.channel_id, error = %e, "Could not announce level up");
    }
    Ok(())
}

fn level_up_text(mention: &str, change: &LevelChange) -> String {
    format!(
        "GG {mention}, you reached level **{}**! ({} XP)",
        change.after, change.total
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_core::leveling::xp_to_next;

    #[test]
    fn level_up_message() {
        let change = LevelChange::new(xp_to_next(0) - 5, xp_to_next(0) + 10);
        assert!(change.levelled_up());
        assert_eq!(
            level_up_text("<@1>", &change),
            "GG <@1>, you reached level **1**! (110 XP)"
        );
    }
}
