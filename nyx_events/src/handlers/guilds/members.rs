use crate::{Data, Error};

use nyx_ansi::{RESET, YELLOW};
use nyx_core::embeds::{self, Colours};
use poise::serenity_prelude::{self as serenity, CreateEmbedFooter, CreateMessage, GuildId, Member, Mentionable, User};

/// `1st`, `2nd`, `3rd`, `11th`, `22nd`.
#[must_use]
pub fn ordinal(n: u64) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn welcome_text(mention: &str, guild_name: &str, member_count: Option<u64>) -> String {
    match member_count {
        Some(count) if count > 0 => format!(
            "Welcome {mention} to **{guild_name}**! You are our {} member.",
            ordinal(count)
        ),
        _ => format!("Welcome {mention} to **{guild_name}**!"),
    }
}

fn farewell_text(tag: &str, guild_name: &str) -> String {
    format!("**{tag}** has left **{guild_name}**.")
}

pub async fn guild_member_addition(
    ctx: &serenity::Context,
    new_member: &Member,
    data: &Data,
) -> Result<(), Error> {
    let guild_id = new_member.guild_id;
    let settings = data.guild_settings(guild_id);

    let (guild_name, member_count) = ctx
        .cache
        .guild(guild_id)
        .map_or_else(|| ("the server".to_owned(), None), |g| (g.name.clone(), Some(g.member_count)));

    println!(
        "{YELLOW}[{guild_name}] {} (ID:{}) has joined!{RESET}",
        new_member.user.tag(),
        new_member.user.id
    );

    let Some(channel) = settings.welcome_channel else {
        return Ok(());
    };

    let embed = embeds::themed(settings.embed_colour)
        .title("Welcome!")
        .description(welcome_text(
            &new_member.user.mention().to_string(),
            &guild_name,
            member_count,
        ))
        .thumbnail(new_member.user.face());

    if let Err(e) = channel
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await
    {
        tracing::warn!(guild = %guild_id, %channel, error = %e, "Failed to send welcome message");
    }
    Ok(())
}

pub async fn guild_member_removal(
    ctx: &serenity::Context,
    guild_id: GuildId,
    user: &User,
    data: &Data,
) -> Result<(), Error> {
    let settings = data.guild_settings(guild_id);
    let guild_name = ctx
        .cache
        .guild(guild_id)
        .map_or_else(|| "the server".to_owned(), |g| g.name.clone());

    println!(
        "{YELLOW}[{guild_name}] {} (ID:{}) has left!{RESET}",
        user.tag(),
        user.id
    );

    let Some(channel) = settings.welcome_channel else {
        return Ok(());
    };

    let embed = embeds::themed(Colours::WARNING)
        .description(farewell_text(&user.tag(), &guild_name))
        .footer(CreateEmbedFooter::new(format!("ID: {}", user.id)));

    if let Err(e) = channel
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await
    {
        tracing::warn!(guild = %guild_id, %channel, error = %e, "Failed to send farewell message");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(112), "112th");
        assert_eq!(ordinal(1002), "1002nd");
    }

    #[test]
    fn welcome_and_farewell() {
        assert_eq!(
            welcome_text("<@1>", "Nyx", Some(42)),
            "Welcome <@1> to **Nyx**! You are our 42nd member."
        );
        assert_eq!(welcome_text("<@1>", "Nyx", None), "Welcome <@1> to **Nyx**!");
        assert_eq!(farewell_text("a#0001", "Nyx"), "**a#0001** has left **Nyx**.");
    }
}
