use crate::utils::{guild_embed, say_embed};
use crate::{Context, Error};

use poise::serenity_prelude::{self as serenity, Mentionable};

fn discord_timestamp(timestamp: serenity::Timestamp) -> String {
    let unix = timestamp.unix_timestamp();
    format!("<t:{unix}:D> (<t:{unix}:R>)")
}

/// Information about this server.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Info",
    guild_only,
    aliases("guildinfo")
)]
pub async fn serverinfo(ctx: Context<'_>) -> Result<(), Error> {
    let embed = {
        let Some(guild) = ctx.guild() else {
            return Ok(());
        };

        let mut embed = guild_embed(ctx)
            .title(&guild.name)
            .field("Owner", guild.owner_id.mention().to_string(), true)
            .field("Members", guild.member_count.to_string(), true)
            .field("Channels", guild.channels.len().to_string(), true)
            .field("Roles", guild.roles.len().to_string(), true)
            .field("Emojis", guild.emojis.len().to_string(), true)
            .field(
                "Boosts",
                guild.premium_subscription_count.unwrap_or(0).to_string(),
                true,
            )
            .field("Created", discord_timestamp(guild.id.created_at()), false)
            .footer(serenity::CreateEmbedFooter::new(format!("ID: {}", guild.id)));

        if let Some(icon) = guild.icon_url() {
            embed = embed.thumbnail(icon);
        }
        embed
    };

    say_embed(ctx, embed).await
}

/// Information about a member.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Info",
    guild_only,
    aliases("whois", "memberinfo")
)]
pub async fn userinfo(
    ctx: Context<'_>,
    #[description = "Member to look up, yourself by default"] member: Option<serenity::Member>,
) -> Result<(), Error> {
    let member = match member {
        Some(member) => member,
        None => ctx
            .author_member()
            .await
            .ok_or("Could not find you in this server.")?
            .into_owned(),
    };
    let user = &member.user;

    let roles = {
        let guild = ctx.guild();
        let mut roles: Vec<(u16, serenity::RoleId)> = member
            .roles
            .iter()
            .filter_map(|id| {
                let role = guild.as_ref()?.roles.get(id)?;
                Some((role.position, *id))
            })
            .collect();
        roles.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        roles
    };

    let role_list = if roles.is_empty() {
        "None".to_owned()
    } else {
        roles
            .iter()
            .take(20)
            .map(|(_, id)| id.mention().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut embed = guild_embed(ctx)
        .title(user.tag())
        .thumbnail(user.face())
        .field("Mention", user.mention().to_string(), true)
        .field("Bot", if user.bot { "Yes" } else { "No" }, true)
        .field("Created", discord_timestamp(user.created_at()), false);

    if let Some(joined) = member.joined_at {
        embed = embed.field("Joined", discord_timestamp(joined), false);
    }

    embed = embed
        .field(format!("Roles [{}]", roles.len()), role_list, false)
        .footer(serenity::CreateEmbedFooter::new(format!("ID: {}", user.id)));

    say_embed(ctx, embed).await
}

/// Show a user's avatar.
#[poise::command(slash_command, prefix_command, category = "Info", aliases("av", "pfp"))]
pub async fn avatar(
    ctx: Context<'_>,
    #[description = "User to show, yourself by default"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let user = user.as_ref().unwrap_or_else(|| ctx.author());
    let face = user.face();

    let embed = guild_embed(ctx)
        .title(format!("{}'s avatar", user.name))
        .url(&face)
        .image(face);

    say_embed(ctx, embed).await
}

#[must_use]
pub fn commands() -> [crate::Command; 3] {
    [serverinfo(), userinfo(), avatar()]
}
