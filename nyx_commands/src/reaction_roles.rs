use std::fmt::Write;

use crate::utils::{guild_embed, say_embed, say_error};
use crate::{Context, Error};

use nyx_core::data::settings::{emoji_key, ReactionRole};
use nyx_core::embeds;
use poise::serenity_prelude::{
    self as serenity, ChannelId, GuildId, Mentionable, MessageId, ReactionType,
};

/// Parses a unicode emoji, a `:shortcode:` or a custom `<:name:id>` emoji.
fn parse_emoji(input: &str) -> Option<ReactionType> {
    let input = input.trim();

    if input.starts_with('<') {
        return match ReactionType::try_from(input) {
            Ok(custom @ ReactionType::Custom { .. }) => Some(custom),
            _ => None,
        };
    }

    let emoji = match input.strip_prefix(':').and_then(|s| s.strip_suffix(':')) {
        Some(shortcode) => emojis::get_by_shortcode(shortcode),
        None => emojis::get(input),
    }?;
    Some(ReactionType::Unicode(emoji.as_str().to_owned()))
}

/// A message given as a bare id or as a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MessageRef {
    /// `None` for bare ids and for links into direct messages.
    guild: Option<GuildId>,
    channel: Option<ChannelId>,
    message: MessageId,
}

impl MessageRef {
    /// Bare ids are looked up in the current guild, links must point into it.
    fn within(&self, guild_id: GuildId) -> bool {
        match (self.guild, self.channel) {
            (Some(guild), _) => guild == guild_id,
            (None, Some(_)) => false,
            (None, None) => true,
        }
    }
}

/// Accepts a message id or a message link, which also carries the guild and channel.
fn parse_message(input: &str) -> Option<MessageRef> {
    let input = input.trim().trim_start_matches('<').trim_end_matches('>');

    if let Ok(id) = input.parse::<u64>() {
        return (id != 0).then(|| MessageRef {
            guild: None,
            channel: None,
            message: MessageId::new(id),
        });
    }

    let path = input.split("/channels/").nth(1)?;
    let mut parts = path.split('/');
    let guild = match parts.next()? {
        "@me" => None,
        id => Some(GuildId::new(id.parse::<u64>().ok().filter(|id| *id != 0)?)),
    };
    let channel = parts.next()?.parse::<u64>().ok().filter(|id| *id != 0)?;
    let message = parts.next()?.parse::<u64>().ok().filter(|id| *id != 0)?;
    Some(MessageRef {
        guild,
        channel: Some(ChannelId::new(channel)),
        message: MessageId::new(message),
    })
}

/// Renders a stored emoji key back into something discord displays.
fn display_emoji(key: &str) -> String {
    if !key.is_empty() && key.chars().all(|c| c.is_ascii_digit()) {
        format!("<:e:{key}>")
    } else {
        key.to_owned()
    }
}

/// Roles can only be handed out when they sit below the bot's highest role.
fn assignable(role_position: u16, managed: bool, bot_highest: u16) -> bool {
    !managed && role_position < bot_highest
}

fn bot_can_assign(ctx: Context<'_>, role: &serenity::Role) -> bool {
    let Some(guild) = ctx.guild() else {
        return false;
    };
    let bot_id = ctx.cache().current_user().id;
    let Some(member) = guild.members.get(&bot_id) else {
        return false;
    };

    let highest = member
        .roles
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .map(|role| role.position)
        .max()
        .unwrap_or(0);

    assignable(role.position, role.managed, highest)
}

#[poise::command(
    slash_command,
    prefix_command,
    rename = "reactionrole",
    category = "Reaction roles",
    guild_only,
    required_permissions = "MANAGE_ROLES",
    subcommands("add", "remove", "list"),
    subcommand_required,
    aliases("rr")
)]
pub async fn reaction_role(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Grant a role to everyone who reacts to a message.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES",
    required_bot_permissions = "MANAGE_ROLES | ADD_REACTIONS | READ_MESSAGE_HISTORY"
)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Message id or link"] message: String,
    #[description = "Emoji to react with"] emoji: String,
    #[description = "Role to grant"] role: serenity::Role,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let Some(target) = parse_message(&message) else {
        return say_error(ctx, "That is not a message id or link.").await;
    };
    if !target.within(guild_id) {
        return say_error(ctx, "That message is not in this server.").await;
    }
    let Some(reaction) = parse_emoji(&emoji) else {
        return say_error(ctx, format!("`{emoji}` is not an emoji I can use.")).await;
    };
    if !bot_can_assign(ctx, &role) {
        return say_error(
            ctx,
            format!("I can't hand out {}, it is above my highest role or managed by an integration.", role.mention()),
        )
        .await;
    }

    let message_id = target.message;
    let channel_id = target.channel.unwrap_or_else(|| ctx.channel_id());
    let target = match channel_id.message(ctx, message_id).await {
        Ok(target) => target,
        Err(_) => {
            return say_error(ctx, format!("I couldn't find that message in {}.", channel_id.mention()))
                .await;
        }
    };

    if let Err(e) = target.react(ctx, reaction.clone()).await {
        tracing::debug!(error = %e, "Could not react to reaction role message");
        return say_error(ctx, "I couldn't react with that emoji. Is it from another server?").await;
    }

    ctx.data()
        .database
        .add_reaction_role(ReactionRole {
            guild_id,
            message_id,
            emoji: emoji_key(&reaction),
            role_id: role.id,
        })
        .await?;

    say_embed(
        ctx,
        embeds::success(format!(
            "Reacting with {reaction} on [that message]({}) now grants {}.",
            target.link(),
            role.mention()
        )),
    )
    .await
}

/// Stop granting a role for a reaction.
#[poise::command(slash_command, prefix_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Message id or link"] message: String,
    #[description = "Emoji of the reaction role"] emoji: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let Some(target) = parse_message(&message) else {
        return say_error(ctx, "That is not a message id or link.").await;
    };
    if !target.within(guild_id) {
        return say_error(ctx, "That message is not in this server.").await;
    }
    let Some(reaction) = parse_emoji(&emoji) else {
        return say_error(ctx, format!("`{emoji}` is not an emoji.")).await;
    };

    let removed = ctx
        .data()
        .database
        .remove_reaction_role(guild_id, target.message, &emoji_key(&reaction))
        .await?;

    if removed {
        say_embed(ctx, embeds::success("Reaction role removed.")).await
    } else {
        say_error(ctx, "There is no reaction role for that emoji on that message.").await
    }
}

/// List the reaction roles of this server.
#[poise::command(slash_command, prefix_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let roles = ctx.data().database.reaction_roles_for(guild_id);
    if roles.is_empty() {
        return say_embed(ctx, embeds::info("This server has no reaction roles.")).await;
    }

    let mut description = String::new();
    let mut last_message = None;
    for rr in &roles {
        if last_message != Some(rr.message_id) {
            writeln!(description, "**Message {}**", rr.message_id)?;
            last_message = Some(rr.message_id);
        }
        writeln!(
            description,
            "{} → {}",
            display_emoji(&rr.emoji),
            rr.role_id.mention()
        )?;
    }

    say_embed(
        ctx,
        guild_embed(ctx)
            .title("Reaction roles")
            .description(nyx_core::apis::truncate(&description, 4000)),
    )
    .await
}

#[must_use]
pub fn commands() -> [crate::Command; 1] {
    [reaction_role()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emojis() {
        assert_eq!(
            parse_emoji("👍"),
            Some(ReactionType::Unicode("👍".to_owned()))
        );
        assert_eq!(
            parse_emoji(":thumbsup:"),
            Some(ReactionType::Unicode("👍".to_owned()))
        );
        assert!(matches!(
            parse_emoji("<:nyx:123456789012345678>"),
            Some(ReactionType::Custom { id, .. }) if id.get() == 123456789012345678
        ));
        assert_eq!(parse_emoji("hello"), None);
        assert_eq!(parse_emoji(":not_a_real_shortcode:"), None);
    }

    #[test]
    fn message_ids_and_links() {
        assert_eq!(
            parse_message("123456789012345678"),
            Some(MessageRef {
                guild: None,
                channel: None,
                message: MessageId::new(123456789012345678),
            })
        );
        let link = Some(MessageRef {
            guild: Some(GuildId::new(1)),
            channel: Some(ChannelId::new(22)),
            message: MessageId::new(333),
        });
        assert_eq!(parse_message("https://discord.com/channels/1/22/333"), link);
        assert_eq!(parse_message("<https://ptb.discord.com/channels/1/22/333>"), link);
        assert_eq!(
            parse_message("https://discord.com/channels/@me/22/333").map(|m| m.guild),
            Some(None)
        );
        assert_eq!(parse_message("0"), None);
        assert_eq!(parse_message("https://example.com"), None);
        assert_eq!(parse_message("https://discord.com/channels/x/22/333"), None);
    }

    #[test]
    fn links_must_point_into_the_guild() {
        let here = GuildId::new(1);
        let parse = |input: &str| parse_message(input).unwrap();

        assert!(parse("333").within(here));
        assert!(parse("https://discord.com/channels/1/22/333").within(here));
        assert!(!parse("https://discord.com/channels/2/22/333").within(here));
        assert!(!parse("https://discord.com/channels/@me/22/333").within(here));
    }

    #[test]
    fn stored_emojis_render() {
        assert_eq!(display_emoji("123"), "<:e:123>");
        assert_eq!(display_emoji("👍"), "👍");
    }

    #[test]
    fn role_hierarchy() {
        assert!(assignable(3, false, 5));
        assert!(!assignable(5, false, 5));
        assert!(!assignable(6, false, 5));
        assert!(!assignable(1, true, 5));
    }
}
