use nyx_core::data::structs::{Context, Error};
use std::collections::HashSet;

use poise::serenity_prelude::UserId;

/// Global check run before every command.
///
/// Blacklisted users and every command in a blacklisted guild are rejected. Owners are
/// never blocked by the user blacklist so they can undo it.
pub async fn command_check(ctx: Context<'_>) -> Result<bool, Error> {
    let data = ctx.data();
    let author = ctx.author().id;

    let is_owner = is_owner(&data.config.read().owners, author);
    let user_blacklisted = data.database.is_user_blacklisted(author);
    let guild_blacklisted = ctx
        .guild_id()
        .is_some_and(|guild_id| data.guild_settings(guild_id).blacklisted);

    let allowed = is_allowed(is_owner, user_blacklisted, guild_blacklisted);
    if !allowed {
        tracing::debug!(
            user = %author,
            guild = ?ctx.guild_id(),
            command = %ctx.command().qualified_name,
            "Rejected command from blacklist"
        );
    }

    Ok(allowed)
}

/// Gate for owner commands.
///
/// Reads `OWNER_IDS` from the live config so an owner `reload` takes effect at once.
pub async fn owner_check(ctx: Context<'_>) -> Result<bool, Error> {
    if is_owner(&ctx.data().config.read().owners, ctx.author().id) {
        Ok(true)
    } else {
        Err("Only bot owners can call this command.".into())
    }
}

fn is_owner(owners: &HashSet<UserId>, user: UserId) -> bool {
    owners.contains(&user)
}

fn is_allowed(is_owner: bool, user_blacklisted: bool, guild_blacklisted: bool) -> bool {
    !guild_blacklisted && (is_owner || !user_blacklisted)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetError {
    Yourself,
    Bot,
    GuildOwner,
}

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetError::Yourself => write!(f, "You can't do that to yourself."),
            TargetError::Bot => write!(f, "I won't do that to myself."),
            TargetError::GuildOwner => write!(f, "The server owner can't be moderated."),
        }
    }
}

impl std::error::Error for TargetError {}

/// Rejects moderation actions aimed at the invoker, the bot or the guild owner.
pub fn check_target(
    author: UserId,
    bot: UserId,
    guild_owner: Option<UserId>,
    target: UserId,
) -> Result<(), TargetError> {
    if target == author {
        Err(TargetError::Yourself)
    } else if target == bot {
        Err(TargetError::Bot)
    } else if guild_owner == Some(target) {
        Err(TargetError::GuildOwner)
    } else {
        Ok(())
    }
}

/// [`check_target`] with the ids taken from the invocation and the cache.
pub fn moderation_target(ctx: Context<'_>, target: UserId) -> Result<(), TargetError> {
    let owner = ctx.guild().map(|guild| guild.owner_id);
    check_target(ctx.author().id, ctx.cache().current_user().id, owner, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklists() {
        assert!(is_allowed(false, false, false));
        assert!(!is_allowed(false, true, false));
        assert!(!is_allowed(false, false, true));
        // owners skip the user blacklist, not the guild one.
        assert!(is_allowed(true, true, false));
        assert!(!is_allowed(true, false, true));
    }

    #[test]
    fn owners_follow_the_current_config() {
        use nyx_core::config::BotConfig;

        let load = |owners: &str| {
            let owners = owners.to_owned();
            BotConfig::from_lookup(move |var| match var {
                "DATABASE_URL" => Some("postgres://localhost/nyx".to_owned()),
                "OWNER_IDS" => Some(owners.clone()),
                _ => None,
            })
            .unwrap()
        };

        let mut config = load("1,2");
        assert!(is_owner(&config.owners, UserId::new(2)));
        assert!(!is_owner(&config.owners, UserId::new(3)));

        config = load("3");
        assert!(!is_owner(&config.owners, UserId::new(2)));
        assert!(is_owner(&config.owners, UserId::new(3)));
    }

    #[test]
    fn moderation_targets() {
        let (author, bot, owner, other) = (
            UserId::new(1),
            UserId::new(2),
            UserId::new(3),
            UserId::new(4),
        );

        assert_eq!(
            check_target(author, bot, Some(owner), author),
            Err(TargetError::Yourself)
        );
        assert_eq!(check_target(author, bot, Some(owner), bot), Err(TargetError::Bot));
        assert_eq!(
            check_target(author, bot, Some(owner), owner),
            Err(TargetError::GuildOwner)
        );
        assert_eq!(check_target(author, bot, Some(owner), other), Ok(()));
        assert_eq!(check_target(author, bot, None, owner), Ok(()));
    }
}
