use poise::serenity_prelude::{ChannelId, GuildId, MessageId, ReactionType, RoleId, UserId};
use sqlx::{postgres::PgRow, FromRow, Row};

use crate::cache::CachedRow;
use crate::embeds::Colours;

/// One `guild_config` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuildSettings {
    pub guild_id: GuildId,
    pub prefix: String,
    pub embed_colour: u32,
    /// Blacklisted guilds are left on join and cannot run commands.
    pub blacklisted: bool,
    pub welcome_channel: Option<ChannelId>,
    pub mod_log_channel: Option<ChannelId>,
    pub leveling_enabled: bool,
}

impl GuildSettings {
    /// Settings of a guild that has no row yet.
    #[must_use]
    pub fn new(guild_id: GuildId, defaults: &GuildDefaults) -> Self {
        Self {
            guild_id,
            prefix: defaults.prefix.clone(),
            embed_colour: defaults.embed_colour,
            blacklisted: false,
            welcome_channel: None,
            mod_log_channel: None,
            leveling_enabled: true,
        }
    }
}

/// Values used for guilds without a `guild_config` row.
#[derive(Clone, Debug)]
pub struct GuildDefaults {
    pub prefix: String,
    pub embed_colour: u32,
}

impl Default for GuildDefaults {
    fn default() -> Self {
        Self {
            prefix: "n!".to_owned(),
            embed_colour: Colours::BRAND,
        }
    }
}

impl CachedRow for GuildSettings {
    type Key = GuildId;

    fn key(&self) -> GuildId {
        self.guild_id
    }
}

impl<'r> FromRow<'r, PgRow> for GuildSettings {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            guild_id: GuildId::new(row.try_get::<i64, _>("guild_id")? as u64),
            prefix: row.try_get("prefix")?,
            embed_colour: row.try_get::<i32, _>("embed_colour")? as u32,
            blacklisted: row.try_get("blacklisted")?,
            welcome_channel: row
                .try_get::<Option<i64>, _>("welcome_channel")?
                .map(|id| ChannelId::new(id as u64)),
            mod_log_channel: row
                .try_get::<Option<i64>, _>("mod_log_channel")?
                .map(|id| ChannelId::new(id as u64)),
            leveling_enabled: row.try_get("leveling_enabled")?,
        })
    }
}

/// One `users` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSettings {
    pub user_id: UserId,
    pub blacklisted: bool,
}

impl UserSettings {
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            blacklisted: false,
        }
    }
}

impl CachedRow for UserSettings {
    type Key = UserId;

    fn key(&self) -> UserId {
        self.user_id
    }
}

impl<'r> FromRow<'r, PgRow> for UserSettings {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: UserId::new(row.try_get::<i64, _>("user_id")? as u64),
            blacklisted: row.try_get("blacklisted")?,
        })
    }
}

/// A reaction on a message that grants a role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionRole {
    pub guild_id: GuildId,
    pub message_id: MessageId,
    /// Normalised with [`emoji_key`].
    pub emoji: String,
    pub role_id: RoleId,
}

impl CachedRow for ReactionRole {
    type Key = (MessageId, String);

    fn key(&self) -> Self::Key {
        (self.message_id, self.emoji.clone())
    }
}

impl<'r> FromRow<'r, PgRow> for ReactionRole {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            guild_id: GuildId::new(row.try_get::<i64, _>("guild_id")? as u64),
            message_id: MessageId::new(row.try_get::<i64, _>("message_id")? as u64),
            emoji: row.try_get("emoji")?,
            role_id: RoleId::new(row.try_get::<i64, _>("role_id")? as u64),
        })
    }
}

/// Stable key for a reaction: the codepoints for unicode emoji, the id for custom ones.
#[must_use]
pub fn emoji_key(reaction: &ReactionType) -> String {
    match reaction {
        ReactionType::Custom { id, .. } => id.to_string(),
        ReactionType::Unicode(s) => s.clone(),
        // non-exhaustive upstream.
        _ => reaction.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::EmojiId;

    #[test]
    fn unknown_guild_gets_defaults() {
        let defaults = GuildDefaults {
            prefix: "?".to_owned(),
            embed_colour: 0x112233,
        };
        let settings = GuildSettings::new(GuildId::new(5), &defaults);

        assert_eq!(settings.prefix, "?");
        assert_eq!(settings.embed_colour, 0x112233);
        assert!(!settings.blacklisted);
        assert!(settings.leveling_enabled);
        assert_eq!(settings.welcome_channel, None);
    }

    #[test]
    fn emoji_keys() {
        let unicode = ReactionType::Unicode("🍕".to_owned());
        let custom = ReactionType::Custom {
            animated: false,
            id: EmojiId::new(123456789),
            name: Some("blob".to_owned()),
        };

        assert_eq!(emoji_key(&unicode), "🍕");
        assert_eq!(emoji_key(&custom), "123456789");
    }

    #[test]
    fn reaction_role_key_is_message_and_emoji() {
        let rr = ReactionRole {
            guild_id: GuildId::new(1),
            message_id: MessageId::new(2),
            emoji: "✅".to_owned(),
            role_id: RoleId::new(3),
        };
        assert_eq!(rr.key(), (MessageId::new(2), "✅".to_owned()));
    }
}
