use std::collections::HashSet;
use std::net::SocketAddr;

use poise::serenity_prelude::{GuildId, UserId};

use crate::data::settings::GuildDefaults;
use crate::embeds::{parse_hex_colour, Colours};

pub const DEFAULT_PREFIX: &str = "n!";
pub const DEFAULT_RPC_BIND: &str = "127.0.0.1:8089";
pub const DEFAULT_TRANSLATE_URL: &str = "https://libretranslate.com";

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// `DISCORD_TOKEN`, may be overridden with `--token`.
    pub token: Option<String>,
    pub database_url: String,
    pub default_prefix: String,
    pub embed_colour: u32,
    pub owners: HashSet<UserId>,
    /// Slash commands are only registered here in developer mode.
    pub dev_guild: Option<GuildId>,
    pub rpc_bind: SocketAddr,
    pub rpc_secret: Option<String>,
    pub ocr_api_key: Option<String>,
    pub translate_url: String,
    pub translate_api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "`{var}` environment variable is required"),
            ConfigError::Invalid { var, value } => write!(f, "invalid value for `{var}`: '{value}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl BotConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, treating empty values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let embed_colour = match get("EMBED_COLOUR") {
            Some(value) => parse_hex_colour(&value).ok_or(ConfigError::Invalid {
                var: "EMBED_COLOUR",
                value,
            })?,
            None => Colours::BRAND,
        };

        let rpc_bind = get("RPC_BIND").unwrap_or_else(|| DEFAULT_RPC_BIND.to_owned());
        let rpc_bind: SocketAddr = rpc_bind.parse().map_err(|_| ConfigError::Invalid {
            var: "RPC_BIND",
            value: rpc_bind.clone(),
        })?;

        Ok(Self {
            token: get("DISCORD_TOKEN"),
            database_url,
            default_prefix: get("DEFAULT_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_owned()),
            embed_colour,
            owners: parse_id_list("OWNER_IDS", get("OWNER_IDS"))?
                .into_iter()
                .map(UserId::new)
                .collect(),
            dev_guild: parse_id_list("DEV_GUILD_ID", get("DEV_GUILD_ID"))?
                .first()
                .copied()
                .map(GuildId::new),
            rpc_bind,
            rpc_secret: get("RPC_SECRET"),
            ocr_api_key: get("OCR_API_KEY"),
            translate_url: get("TRANSLATE_URL")
                .unwrap_or_else(|| DEFAULT_TRANSLATE_URL.to_owned())
                .trim_end_matches('/')
                .to_owned(),
            translate_api_key: get("TRANSLATE_API_KEY"),
        })
    }

    #[must_use]
    pub fn guild_defaults(&self) -> GuildDefaults {
        GuildDefaults {
            prefix: self.default_prefix.clone(),
            embed_colour: self.embed_colour,
        }
    }

    /// Variables that differ in `new` but are only read at startup.
    ///
    /// Prefix, colour, owners and the API settings apply on reload. These do not.
    #[must_use]
    pub fn restart_required(&self, new: &BotConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.token != new.token {
            changed.push("DISCORD_TOKEN");
        }
        if self.database_url != new.database_url {
            changed.push("DATABASE_URL");
        }
        if self.dev_guild != new.dev_guild {
            changed.push("DEV_GUILD_ID");
        }
        if self.rpc_bind != new.rpc_bind {
            changed.push("RPC_BIND");
        }
        if self.rpc_secret != new.rpc_secret {
            changed.push("RPC_SECRET");
        }
        changed
    }
}

fn parse_id_list(var: &'static str, value: Option<String>) -> Result<Vec<u64>, ConfigError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u64>() {
            Ok(id) if id != 0 => Ok(id),
            _ => Err(ConfigError::Invalid {
                var,
                value: s.to_owned(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BotConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/nyx")]))
            .unwrap();

        assert_eq!(config.default_prefix, DEFAULT_PREFIX);
        assert_eq!(config.embed_colour, Colours::BRAND);
        assert_eq!(config.rpc_bind, DEFAULT_RPC_BIND.parse::<SocketAddr>().unwrap());
        assert!(config.owners.is_empty());
        assert!(config.token.is_none());
        assert_eq!(config.translate_url, DEFAULT_TRANSLATE_URL);
    }

    #[test]
    fn database_url_is_required() {
        let err = BotConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn parses_ids_and_colour() {
        let config = BotConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("OWNER_IDS", "1, 2,3,"),
            ("DEV_GUILD_ID", "99"),
            ("EMBED_COLOUR", "#00ff00"),
            ("TRANSLATE_URL", "https://translate.example/"),
        ]))
        .unwrap();

        assert_eq!(config.owners.len(), 3);
        assert!(config.owners.contains(&UserId::new(2)));
        assert_eq!(config.dev_guild, Some(GuildId::new(99)));
        assert_eq!(config.embed_colour, 0x00FF00);
        assert_eq!(config.translate_url, "https://translate.example");
    }

    #[test]
    fn rejects_invalid_values() {
        let err = BotConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("OWNER_IDS", "12,abc"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "OWNER_IDS",
                value: "abc".to_owned()
            }
        );

        let err = BotConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("RPC_BIND", "not an address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "RPC_BIND", .. }));
    }

    #[test]
    fn startup_only_changes_are_reported() {
        let old = BotConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://a"),
            ("DISCORD_TOKEN", "t"),
            ("DEFAULT_PREFIX", "!"),
        ]))
        .unwrap();
        let same_startup = BotConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://a"),
            ("DISCORD_TOKEN", "t"),
            ("DEFAULT_PREFIX", "?"),
            ("OWNER_IDS", "1"),
        ]))
        .unwrap();
        assert!(old.restart_required(&same_startup).is_empty());

        let moved = BotConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://b"),
            ("RPC_BIND", "127.0.0.1:9000"),
        ]))
        .unwrap();
        assert_eq!(
            old.restart_required(&moved),
            vec!["DISCORD_TOKEN", "DATABASE_URL", "RPC_BIND"]
        );
    }
}
