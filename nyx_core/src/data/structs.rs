use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Instant;

use poise::serenity_prelude::GuildId;

use crate::config::BotConfig;
use crate::data::database::Database;
use crate::data::settings::GuildSettings;
use crate::leveling::XpCooldowns;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type PrefixContext<'a> = poise::PrefixContext<'a, Data, Error>;
pub type FrameworkContext<'a> = poise::FrameworkContext<'a, Data, Error>;
pub type Command = poise::Command<Data, Error>;

pub struct Data {
    /// If the bots startup has been handled in the `ready` event.
    pub has_started: AtomicBool,
    /// Time the bot started.
    pub time_started: Instant,
    /// Wrapper for the bots database with helper functions and the settings caches.
    pub database: Arc<Database>,
    /// Http client for third party apis.
    pub reqwest: reqwest::Client,
    /// Bot configuration, re-read by the owner `reload` command.
    pub config: RwLock<BotConfig>,
    /// Per member leveling cooldowns.
    pub xp_cooldowns: XpCooldowns,
    /// Commands completed since startup, shared with the stats endpoint.
    pub commands_run: Arc<AtomicU64>,
}

impl Data {
    #[must_use]
    pub fn new(database: Arc<Database>, config: BotConfig, reqwest: reqwest::Client) -> Self {
        Self {
            has_started: AtomicBool::new(false),
            time_started: Instant::now(),
            database,
            reqwest,
            config: RwLock::new(config),
            xp_cooldowns: XpCooldowns::default(),
            commands_run: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached settings for `guild_id`, or the defaults if it has no row.
    #[must_use]
    pub fn guild_settings(&self, guild_id: GuildId) -> GuildSettings {
        self.database.guild_settings(guild_id)
    }

    /// Embed colour for replies in `guild_id`, the configured default in DMs.
    #[must_use]
    pub fn embed_colour(&self, guild_id: Option<GuildId>) -> u32 {
        match guild_id {
            Some(guild_id) => self.database.guild_settings(guild_id).embed_colour,
            None => self.database.defaults().embed_colour,
        }
    }
}
