use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::cache::{PgSource, TableCache};
use crate::data::settings::{GuildDefaults, GuildSettings, ReactionRole, UserSettings};
use crate::data::structs::Error;
use crate::economy::{daily_status, validate_transfer, DailyOutcome, DailyStatus, TransferError};
use crate::leveling::LevelChange;

const GUILDS_QUERY: &str = "SELECT guild_id, prefix, embed_colour, blacklisted, welcome_channel, \
                            mod_log_channel, leveling_enabled FROM guild_config";
const USERS_QUERY: &str = "SELECT user_id, blacklisted FROM users";
const REACTION_ROLES_QUERY: &str = "SELECT guild_id, message_id, emoji, role_id FROM reaction_roles";

pub type GuildCache = TableCache<PgSource<GuildSettings>>;
pub type UserCache = TableCache<PgSource<UserSettings>>;
pub type ReactionRoleCache = TableCache<PgSource<ReactionRole>>;

/// The postgres pool together with the tables mirrored in memory.
pub struct Database {
    pub db: PgPool,
    pub guilds: GuildCache,
    pub users: UserCache,
    pub reaction_roles: ReactionRoleCache,
    defaults: RwLock<GuildDefaults>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelEntry {
    pub user_id: UserId,
    pub xp: i64,
    pub messages: i64,
    /// 1-based position in the guild.
    pub rank: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub id: i32,
    pub user_id: UserId,
    pub moderator_id: UserId,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Sizes of the tables, for the owner stats command.
#[derive(Debug, Clone, Default)]
pub struct TableCounts {
    pub counts: Vec<(&'static str, i64)>,
    pub database_bytes: i64,
}

/// Single `guild_config` columns a setter may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuildColumn {
    Prefix,
    EmbedColour,
    Blacklisted,
    WelcomeChannel,
    ModLogChannel,
    LevelingEnabled,
}

impl GuildColumn {
    fn name(self) -> &'static str {
        match self {
            GuildColumn::Prefix => "prefix",
            GuildColumn::EmbedColour => "embed_colour",
            GuildColumn::Blacklisted => "blacklisted",
            GuildColumn::WelcomeChannel => "welcome_channel",
            GuildColumn::ModLogChannel => "mod_log_channel",
            GuildColumn::LevelingEnabled => "leveling_enabled",
        }
    }
}

/// Inserts a full row, or on conflict updates only `column`, returning what is stored.
fn column_upsert_sql(column: GuildColumn) -> String {
    let column = column.name();
    format!(
        "INSERT INTO guild_config (guild_id, prefix, embed_colour, blacklisted, \
         welcome_channel, mod_log_channel, leveling_enabled)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (guild_id) DO UPDATE SET {column} = EXCLUDED.{column}
         RETURNING guild_id, prefix, embed_colour, blacklisted, welcome_channel, \
         mod_log_channel, leveling_enabled"
    )
}

/// Both sides of a transfer in the order their rows are locked.
fn lock_order(from: UserId, to: UserId) -> [i64; 2] {
    let (a, b) = (from.get() as i64, to.get() as i64);
    if a <= b {
        [a, b]
    } else {
        [b, a]
    }
}

impl Database {
    /// Connects, applies pending migrations and binds the caches. Nothing is cached yet.
    pub async fn connect(url: &str, defaults: GuildDefaults) -> Result<Self, Error> {
        let db = PgPoolOptions::new().max_connections(5).connect(url).await?;
        sqlx::migrate!("../migrations").run(&db).await?;
        tracing::info!("Database connected and migrations applied");

        Ok(Self::new(db, defaults))
    }

    #[must_use]
    pub fn new(db: PgPool, defaults: GuildDefaults) -> Self {
        Self {
            guilds: TableCache::new(PgSource::new(db.clone(), GUILDS_QUERY)),
            users: TableCache::new(PgSource::new(db.clone(), USERS_QUERY)),
            reaction_roles: TableCache::new(PgSource::new(db.clone(), REACTION_ROLES_QUERY)),
            db,
            defaults: RwLock::new(defaults),
        }
    }

    /// Prefix and colour of guilds without a row.
    #[must_use]
    pub fn defaults(&self) -> GuildDefaults {
        self.defaults.read().clone()
    }

    /// Swaps the defaults after a configuration reload.
    pub fn set_defaults(&self, defaults: GuildDefaults) {
        *self.defaults.write() = defaults;
    }

    /// Initial bulk load of every cache.
    pub async fn load_caches(&self) -> Result<(), Error> {
        let (guilds, users, roles) = tokio::try_join!(
            self.guilds.populate(),
            self.users.populate(),
            self.reaction_roles.populate(),
        )?;
        tracing::info!(guilds, users, reaction_roles = roles, "Settings caches populated");
        Ok(())
    }

    /// Replaces every cache with the current table contents.
    pub async fn refresh_caches(&self) -> Result<(usize, usize, usize), Error> {
        let counts = tokio::try_join!(
            self.guilds.refresh(),
            self.users.refresh(),
            self.reaction_roles.refresh(),
        )?;
        tracing::info!(
            guilds = counts.0,
            users = counts.1,
            reaction_roles = counts.2,
            "Settings caches refreshed"
        );
        Ok(counts)
    }

    /// Cached settings, or the defaults for guilds without a row.
    #[must_use]
    pub fn guild_settings(&self, guild_id: GuildId) -> GuildSettings {
        self.guilds
            .get_or_else(&guild_id, || GuildSettings::new(guild_id, &self.defaults()))
    }

    /// Makes sure a row exists for `guild_id`, returning its settings.
    pub async fn ensure_guild(&self, guild_id: GuildId) -> Result<GuildSettings, Error> {
        if let Some(settings) = self.guilds.get(&guild_id) {
            return Ok(settings);
        }

        let settings = GuildSettings::new(guild_id, &self.defaults());
        sqlx::query(
            "INSERT INTO guild_config (guild_id, prefix, embed_colour) VALUES ($1, $2, $3)
             ON CONFLICT (guild_id) DO NOTHING",
        )
        .bind(guild_id.get() as i64)
        .bind(&settings.prefix)
        .bind(settings.embed_colour as i32)
        .execute(&self.db)
        .await?;

        // another row may already have existed, read back what is stored.
        let stored = sqlx::query_as::<_, GuildSettings>(&format!("{GUILDS_QUERY} WHERE guild_id = $1"))
            .bind(guild_id.get() as i64)
            .fetch_one(&self.db)
            .await?;

        self.guilds.insert(stored.clone());
        Ok(stored)
    }

    pub async fn remove_guild(&self, guild_id: GuildId) -> Result<(), Error> {
        sqlx::query("DELETE FROM guild_config WHERE guild_id = $1")
            .bind(guild_id.get() as i64)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM reaction_roles WHERE guild_id = $1")
            .bind(guild_id.get() as i64)
            .execute(&self.db)
            .await?;

        self.guilds.remove(&guild_id);
        for key in self
            .reaction_roles
            .filter(|rr| rr.guild_id == guild_id)
            .iter()
            .map(|rr| (rr.message_id, rr.emoji.clone()))
        {
            self.reaction_roles.remove(&key);
        }
        Ok(())
    }

    /// Writes one column of a guild's row and mirrors the stored row into the cache.
    ///
    /// A guild without a row gets one built from the defaults plus `change`. Existing rows
    /// only have `column` touched, so concurrent changes to other columns survive.
    async fn set_guild_column(
        &self,
        guild_id: GuildId,
        column: GuildColumn,
        change: impl FnOnce(&mut GuildSettings),
    ) -> Result<GuildSettings, Error> {
        let mut fresh = GuildSettings::new(guild_id, &self.defaults());
        change(&mut fresh);

        let stored = sqlx::query_as::<_, GuildSettings>(&column_upsert_sql(column))
            .bind(guild_id.get() as i64)
            .bind(&fresh.prefix)
            .bind(fresh.embed_colour as i32)
            .bind(fresh.blacklisted)
            .bind(fresh.welcome_channel.map(|c| c.get() as i64))
            .bind(fresh.mod_log_channel.map(|c| c.get() as i64))
            .bind(fresh.leveling_enabled)
            .fetch_one(&self.db)
            .await?;

        self.guilds.insert(stored.clone());
        Ok(stored)
    }

    pub async fn set_prefix(&self, guild_id: GuildId, prefix: String) -> Result<GuildSettings, Error> {
        self.set_guild_column(guild_id, GuildColumn::Prefix, |s| s.prefix = prefix)
            .await
    }

    pub async fn set_embed_colour(&self, guild_id: GuildId, colour: u32) -> Result<GuildSettings, Error> {
        self.set_guild_column(guild_id, GuildColumn::EmbedColour, |s| s.embed_colour = colour)
            .await
    }

    pub async fn set_guild_blacklist(&self, guild_id: GuildId, blacklisted: bool) -> Result<GuildSettings, Error> {
        self.set_guild_column(guild_id, GuildColumn::Blacklisted, |s| s.blacklisted = blacklisted)
            .await
    }

    pub async fn set_welcome_channel(
        &self,
        guild_id: GuildId,
        channel: Option<ChannelId>,
    ) -> Result<GuildSettings, Error> {
        self.set_guild_column(guild_id, GuildColumn::WelcomeChannel, |s| s.welcome_channel = channel)
            .await
    }

    pub async fn set_mod_log_channel(
        &self,
        guild_id: GuildId,
        channel: Option<ChannelId>,
    ) -> Result<GuildSettings, Error> {
        self.set_guild_column(guild_id, GuildColumn::ModLogChannel, |s| s.mod_log_channel = channel)
            .await
    }

    pub async fn set_leveling(&self, guild_id: GuildId, enabled: bool) -> Result<GuildSettings, Error> {
        self.set_guild_column(guild_id, GuildColumn::LevelingEnabled, |s| s.leveling_enabled = enabled)
            .await
    }

    #[must_use]
    pub fn is_user_blacklisted(&self, user_id: UserId) -> bool {
        self.users
            .get_or(&user_id, UserSettings::new(user_id))
            .blacklisted
    }

    pub async fn set_user_blacklist(&self, user_id: UserId, blacklisted: bool) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO users (user_id, blacklisted) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET blacklisted = EXCLUDED.blacklisted",
        )
        .bind(user_id.get() as i64)
        .bind(blacklisted)
        .execute(&self.db)
        .await?;

        self.users.insert(UserSettings {
            user_id,
            blacklisted,
        });
        Ok(())
    }

    /// Adds XP to a member, returning their totals before and after.
    pub async fn add_xp(&self, guild_id: GuildId, user_id: UserId, amount: i64) -> Result<LevelChange, Error> {
        let total: i64 = sqlx::query(
            "INSERT INTO levels (guild_id, user_id, xp, messages) VALUES ($1, $2, $3, 1)
             ON CONFLICT (guild_id, user_id) DO UPDATE
             SET xp = levels.xp + EXCLUDED.xp, messages = levels.messages + 1
             RETURNING xp",
        )
        .bind(guild_id.get() as i64)
        .bind(user_id.get() as i64)
        .bind(amount)
        .fetch_one(&self.db)
        .await?
        .try_get("xp")?;

        Ok(LevelChange::new(total - amount, total))
    }

    pub async fn level_entry(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<LevelEntry>, Error> {
        let row = sqlx::query(
            "SELECT l.xp, l.messages,
             (SELECT COUNT(*) FROM levels o WHERE o.guild_id = l.guild_id AND o.xp > l.xp) + 1 AS rank
             FROM levels l WHERE l.guild_id = $1 AND l.user_id = $2",
        )
        .bind(guild_id.get() as i64)
        .bind(user_id.get() as i64)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(LevelEntry {
            user_id,
            xp: row.try_get("xp")?,
            messages: row.try_get("messages")?,
            rank: row.try_get("rank")?,
        }))
    }

    pub async fn leaderboard(&self, guild_id: GuildId, limit: i64) -> Result<Vec<LevelEntry>, Error> {
        let rows = sqlx::query(
            "SELECT user_id, xp, messages FROM levels WHERE guild_id = $1
             ORDER BY xp DESC LIMIT $2",
        )
        .bind(guild_id.get() as i64)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                Ok(LevelEntry {
                    user_id: UserId::new(row.try_get::<i64, _>("user_id")? as u64),
                    xp: row.try_get("xp")?,
                    messages: row.try_get("messages")?,
                    rank: i as i64 + 1,
                })
            })
            .collect()
    }

    pub async fn balance(&self, user_id: UserId) -> Result<i64, Error> {
        let balance = sqlx::query("SELECT balance FROM economy WHERE user_id = $1")
            .bind(user_id.get() as i64)
            .fetch_optional(&self.db)
            .await?
            .map(|row| row.try_get::<i64, _>("balance"))
            .transpose()?;

        Ok(balance.unwrap_or(0))
    }

    /// Pays out the daily reward unless it was claimed in the last 24 hours.
    pub async fn claim_daily(&self, user_id: UserId, reward: i64) -> Result<DailyOutcome, Error> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let last: Option<DateTime<Utc>> =
            sqlx::query("SELECT last_daily FROM economy WHERE user_id = $1 FOR UPDATE")
                .bind(user_id.get() as i64)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.try_get::<Option<DateTime<Utc>>, _>("last_daily"))
                .transpose()?
                .flatten();

        if let DailyStatus::Wait(left) = daily_status(last, now) {
            return Ok(DailyOutcome::Cooldown(left));
        }

        let balance: i64 = sqlx::query(
            "INSERT INTO economy (user_id, balance, last_daily) VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO UPDATE
             SET balance = economy.balance + EXCLUDED.balance, last_daily = EXCLUDED.last_daily
             RETURNING balance",
        )
        .bind(user_id.get() as i64)
        .bind(reward)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?
        .try_get("balance")?;

        tx.commit().await?;
        Ok(DailyOutcome::Claimed { balance })
    }

    /// Moves `amount` coins between users atomically, returning the sender's new balance.
    pub async fn transfer(&self, from: UserId, to: UserId, amount: i64) -> Result<i64, Error> {
        validate_transfer(from, to, amount)?;

        let mut tx = self.db.begin().await?;
        let locked = sqlx::query(
            "SELECT user_id, balance FROM economy WHERE user_id = ANY($1) ORDER BY user_id FOR UPDATE",
        )
        .bind(lock_order(from, to).to_vec())
        .fetch_all(&mut *tx)
        .await?;

        let mut balance = 0;
        for row in &locked {
            if row.try_get::<i64, _>("user_id")? == from.get() as i64 {
                balance = row.try_get("balance")?;
            }
        }

        if balance < amount {
            return Err(TransferError::InsufficientFunds {
                balance,
                needed: amount,
            }
            .into());
        }

        sqlx::query("UPDATE economy SET balance = balance - $2 WHERE user_id = $1")
            .bind(from.get() as i64)
            .bind(amount)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO economy (user_id, balance) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET balance = economy.balance + EXCLUDED.balance",
        )
        .bind(to.get() as i64)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(balance - amount)
    }

    pub async fn add_warning(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        moderator_id: UserId,
        reason: &str,
    ) -> Result<i64, Error> {
        sqlx::query(
            "INSERT INTO warnings (guild_id, user_id, moderator_id, reason) VALUES ($1, $2, $3, $4)",
        )
        .bind(guild_id.get() as i64)
        .bind(user_id.get() as i64)
        .bind(moderator_id.get() as i64)
        .bind(reason)
        .execute(&self.db)
        .await?;

        let count: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM warnings WHERE guild_id = $1 AND user_id = $2",
        )
        .bind(guild_id.get() as i64)
        .bind(user_id.get() as i64)
        .fetch_one(&self.db)
        .await?
        .try_get("count")?;

        Ok(count)
    }

    pub async fn warnings(&self, guild_id: GuildId, user_id: UserId) -> Result<Vec<Warning>, Error> {
        let rows = sqlx::query(
            "SELECT id, user_id, moderator_id, reason, created_at FROM warnings
             WHERE guild_id = $1 AND user_id = $2 ORDER BY created_at DESC",
        )
        .bind(guild_id.get() as i64)
        .bind(user_id.get() as i64)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Warning {
                    id: row.try_get("id")?,
                    user_id: UserId::new(row.try_get::<i64, _>("user_id")? as u64),
                    moderator_id: UserId::new(row.try_get::<i64, _>("moderator_id")? as u64),
                    reason: row.try_get("reason")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    pub async fn clear_warnings(&self, guild_id: GuildId, user_id: UserId) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM warnings WHERE guild_id = $1 AND user_id = $2")
            .bind(guild_id.get() as i64)
            .bind(user_id.get() as i64)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn add_reaction_role(&self, reaction_role: ReactionRole) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO reaction_roles (guild_id, message_id, emoji, role_id) VALUES ($1, $2, $3, $4)
             ON CONFLICT (message_id, emoji) DO UPDATE SET role_id = EXCLUDED.role_id",
        )
        .bind(reaction_role.guild_id.get() as i64)
        .bind(reaction_role.message_id.get() as i64)
        .bind(&reaction_role.emoji)
        .bind(reaction_role.role_id.get() as i64)
        .execute(&self.db)
        .await?;

        self.reaction_roles.insert(reaction_role);
        Ok(())
    }

    /// Returns false if no such reaction role existed.
    /// Only removes the reaction role when it belongs to `guild_id`.
    pub async fn remove_reaction_role(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            "DELETE FROM reaction_roles WHERE message_id = $1 AND emoji = $2 AND guild_id = $3",
        )
        .bind(message_id.get() as i64)
        .bind(emoji)
        .bind(guild_id.get() as i64)
        .execute(&self.db)
        .await?;

        let key = (message_id, emoji.to_owned());
        if self.reaction_roles.get(&key).is_some_and(|rr| rr.guild_id == guild_id) {
            self.reaction_roles.remove(&key);
        }
        Ok(result.rows_affected() > 0)
    }

    #[must_use]
    pub fn reaction_role(&self, message_id: MessageId, emoji: &str) -> Option<RoleId> {
        self.reaction_roles
            .get(&(message_id, emoji.to_owned()))
            .map(|rr| rr.role_id)
    }

    #[must_use]
    pub fn reaction_roles_for(&self, guild_id: GuildId) -> Vec<ReactionRole> {
        let mut roles = self.reaction_roles.filter(|rr| rr.guild_id == guild_id);
        roles.sort_by_key(|rr| rr.message_id);
        roles
    }

    pub async fn table_counts(&self) -> Result<TableCounts, Error> {
        let mut counts = Vec::new();
        for table in ["guild_config", "users", "levels", "economy", "warnings", "reaction_roles"] {
            let count: i64 = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table}"))
                .fetch_one(&self.db)
                .await?
                .try_get("count")?;
            counts.push((table, count));
        }

        let database_bytes: i64 = sqlx::query("SELECT pg_database_size(current_database()) AS size")
            .fetch_one(&self.db)
            .await?
            .try_get("size")?;

        Ok(TableCounts {
            counts,
            database_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// A database whose every query fails, with empty caches.
    fn unreachable_database() -> Database {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy("postgres://nyx@invalid.invalid/nyx")
            .unwrap();
        Database::new(
            pool,
            GuildDefaults {
                prefix: "n!".to_owned(),
                embed_colour: 0x112233,
            },
        )
    }

    #[test]
    fn upsert_only_touches_its_column() {
        let sql = column_upsert_sql(GuildColumn::Prefix);
        assert!(sql.contains("DO UPDATE SET prefix = EXCLUDED.prefix\n"));
        assert!(!sql.contains("embed_colour = EXCLUDED"));
        assert!(sql.contains("RETURNING guild_id"));

        let sql = column_upsert_sql(GuildColumn::LevelingEnabled);
        assert!(sql.contains("SET leveling_enabled = EXCLUDED.leveling_enabled\n"));
        assert!(!sql.contains("prefix = EXCLUDED"));
        assert_eq!(sql.matches(" = EXCLUDED.").count(), 1);
    }

    #[test]
    fn transfer_locks_in_ascending_order() {
        let (low, high) = (UserId::new(5), UserId::new(900));
        assert_eq!(lock_order(low, high), [5, 900]);
        assert_eq!(lock_order(high, low), [5, 900]);
    }

    #[tokio::test]
    async fn unknown_ids_resolve_to_defaults() {
        let database = unreachable_database();
        let guild_id = GuildId::new(42);

        let settings = database.guild_settings(guild_id);
        assert_eq!(settings, GuildSettings::new(guild_id, &database.defaults()));
        assert_eq!(settings.prefix, "n!");
        assert_eq!(settings.embed_colour, 0x112233);
        assert!(!database.is_user_blacklisted(UserId::new(7)));
    }

    #[tokio::test]
    async fn reloaded_defaults_apply_to_guilds_without_rows() {
        let database = unreachable_database();
        let stored = GuildSettings::new(GuildId::new(1), &database.defaults());
        database.guilds.insert(stored.clone());

        database.set_defaults(GuildDefaults {
            prefix: "?".to_owned(),
            embed_colour: 0xABCDEF,
        });

        let fresh = database.guild_settings(GuildId::new(2));
        assert_eq!((fresh.prefix.as_str(), fresh.embed_colour), ("?", 0xABCDEF));
        assert_eq!(database.guild_settings(GuildId::new(1)), stored);
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_untouched() {
        let database = unreachable_database();
        let cached = GuildSettings {
            prefix: "!".to_owned(),
            ..GuildSettings::new(GuildId::new(1), &database.defaults())
        };
        database.guilds.insert(cached.clone());

        assert!(database.set_prefix(GuildId::new(1), "?".to_owned()).await.is_err());
        assert!(database.set_leveling(GuildId::new(1), false).await.is_err());
        assert_eq!(database.guild_settings(GuildId::new(1)), cached);

        assert!(database.set_prefix(GuildId::new(2), "?".to_owned()).await.is_err());
        assert!(!database.guilds.contains(&GuildId::new(2)));
        assert_eq!(database.guild_settings(GuildId::new(2)).prefix, "n!");

        assert!(database.set_user_blacklist(UserId::new(3), true).await.is_err());
        assert!(!database.is_user_blacklisted(UserId::new(3)));
    }
}
