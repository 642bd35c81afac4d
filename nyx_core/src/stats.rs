use std::time::Instant;

use poise::serenity_prelude::Cache;
use serde::{Deserialize, Serialize};

use crate::data::database::Database;

/// Header carrying the shared secret for the stats endpoint.
pub const SECRET_HEADER: &str = "x-nyx-secret";

/// Aggregate numbers the bot exposes to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotStats {
    pub guilds: usize,
    pub users: usize,
    pub commands_run: u64,
    pub cached_guilds: usize,
    pub uptime_secs: u64,
    pub version: String,
}

impl BotStats {
    /// Current numbers of the running bot. `about` and the stats endpoint both use this.
    #[must_use]
    pub fn collect(cache: &Cache, database: &Database, commands_run: u64, started: Instant) -> Self {
        let guild_ids = cache.guilds();
        let members = guild_ids
            .iter()
            .filter_map(|id| cache.guild(*id).map(|guild| guild.member_count));

        Self {
            guilds: guild_ids.len(),
            users: member_total(members),
            commands_run,
            cached_guilds: database.guilds.len(),
            uptime_secs: started.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// `3d 4h 12m`.
    #[must_use]
    pub fn uptime(&self) -> String {
        let secs = self.uptime_secs;
        let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);

        if days > 0 {
            format!("{days}d {hours}h {minutes}m")
        } else if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m {}s", secs % 60)
        }
    }
}

/// Sum of guild member counts. Users in several guilds are counted once per guild.
fn member_total(counts: impl IntoIterator<Item = u64>) -> usize {
    let total = counts.into_iter().fold(0u64, u64::saturating_add);
    usize::try_from(total).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(uptime_secs: u64) -> BotStats {
        BotStats {
            guilds: 1,
            users: 2,
            commands_run: 3,
            cached_guilds: 1,
            uptime_secs,
            version: "0.4.0".to_owned(),
        }
    }

    #[test]
    fn members_are_summed_per_guild() {
        assert_eq!(member_total(Vec::<u64>::new()), 0);
        assert_eq!(member_total([10, 25, 1]), 36);
        assert_eq!(member_total([u64::MAX, 5]), usize::try_from(u64::MAX).unwrap_or(usize::MAX));
    }

    #[tokio::test]
    async fn collect_from_empty_cache() {
        use crate::data::settings::GuildDefaults;
        use sqlx::postgres::PgPoolOptions;

        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nyx@invalid.invalid/nyx")
            .unwrap();
        let database = Database::new(pool, GuildDefaults::default());
        let stats = BotStats::collect(&Cache::new(), &database, 7, Instant::now());

        assert_eq!((stats.guilds, stats.users, stats.cached_guilds), (0, 0, 0));
        assert_eq!(stats.commands_run, 7);
        assert_eq!(stats.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(stats(42).uptime(), "0m 42s");
        assert_eq!(stats(3 * 3600 + 120).uptime(), "3h 2m");
        assert_eq!(stats(2 * 86_400 + 3600).uptime(), "2d 1h 0m");
    }
}
