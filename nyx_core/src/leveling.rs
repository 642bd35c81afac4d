use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use dashmap::{mapref::entry::Entry, DashMap};
use poise::serenity_prelude::{GuildId, UserId};
use rand::Rng;

/// Minimum time between two XP grants for the same member.
pub const XP_COOLDOWN: Duration = Duration::from_secs(60);
/// XP granted per eligible message.
pub const XP_PER_MESSAGE: RangeInclusive<i64> = 15..=25;

/// XP required to go from `level` to `level + 1`.
#[must_use]
pub fn xp_to_next(level: u32) -> i64 {
    let l = i64::from(level);
    5 * l * l + 50 * l + 100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: u32,
    /// XP earned inside the current level.
    pub current: i64,
    /// XP the current level needs in total.
    pub needed: i64,
}

#[must_use]
pub fn level_from_xp(total: i64) -> LevelProgress {
    let mut level = 0;
    let mut remaining = total.max(0);

    loop {
        let needed = xp_to_next(level);
        if remaining < needed {
            return LevelProgress {
                level,
                current: remaining,
                needed,
            };
        }
        remaining -= needed;
        level += 1;
    }
}

/// Result of granting XP to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub total: i64,
    pub before: u32,
    pub after: u32,
}

impl LevelChange {
    #[must_use]
    pub fn new(previous_total: i64, total: i64) -> Self {
        Self {
            total,
            before: level_from_xp(previous_total).level,
            after: level_from_xp(total).level,
        }
    }

    #[must_use]
    pub fn levelled_up(&self) -> bool {
        self.after > self.before
    }
}

#[must_use]
pub fn roll_xp() -> i64 {
    rand::thread_rng().gen_range(XP_PER_MESSAGE)
}

/// Text progress bar such as `▰▰▰▱▱▱▱▱▱▱`.
#[must_use]
pub fn progress_bar(progress: &LevelProgress, width: usize) -> String {
    let filled = if progress.needed <= 0 {
        0
    } else {
        ((progress.current * width as i64) / progress.needed) as usize
    }
    .min(width);

    let mut bar = "▰".repeat(filled);
    bar.push_str(&"▱".repeat(width - filled));
    bar
}

#[derive(Default)]
pub struct XpCooldowns {
    last_grant: DashMap<(GuildId, UserId), Instant>,
}

impl XpCooldowns {
    /// Records a grant for the member at `now` if their cooldown has elapsed.
    pub fn try_claim(&self, guild_id: GuildId, user_id: UserId, now: Instant) -> bool {
        match self.last_grant.entry((guild_id, user_id)) {
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) >= XP_COOLDOWN {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drops entries whose cooldown has long expired.
    pub fn prune(&self, now: Instant) {
        self.last_grant
            .retain(|_, last| now.saturating_duration_since(*last) < XP_COOLDOWN);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.last_grant.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_grant.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_thresholds() {
        assert_eq!(xp_to_next(0), 100);
        assert_eq!(xp_to_next(1), 155);
        assert_eq!(xp_to_next(10), 1100);
    }

    #[test]
    fn progress_from_total() {
        assert_eq!(
            level_from_xp(0),
            LevelProgress {
                level: 0,
                current: 0,
                needed: 100
            }
        );
        assert_eq!(level_from_xp(99).level, 0);
        assert_eq!(level_from_xp(100).level, 1);
        assert_eq!(
            level_from_xp(300),
            LevelProgress {
                level: 2,
                current: 45,
                needed: 220
            }
        );
        assert_eq!(level_from_xp(-5).level, 0);
    }

    #[test]
    fn detects_level_up() {
        assert!(LevelChange::new(90, 110).levelled_up());
        assert!(!LevelChange::new(10, 30).levelled_up());
    }

    #[test]
    fn rolls_within_range() {
        for _ in 0..100 {
            assert!(XP_PER_MESSAGE.contains(&roll_xp()));
        }
    }

    #[test]
    fn bar_fills_proportionally() {
        let progress = LevelProgress {
            level: 1,
            current: 50,
            needed: 100,
        };
        assert_eq!(progress_bar(&progress, 10), "▰▰▰▰▰▱▱▱▱▱");

        let empty = LevelProgress {
            level: 0,
            current: 0,
            needed: 100,
        };
        assert_eq!(progress_bar(&empty, 4), "▱▱▱▱");
    }

    #[test]
    fn cooldown_blocks_repeat_grants() {
        let cooldowns = XpCooldowns::default();
        let guild = GuildId::new(1);
        let user = UserId::new(2);
        let start = Instant::now();

        assert!(cooldowns.try_claim(guild, user, start));
        assert!(!cooldowns.try_claim(guild, user, start + Duration::from_secs(30)));
        assert!(cooldowns.try_claim(guild, UserId::new(3), start + Duration::from_secs(30)));
        assert!(cooldowns.try_claim(guild, user, start + XP_COOLDOWN));
    }

    #[test]
    fn prune_removes_expired() {
        let cooldowns = XpCooldowns::default();
        let start = Instant::now();
        cooldowns.try_claim(GuildId::new(1), UserId::new(1), start);
        cooldowns.try_claim(GuildId::new(1), UserId::new(2), start + Duration::from_secs(50));

        cooldowns.prune(start + Duration::from_secs(70));
        assert_eq!(cooldowns.len(), 1);
    }
}
