use chrono::{DateTime, Duration, Utc};
use poise::serenity_prelude::UserId;

pub const DAILY_REWARD: i64 = 250;

#[must_use]
pub fn daily_cooldown() -> Duration {
    Duration::hours(24)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyStatus {
    Ready,
    /// Time left until the reward can be claimed again.
    Wait(Duration),
}

#[must_use]
pub fn daily_status(last_claim: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DailyStatus {
    let Some(last_claim) = last_claim else {
        return DailyStatus::Ready;
    };

    let next = last_claim + daily_cooldown();
    if now >= next {
        DailyStatus::Ready
    } else {
        DailyStatus::Wait(next - now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyOutcome {
    Claimed { balance: i64 },
    Cooldown(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    NonPositive,
    SelfTransfer,
    InsufficientFunds { balance: i64, needed: i64 },
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferError::NonPositive => write!(f, "You can only send a positive amount."),
            TransferError::SelfTransfer => write!(f, "You can't pay yourself."),
            TransferError::InsufficientFunds { balance, needed } => write!(
                f,
                "You only have {balance} coins, {needed} are needed."
            ),
        }
    }
}

impl std::error::Error for TransferError {}

/// Checks the parts of a transfer that don't depend on stored balances.
pub fn validate_transfer(from: UserId, to: UserId, amount: i64) -> Result<(), TransferError> {
    if amount <= 0 {
        return Err(TransferError::NonPositive);
    }
    if from == to {
        return Err(TransferError::SelfTransfer);
    }
    Ok(())
}

/// `1h 5m`, `3m 20s`, `45s`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn first_daily_is_ready() {
        assert_eq!(daily_status(None, at(0)), DailyStatus::Ready);
    }

    #[test]
    fn daily_waits_a_full_day() {
        assert_eq!(
            daily_status(Some(at(0)), at(20)),
            DailyStatus::Wait(Duration::hours(4))
        );
        assert_eq!(
            daily_status(Some(at(0)), at(0) + Duration::hours(24)),
            DailyStatus::Ready
        );
    }

    #[test]
    fn transfer_rules() {
        let (a, b) = (UserId::new(1), UserId::new(2));
        assert_eq!(validate_transfer(a, b, 0), Err(TransferError::NonPositive));
        assert_eq!(validate_transfer(a, b, -3), Err(TransferError::NonPositive));
        assert_eq!(validate_transfer(a, a, 10), Err(TransferError::SelfTransfer));
        assert_eq!(validate_transfer(a, b, 10), Ok(()));
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::seconds(200)), "3m 20s");
        assert_eq!(format_duration(Duration::minutes(65)), "1h 5m");
        assert_eq!(format_duration(Duration::seconds(-4)), "0s");
    }
}
