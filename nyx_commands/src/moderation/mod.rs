pub mod purge;

use crate::utils::{guild_embed, moderation_target, say_embed, say_error, send_mod_log};
use crate::{Context, Error};

use chrono::{Duration, Utc};
use nyx_core::economy::format_duration;
use nyx_core::embeds;
use poise::serenity_prelude::{self as serenity, Mentionable};

/// Discord caps timeouts at 28 days.
const MAX_TIMEOUT_DAYS: i64 = 28;
/// Discord caps slowmode at 6 hours.
const MAX_SLOWMODE_SECS: u16 = 21600;
/// Audit log reasons are limited to 512 characters.
const MAX_REASON_LEN: usize = 512;

/// Discord keeps an expired timeout on the member until it is cleared.
fn timed_out(until: Option<serenity::Timestamp>, now: serenity::Timestamp) -> bool {
    until.is_some_and(|until| until > now)
}

fn reason_or_default(reason: Option<String>) -> String {
    let reason = reason
        .map(|r| r.trim().to_owned())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "No reason given".to_owned());
    reason.chars().take(MAX_REASON_LEN).collect()
}

fn audit_reason(ctx: Context<'_>, reason: &str) -> String {
    let reason = format!("{} ({}): {reason}", ctx.author().name, ctx.author().id);
    reason.chars().take(MAX_REASON_LEN).collect()
}

/// Runs the hierarchy check, replying with the reason when it fails.
async fn can_target(ctx: Context<'_>, target: serenity::UserId) -> Result<bool, Error> {
    match moderation_target(ctx, target) {
        Ok(()) => Ok(true),
        Err(why) => {
            say_error(ctx, why.to_string()).await?;
            Ok(false)
        }
    }
}

async fn log_action(ctx: Context<'_>, action: &str, target: &serenity::User, reason: Option<&str>) {
    tracing::info!(
        guild = ?ctx.guild_id(),
        moderator = %ctx.author().id,
        target = %target.id,
        action,
        "Moderation action"
    );

    let mut embed = embeds::moderation(action, &ctx.author().tag()).field(
        "User",
        format!("{} ({})", target.mention(), target.id),
        true,
    );
    if let Some(reason) = reason {
        embed = embed.field("Reason", reason, false);
    }
    send_mod_log(ctx, embed).await;
}

/// Kick a member from the server.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "KICK_MEMBERS",
    required_bot_permissions = "KICK_MEMBERS"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] member: serenity::Member,
    #[description = "Why they are being kicked"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    if !can_target(ctx, member.user.id).await? {
        return Ok(());
    }

    let reason = reason_or_default(reason);
    member
        .kick_with_reason(ctx.http(), &audit_reason(ctx, &reason))
        .await?;

    say_embed(
        ctx,
        embeds::success(format!("Kicked **{}**.", member.user.tag())),
    )
    .await?;
    log_action(ctx, "Kick", &member.user, Some(&reason)).await;
    Ok(())
}

/// Ban a user from the server.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Days of messages to delete (0-7)"]
    #[min = 0]
    #[max = 7]
    delete_days: Option<u8>,
    #[description = "Why they are being banned"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if !can_target(ctx, user.id).await? {
        return Ok(());
    }

    let reason = reason_or_default(reason);
    let delete_days = delete_days.unwrap_or(0).min(7);
    guild_id
        .ban_with_reason(ctx.http(), user.id, delete_days, &audit_reason(ctx, &reason))
        .await?;

    say_embed(ctx, embeds::success(format!("Banned **{}**.", user.tag()))).await?;
    log_action(ctx, "Ban", &user, Some(&reason)).await;
    Ok(())
}

/// Lift a ban.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "User to unban"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    if let Err(e) = guild_id.unban(ctx.http(), user.id).await {
        tracing::debug!(error = %e, "Unban failed");
        return say_error(ctx, format!("**{}** is not banned.", user.tag())).await;
    }

    say_embed(ctx, embeds::success(format!("Unbanned **{}**.", user.tag()))).await?;
    log_action(ctx, "Unban", &user, None).await;
    Ok(())
}

fn parse_amount(number: &str) -> Option<i64> {
    number.parse().ok().filter(|n| *n <= 1_000_000)
}

/// Parses durations like `10m`, `1h30m` or `2d`.
fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_ascii_lowercase();
    if input.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    let mut number = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        if c.is_whitespace() {
            continue;
        }

        let value = parse_amount(&number)?;
        number.clear();
        total += match c {
            's' => Duration::seconds(value),
            'm' => Duration::minutes(value),
            'h' => Duration::hours(value),
            'd' => Duration::days(value),
            'w' => Duration::weeks(value),
            _ => return None,
        };
    }

    // a bare number is minutes.
    if !number.is_empty() {
        total += Duration::minutes(parse_amount(&number)?);
    }

    (total > Duration::zero()).then_some(total)
}

/// Time a member out.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "MODERATE_MEMBERS",
    aliases("mute")
)]
pub async fn timeout(
    ctx: Context<'_>,
    #[description = "Member to time out"] member: serenity::Member,
    #[description = "How long, like 10m, 1h30m or 2d"] duration: String,
    #[description = "Why they are being timed out"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if !can_target(ctx, member.user.id).await? {
        return Ok(());
    }

    let Some(duration) = parse_duration(&duration) else {
        return say_error(ctx, format!("`{duration}` is not a duration like `10m` or `1h30m`.")).await;
    };
    if duration > Duration::days(MAX_TIMEOUT_DAYS) {
        return say_error(ctx, format!("Timeouts can last at most {MAX_TIMEOUT_DAYS} days.")).await;
    }

    let reason = reason_or_default(reason);
    let until = serenity::Timestamp::from(Utc::now() + duration);
    guild_id
        .edit_member(
            ctx,
            member.user.id,
            serenity::EditMember::new()
                .disable_communication_until_datetime(until)
                .audit_log_reason(&audit_reason(ctx, &reason)),
        )
        .await?;

    say_embed(
        ctx,
        embeds::success(format!(
            "Timed out **{}** for {}.",
            member.user.tag(),
            format_duration(duration)
        )),
    )
    .await?;
    log_action(
        ctx,
        &format!("Timeout ({})", format_duration(duration)),
        &member.user,
        Some(&reason),
    )
    .await;
    Ok(())
}

/// Remove a member's timeout.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "MODERATE_MEMBERS",
    aliases("unmute")
)]
pub async fn untimeout(
    ctx: Context<'_>,
    #[description = "Member to release"] member: serenity::Member,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    if !timed_out(member.communication_disabled_until, serenity::Timestamp::now()) {
        return say_error(ctx, format!("**{}** is not timed out.", member.user.tag())).await;
    }

    guild_id
        .edit_member(
            ctx,
            member.user.id,
            serenity::EditMember::new().enable_communication(),
        )
        .await?;

    say_embed(
        ctx,
        embeds::success(format!("Removed the timeout of **{}**.", member.user.tag())),
    )
    .await?;
    log_action(ctx, "Timeout removed", &member.user, None).await;
    Ok(())
}

/// Set the slowmode of this channel. 0 turns it off.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "MANAGE_CHANNELS",
    required_bot_permissions = "MANAGE_CHANNELS"
)]
pub async fn slowmode(
    ctx: Context<'_>,
    #[description = "Seconds between messages (0-21600)"] seconds: u16,
) -> Result<(), Error> {
    if seconds > MAX_SLOWMODE_SECS {
        return say_error(ctx, "Slowmode can be at most 6 hours (21600 seconds).").await;
    }

    ctx.channel_id()
        .edit(ctx, serenity::EditChannel::new().rate_limit_per_user(seconds))
        .await?;

    let description = if seconds == 0 {
        "Slowmode disabled.".to_owned()
    } else {
        format!("Slowmode set to {seconds} seconds.")
    };
    say_embed(ctx, embeds::success(&description)).await?;

    send_mod_log(
        ctx,
        embeds::moderation("Slowmode", &ctx.author().tag())
            .field("Channel", ctx.channel_id().mention().to_string(), true)
            .field("Delay", format!("{seconds}s"), true),
    )
    .await;
    Ok(())
}

/// Warn a member. Warnings are kept until cleared.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member to warn"] member: serenity::Member,
    #[description = "Why they are being warned"]
    #[rest]
    reason: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if !can_target(ctx, member.user.id).await? {
        return Ok(());
    }

    let reason = reason_or_default(Some(reason));
    let count = ctx
        .data()
        .database
        .add_warning(guild_id, member.user.id, ctx.author().id, &reason)
        .await?;

    say_embed(
        ctx,
        embeds::warning(format!(
            "Warned **{}**. They now have {count} warning{}.",
            member.user.tag(),
            if count == 1 { "" } else { "s" }
        )),
    )
    .await?;
    log_action(ctx, "Warn", &member.user, Some(&reason)).await;
    Ok(())
}

/// List a member's warnings.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn warnings(
    ctx: Context<'_>,
    #[description = "Member to look up"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let warnings = ctx.data().database.warnings(guild_id, user.id).await?;
    if warnings.is_empty() {
        return say_embed(ctx, embeds::info(format!("**{}** has no warnings.", user.tag()))).await;
    }

    let mut embed = guild_embed(ctx).title(format!(
        "{} warning{} for {}",
        warnings.len(),
        if warnings.len() == 1 { "" } else { "s" },
        user.tag()
    ));

    // embeds hold at most 25 fields.
    for warning in warnings.iter().take(25) {
        embed = embed.field(
            format!("#{}  <t:{}:d>", warning.id, warning.created_at.timestamp()),
            format!("{}\nby {}", warning.reason, warning.moderator_id.mention()),
            false,
        );
    }

    say_embed(ctx, embed).await
}

/// Delete every warning of a member.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn clearwarns(
    ctx: Context<'_>,
    #[description = "Member to clear"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let cleared = ctx.data().database.clear_warnings(guild_id, user.id).await?;
    if cleared == 0 {
        return say_embed(ctx, embeds::info(format!("**{}** has no warnings.", user.tag()))).await;
    }

    say_embed(
        ctx,
        embeds::success(format!("Cleared {cleared} warnings of **{}**.", user.tag())),
    )
    .await?;
    log_action(ctx, "Warnings cleared", &user, None).await;
    Ok(())
}

#[must_use]
pub fn commands() -> [crate::Command; 10] {
    [
        kick(),
        ban(),
        unban(),
        timeout(),
        untimeout(),
        purge::purge(),
        slowmode(),
        warn(),
        warnings(),
        clearwarns(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("10m"), Some(Duration::minutes(10)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("2D"), Some(Duration::days(2)));
        assert_eq!(parse_duration("1w 2d"), Some(Duration::days(9)));
        assert_eq!(parse_duration("45"), Some(Duration::minutes(45)));
        assert_eq!(parse_duration("90s"), Some(Duration::seconds(90)));
    }

    #[test]
    fn bad_durations() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("10x"), None);
        assert_eq!(parse_duration("0m"), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("99999999999999999999d"), None);
    }

    #[test]
    fn reasons() {
        assert_eq!(reason_or_default(None), "No reason given");
        assert_eq!(reason_or_default(Some("  ".to_owned())), "No reason given");
        assert_eq!(reason_or_default(Some(" spam ".to_owned())), "spam");
        assert_eq!(
            reason_or_default(Some("a".repeat(600))).len(),
            MAX_REASON_LEN
        );
    }

    #[test]
    fn expired_timeouts_are_not_active() {
        let now = Utc::now();
        let at = |offset: Duration| serenity::Timestamp::from(now + offset);

        assert!(timed_out(Some(at(Duration::minutes(5))), at(Duration::zero())));
        assert!(!timed_out(Some(at(Duration::minutes(-5))), at(Duration::zero())));
        assert!(!timed_out(Some(at(Duration::zero())), at(Duration::zero())));
        assert!(!timed_out(None, at(Duration::zero())));
    }
}
