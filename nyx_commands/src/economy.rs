use crate::utils::{guild_embed, say_embed, say_error};
use crate::{Context, Error};

use nyx_core::economy::{format_duration, validate_transfer, DailyOutcome, TransferError, DAILY_REWARD};
use nyx_core::embeds;
use nyx_core::emojis::Coin;
use poise::serenity_prelude as serenity;

/// Show how many coins someone has.
#[poise::command(slash_command, prefix_command, category = "Economy", aliases("bal", "coins"))]
pub async fn balance(
    ctx: Context<'_>,
    #[description = "User to check, yourself by default"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let user = user.as_ref().unwrap_or_else(|| ctx.author());
    let balance = ctx.data().database.balance(user.id).await?;

    let embed = guild_embed(ctx)
        .title(format!("{}'s balance", user.name))
        .description(format!("{} **{balance}** coins", Coin::STR));

    say_embed(ctx, embed).await
}

/// Claim your daily coins.
#[poise::command(slash_command, prefix_command, category = "Economy")]
pub async fn daily(ctx: Context<'_>) -> Result<(), Error> {
    let outcome = ctx
        .data()
        .database
        .claim_daily(ctx.author().id, DAILY_REWARD)
        .await?;

    match outcome {
        DailyOutcome::Claimed { balance } => {
            say_embed(
                ctx,
                embeds::success(format!(
                    "You claimed {} **{DAILY_REWARD}** coins. You now have **{balance}**.",
                    Coin::STR
                )),
            )
            .await
        }
        DailyOutcome::Cooldown(left) => {
            say_error(
                ctx,
                format!("You already claimed today. Come back in {}.", format_duration(left)),
            )
            .await
        }
    }
}

/// Give some of your coins to someone else.
#[poise::command(slash_command, prefix_command, category = "Economy", aliases("give"))]
pub async fn pay(
    ctx: Context<'_>,
    #[description = "Who to pay"] user: serenity::User,
    #[description = "How many coins"]
    #[min = 1]
    amount: i64,
) -> Result<(), Error> {
    if user.bot {
        return say_error(ctx, "Bots have no use for coins.").await;
    }
    if let Err(e) = validate_transfer(ctx.author().id, user.id, amount) {
        return say_error(ctx, e.to_string()).await;
    }

    let balance = match ctx
        .data()
        .database
        .transfer(ctx.author().id, user.id, amount)
        .await
    {
        Ok(balance) => balance,
        Err(e) => {
            return match e.downcast_ref::<TransferError>() {
                Some(e) => say_error(ctx, e.to_string()).await,
                None => Err(e),
            };
        }
    };

    say_embed(
        ctx,
        embeds::success(format!(
            "You sent {} **{amount}** coins to **{}**. You have **{balance}** left.",
            Coin::STR,
            user.name
        )),
    )
    .await
}

#[must_use]
pub fn commands() -> [crate::Command; 3] {
    [balance(), daily(), pay()]
}
