use nyx_commands::utils::{bot_channel_permissions, handle_cooldown};
use nyx_core::data::structs::{Context, Data, Error};
use nyx_core::embeds;
use poise::serenity_prelude::{self as serenity, CreateAllowedMentions, Permissions};
use poise::CreateReply;

/// Whether the bot can answer with text, or at least react, where a prefix command ran.
enum Reply {
    Text,
    React,
    Nothing,
}

fn reply_mode(ctx: Context<'_>) -> Reply {
    let poise::Context::Prefix(_) = ctx else {
        return Reply::Text;
    };
    let Some(guild_id) = ctx.guild_id() else {
        return Reply::Text;
    };

    match bot_channel_permissions(ctx.serenity_context().cache.as_ref(), guild_id, ctx.channel_id()) {
        Some(p) if p.send_messages() => Reply::Text,
        Some(p) if p.add_reactions() => Reply::React,
        Some(_) => Reply::Nothing,
        // not cached, let the request decide
        None => Reply::Text,
    }
}

async fn react(ctx: Context<'_>, emoji: &str) {
    if let poise::Context::Prefix(pctx) = ctx {
        let _ = pctx
            .msg
            .react(ctx.http(), serenity::ReactionType::Unicode(emoji.to_owned()))
            .await;
    }
}

async fn handle_command_error(ctx: Context<'_>, error: Error) {
    tracing::error!(
        command = %ctx.command().qualified_name,
        guild = ?ctx.guild_id(),
        user = %ctx.author().id,
        error = %error,
        "Command failed"
    );
    let embed = embeds::error("Something went wrong while running this command.");
    let _ = ctx
        .send(CreateReply::default().embed(embed).ephemeral(true))
        .await;
}

async fn handle_command_check_failed(ctx: Context<'_>, error: Option<Error>) {
    match reply_mode(ctx) {
        Reply::Text => {
            let mut embed = serenity::CreateEmbed::new()
                .title("You do not have permission to access this command.")
                .colour(serenity::Colour::RED);
            if let Some(err) = error {
                embed = embed.description(err.to_string());
            }
            let _ = ctx
                .send(CreateReply::default().embed(embed).ephemeral(true))
                .await;
        }
        Reply::React => react(ctx, "❌").await,
        Reply::Nothing => {}
    }
}

async fn handle_argument_parse_error(ctx: Context<'_>, input: Option<String>, error: Error) {
    match reply_mode(ctx) {
        Reply::Text => {
            let response = argument_parse_text(
                input.as_deref(),
                &error.to_string(),
                ctx.command().help_text.as_deref(),
            );
            let mentions = CreateAllowedMentions::new()
                .everyone(false)
                .all_roles(false)
                .all_users(false);
            let _ = ctx
                .send(
                    CreateReply::default()
                        .content(response)
                        .allowed_mentions(mentions),
                )
                .await;
        }
        Reply::React => react(ctx, "❓").await,
        Reply::Nothing => {}
    }
}

fn argument_parse_text(input: Option<&str>, error: &str, help_text: Option<&str>) -> String {
    let usage = help_text.unwrap_or("Please check the help menu for usage information");
    match input {
        Some(input) => format!("**Cannot parse `{input}` as argument: {error}**\n{usage}"),
        None => format!("**{error}**\n{usage}"),
    }
}

/// `Ban Members, Manage Roles`.
fn permission_list(permissions: Permissions) -> String {
    permissions.get_permission_names().join(", ")
}

async fn send_ephemeral(ctx: Context<'_>, text: String) {
    let _ = ctx
        .send(CreateReply::default().content(text).ephemeral(true))
        .await;
}

pub async fn handler(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => handle_command_error(ctx, error).await,
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            handle_command_check_failed(ctx, error).await;
        }
        poise::FrameworkError::ArgumentParse {
            error, input, ctx, ..
        } => handle_argument_parse_error(ctx, input, error).await,
        poise::FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let text = match missing_permissions {
                Some(missing) => format!("You are missing permissions: {}", permission_list(missing)),
                None => "Could not check your permissions, please try again.".to_owned(),
            };
            send_ephemeral(ctx, text).await;
        }
        poise::FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let text = format!(
                "I need these permissions for `{}`: {}",
                ctx.command().name,
                permission_list(missing_permissions)
            );
            if let Reply::Text = reply_mode(ctx) {
                send_ephemeral(ctx, text).await;
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            tracing::error!(event = event.snake_case_name(), error = %error, "Event handler failed");
        }
        poise::FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            let _ = handle_cooldown(remaining_cooldown, ctx).await;
        }
        poise::FrameworkError::UnknownCommand { .. } => {}
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!(error = %e, "Error while handling error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_parse_messages() {
        assert_eq!(
            argument_parse_text(Some("abc"), "invalid digit", Some("Usage: n!purge <limit>")),
            "**Cannot parse `abc` as argument: invalid digit**\nUsage: n!purge <limit>"
        );
        assert_eq!(
            argument_parse_text(None, "Too many arguments", None),
            "**Too many arguments**\nPlease check the help menu for usage information"
        );
    }

    #[test]
    fn permission_names() {
        let text = permission_list(Permissions::BAN_MEMBERS | Permissions::MANAGE_ROLES);
        assert!(text.contains("Ban Members"));
        assert!(text.contains("Manage Roles"));
        assert!(text.contains(", "));
    }
}
