use std::sync::LazyLock;

use crate::utils::{say_error, send_mod_log};
use crate::{Context, Error};

use nyx_core::embeds;
use poise::serenity_prelude::{self as serenity, Mentionable, MessageId, UserId};
use poise::CreateReply;
use regex::Regex;

pub static INVITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(discord\.gg|discord(?:app)?\.com/invite)/[a-z0-9-]+").unwrap()
});

static USER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(<@!?(\d+)>)|(\d{16,20})").unwrap());

/// Bulk deletes only accept messages younger than two weeks.
const MAX_MESSAGE_AGE_SECS: i64 = 14 * 24 * 60 * 60 - 60;

/// Purge messages in a channel.
///
/// Filters follow the count: `user @someone`, `bots`, `links`, `invites`,
/// `attachments`, `match <text>`, `startswith <text>` and `endswith <text>`. Prefix a
/// filter with `!` to invert it. Text filters take the rest of the input.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Moderation",
    guild_only,
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "MANAGE_MESSAGES | VIEW_CHANNEL | READ_MESSAGE_HISTORY",
    aliases("clear", "prune")
)]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "How many messages to look through (2-100)"] limit: u8,
    #[description = "Filters, like `user @someone !bots`"]
    #[rest]
    filters: Option<String>,
) -> Result<(), Error> {
    if !(2..=100).contains(&limit) {
        return say_error(ctx, "I can only look through 2 to 100 messages.").await;
    }

    let filters = match filters.as_deref().map(parse_filters).transpose() {
        Ok(filters) => filters.unwrap_or_default(),
        Err(e) => return say_error(ctx, e.to_string()).await,
    };

    let mut builder = serenity::GetMessages::new().limit(limit);
    let invocation = match ctx {
        poise::Context::Prefix(prefix) => Some(prefix.msg.id),
        poise::Context::Application(_) => None,
    };
    if let Some(invocation) = invocation {
        builder = builder.before(invocation);
    }

    let messages = ctx.channel_id().messages(ctx, builder).await?;
    let now = serenity::Timestamp::now().unix_timestamp();

    let selected: Vec<MessageId> = messages
        .iter()
        .filter(|msg| now - msg.timestamp.unix_timestamp() < MAX_MESSAGE_AGE_SECS)
        .filter(|msg| selects(&filters, &MessageView::from(*msg)))
        .map(|msg| msg.id)
        .collect();

    if selected.is_empty() {
        return say_error(ctx, "No recent messages matched.").await;
    }

    let count = selected.len();
    if let Some(invocation) = invocation {
        let _ = ctx.channel_id().delete_message(ctx.http(), invocation).await;
    }

    ctx.channel_id()
        .delete_messages(ctx.http(), &selected)
        .await?;

    tracing::info!(
        guild = ?ctx.guild_id(),
        channel = %ctx.channel_id(),
        moderator = %ctx.author().id,
        count,
        "Purged messages"
    );

    let reply = CreateReply::default()
        .embed(embeds::success(format!("Deleted {count} messages.")))
        .ephemeral(true);
    let handle = ctx.send(reply).await?;

    send_mod_log(
        ctx,
        embeds::moderation("Purge", &ctx.author().tag())
            .field("Channel", ctx.channel_id().mention().to_string(), true)
            .field("Messages", count.to_string(), true),
    )
    .await;

    // prefix replies are not ephemeral, clean them up.
    if invocation.is_some() {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        let _ = handle.delete(ctx).await;
    }

    Ok(())
}

/// What purge filters look at.
#[derive(Debug, Clone, Copy)]
pub struct MessageView<'a> {
    pub author: UserId,
    pub bot: bool,
    pub content: &'a str,
    pub has_attachments: bool,
}

impl<'a> From<&'a serenity::Message> for MessageView<'a> {
    fn from(msg: &'a serenity::Message) -> Self {
        Self {
            author: msg.author.id,
            bot: msg.author.bot,
            content: &msg.content,
            has_attachments: !msg.attachments.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    User(Vec<UserId>),
    Bots,
    Links,
    Invites,
    Attachments,
    Match(String),
    StartsWith(String),
    EndsWith(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub modifier: Modifier,
    pub negated: bool,
}

impl Filter {
    fn matches(&self, msg: &MessageView<'_>) -> bool {
        let matches = match &self.modifier {
            Modifier::User(users) => users.contains(&msg.author),
            Modifier::Bots => msg.bot,
            Modifier::Links => msg.content.contains("http://") || msg.content.contains("https://"),
            Modifier::Invites => INVITE.is_match(msg.content),
            Modifier::Attachments => msg.has_attachments,
            Modifier::Match(text) => msg.content.contains(text.as_str()),
            Modifier::StartsWith(text) => msg.content.starts_with(text.as_str()),
            Modifier::EndsWith(text) => msg.content.ends_with(text.as_str()),
        };
        matches != self.negated
    }
}

/// No filters selects everything, otherwise a message goes if any filter matches it.
#[must_use]
pub fn selects(filters: &[Filter], msg: &MessageView<'_>) -> bool {
    filters.is_empty() || filters.iter().any(|filter| filter.matches(msg))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    NoUsers,
    EmptyText(&'static str),
    Unexpected(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::NoUsers => write!(f, "`user` needs at least one mention or id."),
            ParseError::EmptyText(name) => write!(f, "`{name}` needs some text to look for."),
            ParseError::Unexpected(word) => write!(f, "`{word}` is not a purge filter."),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Clone, Copy)]
enum Keyword {
    User,
    Bots,
    Links,
    Invites,
    Attachments,
    Match,
    StartsWith,
    EndsWith,
}

const KEYWORDS: [(&str, Keyword); 8] = [
    ("user", Keyword::User),
    ("bots", Keyword::Bots),
    ("links", Keyword::Links),
    ("invites", Keyword::Invites),
    ("attachments", Keyword::Attachments),
    ("match", Keyword::Match),
    ("startswith", Keyword::StartsWith),
    ("endswith", Keyword::EndsWith),
];

fn keyword(word: &str) -> Option<Keyword> {
    KEYWORDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(word))
        .map(|(_, keyword)| *keyword)
}

/// Parses the filter list following the purge count.
pub fn parse_filters(input: &str) -> Result<Vec<Filter>, ParseError> {
    let mut filters = Vec::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        let (word, after) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        let after = after.trim_start();

        let (negated, name) = match word.strip_prefix('!') {
            Some(name) => (true, name),
            None => (false, word),
        };

        let Some(keyword) = keyword(name) else {
            return Err(ParseError::Unexpected(word.to_owned()));
        };

        let text = |name: &'static str| {
            let text = after.trim_end();
            if text.is_empty() {
                Err(ParseError::EmptyText(name))
            } else {
                Ok(text.to_owned())
            }
        };

        let modifier = match keyword {
            // text filters consume everything after them.
            Keyword::Match => Modifier::Match(text("match")?),
            Keyword::StartsWith => Modifier::StartsWith(text("startswith")?),
            Keyword::EndsWith => Modifier::EndsWith(text("endswith")?),
            Keyword::User => {
                let mut users = Vec::new();
                let mut remaining = after;
                while let Some((word, next)) = next_word(remaining) {
                    let Some(id) = parse_user(word) else {
                        break;
                    };
                    users.push(id);
                    remaining = next;
                }
                if users.is_empty() {
                    return Err(ParseError::NoUsers);
                }
                rest = remaining;
                filters.push(Filter {
                    modifier: Modifier::User(users),
                    negated,
                });
                continue;
            }
            Keyword::Bots => Modifier::Bots,
            Keyword::Links => Modifier::Links,
            Keyword::Invites => Modifier::Invites,
            Keyword::Attachments => Modifier::Attachments,
        };

        let consumes_rest = matches!(
            modifier,
            Modifier::Match(_) | Modifier::StartsWith(_) | Modifier::EndsWith(_)
        );
        filters.push(Filter { modifier, negated });

        if consumes_rest {
            break;
        }
        rest = after;
    }

    Ok(filters)
}

fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    let (word, rest) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
    Some((word, rest.trim_start()))
}

fn parse_user(word: &str) -> Option<UserId> {
    let caps = USER.captures(word)?;
    if caps.get(0)?.as_str() != word {
        return None;
    }
    let id = caps.get(2).or_else(|| caps.get(3))?;
    id.as_str().parse::<u64>().ok().filter(|id| *id != 0).map(UserId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(author: u64, content: &str) -> MessageView<'_> {
        MessageView {
            author: UserId::new(author),
            bot: false,
            content,
            has_attachments: false,
        }
    }

    #[test]
    fn parses_flags_and_users() {
        let filters = parse_filters("user <@123456789012345678> <@!223456789012345678> !bots links").unwrap();
        assert_eq!(
            filters,
            vec![
                Filter {
                    modifier: Modifier::User(vec![
                        UserId::new(123456789012345678),
                        UserId::new(223456789012345678)
                    ]),
                    negated: false,
                },
                Filter {
                    modifier: Modifier::Bots,
                    negated: true,
                },
                Filter {
                    modifier: Modifier::Links,
                    negated: false,
                },
            ]
        );
    }

    #[test]
    fn text_filters_take_the_rest() {
        let filters = parse_filters("INVITES !match hello  world bots").unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].modifier, Modifier::Invites);
        assert_eq!(
            filters[1],
            Filter {
                modifier: Modifier::Match("hello  world bots".to_owned()),
                negated: true,
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_filters("user bots"), Err(ParseError::NoUsers));
        assert_eq!(parse_filters("match   "), Err(ParseError::EmptyText("match")));
        assert_eq!(
            parse_filters("spam"),
            Err(ParseError::Unexpected("spam".to_owned()))
        );
        assert_eq!(parse_filters("   "), Ok(Vec::new()));
    }

    #[test]
    fn selection() {
        let filters = parse_filters("user 123456789012345678 invites").unwrap();

        assert!(selects(&filters, &view(123456789012345678, "hi")));
        assert!(selects(&filters, &view(5, "join discord.gg/abc")));
        assert!(!selects(&filters, &view(5, "hi")));
        assert!(selects(&[], &view(5, "anything")));
    }

    #[test]
    fn negation_inverts() {
        let filters = parse_filters("!startswith !").unwrap();
        assert!(!selects(&filters, &view(1, "!ping")));
        assert!(selects(&filters, &view(1, "hello")));

        let filters = parse_filters("!attachments").unwrap();
        let mut with_file = view(1, "");
        with_file.has_attachments = true;
        assert!(!selects(&filters, &with_file));
        assert!(selects(&filters, &view(1, "")));
    }
}
