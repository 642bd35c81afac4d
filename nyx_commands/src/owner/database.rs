use std::fmt::Write;

use crate::{Context, Error};
use nyx_core::data::database::TableCounts;
use nyx_core::embeds;
use poise::serenity_prelude::CreateEmbedFooter;

fn format_counts(counts: &TableCounts) -> String {
    let mut info = String::new();
    for (table, count) in &counts.counts {
        let _ = writeln!(info, "**{table}**\n{count}");
    }
    info
}

fn format_size(bytes: i64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[poise::command(
    rename = "dbstats",
    aliases("db-stats", "db-info"),
    prefix_command,
    category = "Owner",
    check = "crate::utils::owner_check",
    hide_in_help
)]
pub async fn dbstats(ctx: Context<'_>) -> Result<(), Error> {
    let database = &ctx.data().database;

    let counts = match database.table_counts().await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!(error = %e, "Failed to query table counts");
            ctx.say("Failed to query information.").await?;
            return Ok(());
        }
    };

    let cached = format!(
        "**guilds**\n{}\n**users**\n{}\n**reaction roles**\n{}",
        database.guilds.len(),
        database.users.len(),
        database.reaction_roles.len()
    );

    let embed = embeds::themed(ctx.data().embed_colour(ctx.guild_id()))
        .title("Database Stats")
        .field("Rows", format_counts(&counts), true)
        .field("Cached", cached, true)
        .footer(CreateEmbedFooter::new(format!(
            "Database size: {}",
            format_size(counts.database_bytes)
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[must_use]
pub fn commands() -> [crate::Command; 1] {
    [dbstats()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_counts_and_size() {
        let counts = TableCounts {
            counts: vec![("users", 3), ("levels", 40)],
            database_bytes: 3 * 1024 * 1024 + 512 * 1024,
        };
        assert_eq!(format_counts(&counts), "**users**\n3\n**levels**\n40\n");
        assert_eq!(format_size(counts.database_bytes), "3.50 MB");
    }
}
