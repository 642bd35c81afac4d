use crate::utils::{guild_embed, say_embed, say_error};
use crate::{Context, Error};

use nyx_core::apis::anime::{self, MediaKind};
use nyx_core::apis::{covid, format_count, ocr, screenshot, translate, truncate, ApiError};
use poise::serenity_prelude::{self as serenity, CreateEmbedFooter};

/// Replies with the api error, logging the ones that are not the user's fault.
async fn api_error(ctx: Context<'_>, api: &str, error: ApiError) -> Result<(), Error> {
    match &error {
        ApiError::Http(_) | ApiError::Status(_) => {
            tracing::warn!(api, error = %error, "Third party api failed");
        }
        ApiError::NotFound | ApiError::Invalid(_) => {}
    }
    say_error(ctx, error.to_string()).await
}

async fn media(ctx: Context<'_>, kind: MediaKind, query: String) -> Result<(), Error> {
    ctx.defer().await?;

    let entry = match anime::search(&ctx.data().reqwest, kind, &query).await {
        Ok(entry) => entry,
        Err(e) => return api_error(ctx, "jikan", e).await,
    };

    let synopsis = entry
        .synopsis
        .as_deref()
        .map_or_else(|| "No synopsis.".to_owned(), |s| truncate(s, 700));

    let mut embed = guild_embed(ctx)
        .title(&entry.title)
        .url(&entry.url)
        .description(synopsis)
        .field(
            "Score",
            entry.score.map_or_else(|| "N/A".to_owned(), |s| format!("{s:.2}")),
            true,
        )
        .field(
            "Rank",
            entry.rank.map_or_else(|| "N/A".to_owned(), |r| format!("#{r}")),
            true,
        )
        .field("Length", entry.length(kind), true)
        .field(
            "Status",
            entry.status.clone().unwrap_or_else(|| "Unknown".to_owned()),
            true,
        )
        .field("Genres", entry.genre_list(), false)
        .footer(CreateEmbedFooter::new("Data from MyAnimeList via Jikan"));

    if let Some(english) = entry.title_english.as_deref().filter(|t| *t != entry.title) {
        embed = embed.author(serenity::CreateEmbedAuthor::new(english));
    }
    if let Some(cover) = entry.cover() {
        embed = embed.thumbnail(cover);
    }

    say_embed(ctx, embed).await
}

/// Look up an anime on MyAnimeList.
#[poise::command(slash_command, prefix_command, category = "Web")]
pub async fn anime(
    ctx: Context<'_>,
    #[description = "Anime to search for"]
    #[rest]
    query: String,
) -> Result<(), Error> {
    media(ctx, MediaKind::Anime, query).await
}

/// Look up a manga on MyAnimeList.
#[poise::command(slash_command, prefix_command, category = "Web")]
pub async fn manga(
    ctx: Context<'_>,
    #[description = "Manga to search for"]
    #[rest]
    query: String,
) -> Result<(), Error> {
    media(ctx, MediaKind::Manga, query).await
}

/// COVID-19 statistics, worldwide or for a country.
#[poise::command(slash_command, prefix_command, category = "Web")]
pub async fn covid(
    ctx: Context<'_>,
    #[description = "Country, leave empty for worldwide"]
    #[rest]
    country: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let stats = match covid::stats(&ctx.data().reqwest, country.as_deref()).await {
        Ok(stats) => stats,
        Err(e) => return api_error(ctx, "disease.sh", e).await,
    };

    let mut embed = guild_embed(ctx)
        .title(stats.title())
        .field("Cases", format_count(stats.cases), true)
        .field("Today", format!("+{}", format_count(stats.today_cases)), true)
        .field("Active", format_count(stats.active), true)
        .field("Deaths", format_count(stats.deaths), true)
        .field("Deaths today", format!("+{}", format_count(stats.today_deaths)), true)
        .field("Fatality rate", format!("{:.2}%", stats.fatality_rate()), true)
        .field("Recovered", format_count(stats.recovered), true)
        .field("Critical", format_count(stats.critical), true)
        .field("Tests", format_count(stats.tests), true)
        .footer(CreateEmbedFooter::new("Data from disease.sh"));

    if let Ok(updated) = serenity::Timestamp::from_millis(stats.updated) {
        embed = embed.timestamp(updated);
    }
    if let Some(flag) = stats.country_info.as_ref().and_then(|c| c.flag.as_deref()) {
        embed = embed.thumbnail(flag);
    }

    say_embed(ctx, embed).await
}

/// Read the text in an image.
#[poise::command(slash_command, prefix_command, category = "Web")]
pub async fn ocr(
    ctx: Context<'_>,
    #[description = "Image with text"] image: Option<serenity::Attachment>,
    #[description = "Or a link to one"] url: Option<String>,
) -> Result<(), Error> {
    let api_key = ctx.data().config.read().ocr_api_key.clone();
    let Some(api_key) = api_key else {
        return say_error(ctx, "OCR is not configured on this bot.").await;
    };

    let Some(image_url) = image.map(|a| a.url).or(url) else {
        return say_error(ctx, "Attach an image or give me a link to one.").await;
    };

    ctx.defer().await?;

    let text = match ocr::read_text(&ctx.data().reqwest, &api_key, &image_url).await {
        Ok(text) => text,
        Err(ApiError::NotFound) => return say_error(ctx, "I couldn't find any text.").await,
        Err(e) => return api_error(ctx, "ocr.space", e).await,
    };

    let embed = guild_embed(ctx)
        .title("Extracted text")
        .description(format!("```\n{}\n```", truncate(&text.replace("```", "'''"), 4000)))
        .thumbnail(image_url);

    say_embed(ctx, embed).await
}

/// Take a screenshot of a website.
#[poise::command(slash_command, prefix_command, category = "Web", aliases("ss"))]
pub async fn screenshot(
    ctx: Context<'_>,
    #[description = "Website to capture"] url: String,
) -> Result<(), Error> {
    let image = match screenshot::screenshot_url(&url) {
        Ok(image) => image,
        Err(e) => return api_error(ctx, "thum.io", e).await,
    };

    let embed = guild_embed(ctx)
        .title(truncate(&url, 200))
        .image(image)
        .footer(CreateEmbedFooter::new("Rendered by thum.io"));

    say_embed(ctx, embed).await
}

/// Translate text into another language.
#[poise::command(slash_command, prefix_command, category = "Web", aliases("tr"))]
pub async fn translate(
    ctx: Context<'_>,
    #[description = "Language to translate to, like en or de"] target: String,
    #[description = "Text to translate"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    let (base_url, api_key) = {
        let config = ctx.data().config.read();
        (config.translate_url.clone(), config.translate_api_key.clone())
    };

    ctx.defer().await?;

    let translation = match translate::translate(
        &ctx.data().reqwest,
        &base_url,
        api_key.as_deref(),
        &text,
        &target,
    )
    .await
    {
        Ok(translation) => translation,
        Err(e) => return api_error(ctx, "translate", e).await,
    };

    let from = translation
        .detected_language
        .as_ref()
        .map_or_else(|| "auto".to_owned(), |d| d.language.clone());

    let embed = guild_embed(ctx)
        .field(format!("From `{from}`"), truncate(&text, 1024), false)
        .field(
            format!("To `{}`", target.trim().to_lowercase()),
            truncate(&translation.translated_text, 1024),
            false,
        );

    say_embed(ctx, embed).await
}

#[must_use]
pub fn commands() -> [crate::Command; 6] {
    [anime(), manga(), covid(), ocr(), screenshot(), translate()]
}
