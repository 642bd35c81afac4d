use crate::utils::{avatar_png, download, guild_embed, say_error};
use crate::{Context, Error};

use nyx_core::imaging::{self, Filter, Rotation, MAX_INPUT_BYTES};
use poise::serenity_prelude::{self as serenity, CreateAttachment};
use poise::CreateReply;

/// Where the image to filter comes from.
enum Source {
    Url(String),
    Rejected(String),
}

fn pick_source(
    image: Option<&serenity::Attachment>,
    user: Option<&serenity::User>,
    author: &serenity::User,
) -> Source {
    if let Some(attachment) = image {
        let is_image = attachment
            .content_type
            .as_deref()
            .is_some_and(|kind| kind.starts_with("image/"));

        if !is_image {
            return Source::Rejected(format!("`{}` is not an image.", attachment.filename));
        }
        if attachment.size as usize > MAX_INPUT_BYTES {
            return Source::Rejected(format!(
                "Images can be at most {} MiB.",
                MAX_INPUT_BYTES / (1024 * 1024)
            ));
        }
        return Source::Url(attachment.url.clone());
    }

    Source::Url(avatar_png(user.unwrap_or(author)))
}

async fn run_filter(
    ctx: Context<'_>,
    image: Option<serenity::Attachment>,
    user: Option<serenity::User>,
    filter: Filter,
    name: &str,
) -> Result<(), Error> {
    let url = match pick_source(image.as_ref(), user.as_ref(), ctx.author()) {
        Source::Url(url) => url,
        Source::Rejected(why) => return say_error(ctx, why).await,
    };

    ctx.defer().await?;

    let bytes = match download(&ctx.data().reqwest, &url, MAX_INPUT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(%url, error = %e, "Image download failed");
            return say_error(ctx, format!("Could not download that image: {e}")).await;
        }
    };

    let started = std::time::Instant::now();
    let output = tokio::task::spawn_blocking(move || imaging::process(&bytes, filter)).await?;
    let png = match output {
        Ok(png) => png,
        Err(e) => return say_error(ctx, e.to_string()).await,
    };
    tracing::debug!(filter = name, elapsed = ?started.elapsed(), "Applied image filter");

    let filename = format!("{name}.png");
    let embed = guild_embed(ctx).image(format!("attachment://{filename}"));
    ctx.send(
        CreateReply::default()
            .attachment(CreateAttachment::bytes(png, filename))
            .embed(embed),
    )
    .await?;
    Ok(())
}

/// Invert the colours of an image or avatar.
#[poise::command(slash_command, prefix_command, category = "Images")]
pub async fn invert(
    ctx: Context<'_>,
    #[description = "Image to edit"] image: Option<serenity::Attachment>,
    #[description = "Use this user's avatar"] user: Option<serenity::User>,
) -> Result<(), Error> {
    run_filter(ctx, image, user, Filter::Invert, "invert").await
}

/// Make an image or avatar black and white.
#[poise::command(
    slash_command,
    prefix_command,
    category = "Images",
    aliases("greyscale", "gray", "grey")
)]
pub async fn grayscale(
    ctx: Context<'_>,
    #[description = "Image to edit"] image: Option<serenity::Attachment>,
    #[description = "Use this user's avatar"] user: Option<serenity::User>,
) -> Result<(), Error> {
    run_filter(ctx, image, user, Filter::Grayscale, "grayscale").await
}

/// Blur an image or avatar.
#[poise::command(slash_command, prefix_command, category = "Images")]
pub async fn blur(
    ctx: Context<'_>,
    #[description = "Blur strength (1-50)"]
    #[min = 1]
    #[max = 50]
    strength: Option<f32>,
    #[description = "Image to edit"] image: Option<serenity::Attachment>,
    #[description = "Use this user's avatar"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let sigma = strength.unwrap_or(5.0).clamp(1.0, 50.0);
    run_filter(ctx, image, user, Filter::Blur(sigma), "blur").await
}

/// Pixelate an image or avatar.
#[poise::command(slash_command, prefix_command, category = "Images")]
pub async fn pixelate(
    ctx: Context<'_>,
    #[description = "Block size in pixels (2-64)"]
    #[min = 2]
    #[max = 64]
    block: Option<u32>,
    #[description = "Image to edit"] image: Option<serenity::Attachment>,
    #[description = "Use this user's avatar"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let block = block.unwrap_or(12).clamp(2, 64);
    run_filter(ctx, image, user, Filter::Pixelate(block), "pixelate").await
}

/// Flip an image or avatar upside down.
#[poise::command(slash_command, prefix_command, category = "Images")]
pub async fn flip(
    ctx: Context<'_>,
    #[description = "Image to edit"] image: Option<serenity::Attachment>,
    #[description = "Use this user's avatar"] user: Option<serenity::User>,
) -> Result<(), Error> {
    run_filter(ctx, image, user, Filter::Flip, "flip").await
}

/// Mirror an image or avatar left to right.
#[poise::command(slash_command, prefix_command, category = "Images")]
pub async fn mirror(
    ctx: Context<'_>,
    #[description = "Image to edit"] image: Option<serenity::Attachment>,
    #[description = "Use this user's avatar"] user: Option<serenity::User>,
) -> Result<(), Error> {
    run_filter(ctx, image, user, Filter::Mirror, "mirror").await
}

/// Rotate an image or avatar clockwise.
#[poise::command(slash_command, prefix_command, category = "Images")]
pub async fn rotate(
    ctx: Context<'_>,
    #[description = "Degrees: 90, 180 or 270"] degrees: Option<i32>,
    #[description = "Image to edit"] image: Option<serenity::Attachment>,
    #[description = "Use this user's avatar"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let degrees = degrees.unwrap_or(90);
    let Some(rotation) = Rotation::from_degrees(degrees) else {
        return say_error(ctx, "I can only rotate by 90, 180 or 270 degrees.").await;
    };
    run_filter(ctx, image, user, Filter::Rotate(rotation), "rotate").await
}

/// Give an image or avatar an old photo look.
#[poise::command(slash_command, prefix_command, category = "Images")]
pub async fn sepia(
    ctx: Context<'_>,
    #[description = "Image to edit"] image: Option<serenity::Attachment>,
    #[description = "Use this user's avatar"] user: Option<serenity::User>,
) -> Result<(), Error> {
    run_filter(ctx, image, user, Filter::Sepia, "sepia").await
}

/// Deep fry an image or avatar.
#[poise::command(slash_command, prefix_command, category = "Images")]
pub async fn deepfry(
    ctx: Context<'_>,
    #[description = "Image to edit"] image: Option<serenity::Attachment>,
    #[description = "Use this user's avatar"] user: Option<serenity::User>,
) -> Result<(), Error> {
    run_filter(ctx, image, user, Filter::Deepfry, "deepfry").await
}

#[must_use]
pub fn commands() -> [crate::Command; 9] {
    [
        invert(),
        grayscale(),
        blur(),
        pixelate(),
        flip(),
        mirror(),
        rotate(),
        sepia(),
        deepfry(),
    ]
}
