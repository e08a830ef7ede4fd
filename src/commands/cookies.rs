use poise::CreateReply;

use crate::credentials::CredentialError;
use crate::utils::embed;
use crate::{Context, Error};

/// Update the YouTube cookies used for playback
#[poise::command(slash_command, guild_only, ephemeral)]
pub async fn cookies(
    ctx: Context<'_>,
    #[description = "Cookie header from youtube.com (name=value; name=value)"] cookies: String,
) -> Result<(), Error> {
    let e = match ctx.data().controller.update_credentials(&cookies).await {
        Ok(count) => embed::info("🍪 Cookies Updated", &format!("Saved {count} YouTube cookies.")),
        Err(CredentialError::Empty) => embed::error(
            "No cookies found. Paste them as `name=value; name=value` from youtube.com.",
        ),
        Err(e) => {
            tracing::warn!("cookie update failed: {e}");
            embed::error("Failed to update YouTube cookies")
        }
    };

    ctx.send(CreateReply::default().embed(e).ephemeral(true))
        .await?;
    Ok(())
}
