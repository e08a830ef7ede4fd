use poise::CreateReply;

use super::{author_voice_channel, remember_channel, reply_error, reply_failure};
use crate::playback::state::RadioSession;
use crate::radio::{RadioStart, Station, INDONESIAN, LOFI};
use crate::utils::embed;
use crate::{Context, Error};

async fn radio_impl(ctx: Context<'_>, url: String, label: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    let channel_id = match author_voice_channel(ctx) {
        Some(id) => id,
        None => return reply_error(ctx, "You need to be in a voice channel first!").await,
    };

    ctx.defer().await?;
    remember_channel(ctx).await;

    match ctx
        .data()
        .controller
        .start_radio(guild_id, channel_id, &url, &label)
        .await
    {
        Ok(outcome) => {
            let session = RadioSession {
                stream_url: url,
                label,
                session_id: 0,
            };
            let e = embed::radio(&session, outcome == RadioStart::Changed);
            ctx.send(CreateReply::default().embed(e)).await?;
        }
        Err(e) => reply_failure(ctx, &e).await?,
    }

    Ok(())
}

fn station_or_custom(station: Station, url: Option<String>, label: Option<String>) -> (String, String) {
    match url {
        Some(url) => (url, label.unwrap_or_else(|| "Custom Radio".to_string())),
        None => (
            station.url.to_string(),
            label.unwrap_or_else(|| station.label.to_string()),
        ),
    }
}

/// Play a 24/7 lofi radio stream, or any stream URL
#[poise::command(slash_command, guild_only)]
pub async fn radio(
    ctx: Context<'_>,
    #[description = "Stream URL (defaults to lofi radio)"] url: Option<String>,
    #[description = "Name shown for the stream"] label: Option<String>,
) -> Result<(), Error> {
    let (url, label) = station_or_custom(LOFI, url, label);
    radio_impl(ctx, url, label).await
}

/// Play a 24/7 Indonesian radio stream
#[poise::command(slash_command, guild_only)]
pub async fn radioindo(ctx: Context<'_>) -> Result<(), Error> {
    let (url, label) = station_or_custom(INDONESIAN, None, None);
    radio_impl(ctx, url, label).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_defaults_and_custom() {
        assert_eq!(
            station_or_custom(LOFI, None, None),
            (LOFI.url.to_string(), LOFI.label.to_string())
        );
        assert_eq!(
            station_or_custom(LOFI, Some("https://x/live".into()), None),
            ("https://x/live".to_string(), "Custom Radio".to_string())
        );
    }
}
