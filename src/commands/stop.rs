use super::{reply_error, reply_failure};
use crate::music::error::PlaybackError;
use crate::playback::Stopped;
use crate::{Context, Error};

async fn stop_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    match ctx.data().controller.stop_any(guild_id).await {
        Ok(Stopped::Queue) => {
            ctx.say("⏹️ Stopped playback and left the channel.").await?;
        }
        Ok(Stopped::Radio) => {
            ctx.say("⏹️ Stopped the radio and left the channel.").await?;
        }
        Err(PlaybackError::NoRadio) => reply_error(ctx, "Nothing is playing right now.").await?,
        Err(e) => reply_failure(ctx, &e).await?,
    }

    Ok(())
}

/// Stop playback and leave the voice channel
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    stop_impl(ctx).await
}

/// Stop playback and leave the voice channel (short for /stop)
#[poise::command(slash_command, guild_only)]
pub async fn st(ctx: Context<'_>) -> Result<(), Error> {
    stop_impl(ctx).await
}
