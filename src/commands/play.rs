use poise::CreateReply;

use super::{author_voice_channel, remember_channel, reply_error, reply_failure};
use crate::music::backend::PlayOutcome;
use crate::utils::{components, embed};
use crate::{Context, Error};

async fn play_impl(ctx: Context<'_>, query: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    let channel_id = match author_voice_channel(ctx) {
        Some(id) => id,
        None => return reply_error(ctx, "You need to be in a voice channel first!").await,
    };

    ctx.defer().await?;
    remember_channel(ctx).await;

    let controller = &ctx.data().controller;
    let outcome = match controller
        .play(guild_id, channel_id, &query, &ctx.author().name)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return reply_failure(ctx, &e).await,
    };

    let upcoming = controller.queue_snapshot(guild_id).await.upcoming;
    let e = match &outcome {
        PlayOutcome::Started(track) => embed::now_playing(track),
        PlayOutcome::Queued { track, position } => embed::added_to_queue(track, *position),
        PlayOutcome::Playlist {
            name,
            count,
            started,
        } => embed::playlist_added(name, *count, started.as_ref()),
    };

    ctx.send(
        CreateReply::default()
            .embed(e)
            .components(components::music_components(false, &upcoming)),
    )
    .await?;

    Ok(())
}

/// Play a song or playlist, or add it to the queue
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song name, YouTube or Spotify URL, or a playlist link"] query: String,
) -> Result<(), Error> {
    play_impl(ctx, query).await
}

/// Play a song or add it to the queue (short for /play)
#[poise::command(slash_command, guild_only)]
pub async fn p(
    ctx: Context<'_>,
    #[description = "Song name, YouTube or Spotify URL, or a playlist link"] query: String,
) -> Result<(), Error> {
    play_impl(ctx, query).await
}
