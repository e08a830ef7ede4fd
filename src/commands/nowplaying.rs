use poise::CreateReply;

use super::reply_error;
use crate::utils::{components, embed};
use crate::{Context, Error};

async fn nowplaying_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;
    let controller = &ctx.data().controller;

    let snapshot = controller.queue_snapshot(guild_id).await;
    if let Some(track) = snapshot.current {
        let is_paused = controller.aggregator().read().await.state(guild_id).is_paused;

        let e = embed::now_playing(&track)
            .field("Loop", snapshot.loop_mode.to_string(), true)
            .field("Volume", format!("{}%", snapshot.volume), true);

        ctx.send(
            CreateReply::default()
                .embed(e)
                .components(components::music_components(is_paused, &snapshot.upcoming)),
        )
        .await?;
        return Ok(());
    }

    let radio = controller.aggregator().read().await.radio(guild_id).cloned();
    match radio {
        Some(session) => {
            ctx.send(CreateReply::default().embed(embed::radio(&session, false)))
                .await?;
        }
        None => reply_error(ctx, "Nothing is playing right now.").await?,
    }

    Ok(())
}

/// Show the song that is playing now
#[poise::command(slash_command, guild_only)]
pub async fn nowplaying(ctx: Context<'_>) -> Result<(), Error> {
    nowplaying_impl(ctx).await
}

/// Show the song that is playing now (short for /nowplaying)
#[poise::command(slash_command, guild_only)]
pub async fn np(ctx: Context<'_>) -> Result<(), Error> {
    nowplaying_impl(ctx).await
}
