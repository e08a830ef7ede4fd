use super::reply_failure;
use crate::music::backend::Toggle;
use crate::{Context, Error};

async fn pause_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;
    let controller = &ctx.data().controller;

    match controller.pause(guild_id).await {
        Ok(Toggle::Changed) => {
            let title = controller
                .queue_snapshot(guild_id)
                .await
                .current
                .map_or_else(|| "Unknown".to_string(), |t| t.title);
            ctx.say(format!("⏸️ Paused **{title}**")).await?;
        }
        Ok(Toggle::AlreadyInState) => {
            ctx.say("⏸️ Already paused").await?;
        }
        Err(e) => reply_failure(ctx, &e).await?,
    }

    Ok(())
}

/// Pause the current song
#[poise::command(slash_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), Error> {
    pause_impl(ctx).await
}

/// Pause the current song (short for /pause)
#[poise::command(slash_command, guild_only)]
pub async fn pa(ctx: Context<'_>) -> Result<(), Error> {
    pause_impl(ctx).await
}
