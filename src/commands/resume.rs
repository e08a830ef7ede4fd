use super::reply_failure;
use crate::music::backend::Toggle;
use crate::{Context, Error};

async fn resume_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    match ctx.data().controller.resume(guild_id).await {
        Ok(Toggle::Changed) => {
            ctx.say("▶️ Resumed").await?;
        }
        Ok(Toggle::AlreadyInState) => {
            ctx.say("▶️ Already playing").await?;
        }
        Err(e) => reply_failure(ctx, &e).await?,
    }

    Ok(())
}

/// Resume the paused song
#[poise::command(slash_command, guild_only)]
pub async fn resume(ctx: Context<'_>) -> Result<(), Error> {
    resume_impl(ctx).await
}

/// Resume the paused song (short for /resume)
#[poise::command(slash_command, guild_only)]
pub async fn r(ctx: Context<'_>) -> Result<(), Error> {
    resume_impl(ctx).await
}
