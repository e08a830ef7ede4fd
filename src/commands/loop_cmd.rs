use super::{reply_error, reply_failure};
use crate::music::LoopMode;
use crate::{Context, Error};

async fn loop_impl(ctx: Context<'_>, mode: Option<String>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    let requested = match mode.as_deref().map(str::parse::<LoopMode>) {
        None => None,
        Some(Ok(mode)) => Some(mode),
        Some(Err(e)) => return reply_error(ctx, &e.to_string()).await,
    };

    let mode = match ctx.data().controller.set_loop_mode(guild_id, requested).await {
        Ok(mode) => mode,
        Err(e) => return reply_failure(ctx, &e).await,
    };

    let emoji = match mode {
        LoopMode::Off => "➡️",
        LoopMode::Track => "🔂",
        LoopMode::Queue => "🔁",
    };

    ctx.say(format!("{emoji} Loop mode: **{mode}**")).await?;

    Ok(())
}

/// Set the loop mode, or cycle it when no mode is given
#[poise::command(slash_command, guild_only, rename = "loop")]
pub async fn loop_cmd(
    ctx: Context<'_>,
    #[description = "Loop mode (off/track/queue)"] mode: Option<String>,
) -> Result<(), Error> {
    loop_impl(ctx, mode).await
}

/// Set the loop mode (short for /loop)
#[poise::command(slash_command, guild_only)]
pub async fn l(
    ctx: Context<'_>,
    #[description = "Loop mode (off/track/queue)"] mode: Option<String>,
) -> Result<(), Error> {
    loop_impl(ctx, mode).await
}
