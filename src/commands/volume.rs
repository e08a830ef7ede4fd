use super::reply_failure;
use crate::{Context, Error};

async fn volume_impl(ctx: Context<'_>, level: i64) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    match ctx.data().controller.set_volume(guild_id, level).await {
        Ok(volume) => {
            ctx.say(format!("🔊 Volume: **{volume}%**")).await?;
        }
        Err(e) => reply_failure(ctx, &e).await?,
    }

    Ok(())
}

/// Set the volume
#[poise::command(slash_command, guild_only)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume (0-100)"] level: i64,
) -> Result<(), Error> {
    volume_impl(ctx, level).await
}

/// Set the volume (short for /volume)
#[poise::command(slash_command, guild_only)]
pub async fn v(
    ctx: Context<'_>, #[description = "Volume (0-100)"] level: i64
) -> Result<(), Error> {
    volume_impl(ctx, level).await
}
