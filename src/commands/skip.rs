use super::reply_failure;
use crate::{Context, Error};

async fn skip_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;
    let controller = &ctx.data().controller;

    let skipped = controller.queue_snapshot(guild_id).await.current;

    match controller.skip(guild_id).await {
        Ok(next) => {
            let from = skipped.map_or_else(|| "the current song".to_string(), |t| format!("**{}**", t.title));
            let msg = match next {
                Some(next) => format!("⏭️ Skipped {from} → **{}**", next.title),
                None => format!("⏭️ Skipped {from} (queue is empty)"),
            };
            ctx.say(msg).await?;
        }
        Err(e) => reply_failure(ctx, &e).await?,
    }

    Ok(())
}

/// Skip the current song
#[poise::command(slash_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    skip_impl(ctx).await
}

/// Skip the current song (short for /skip)
#[poise::command(slash_command, guild_only)]
pub async fn s(ctx: Context<'_>) -> Result<(), Error> {
    skip_impl(ctx).await
}
