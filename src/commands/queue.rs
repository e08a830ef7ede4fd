use poise::CreateReply;

use crate::utils::embed;
use crate::{Context, Error};

async fn queue_impl(ctx: Context<'_>, page: Option<usize>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    let snapshot = ctx.data().controller.queue_snapshot(guild_id).await;

    let page = page.unwrap_or(1);
    let embed = embed::queue_list(
        snapshot.current.as_ref(),
        &snapshot.upcoming,
        snapshot.loop_mode,
        page,
    );

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Show the queue
#[poise::command(slash_command, guild_only)]
pub async fn queue(
    ctx: Context<'_>,
    #[description = "Page number"] page: Option<usize>,
) -> Result<(), Error> {
    queue_impl(ctx, page).await
}

/// Show the queue (short for /queue)
#[poise::command(slash_command, guild_only)]
pub async fn q(
    ctx: Context<'_>,
    #[description = "Page number"] page: Option<usize>,
) -> Result<(), Error> {
    queue_impl(ctx, page).await
}
