mod cookies;
mod help;
mod loop_cmd;
mod nowplaying;
mod pause;
mod play;
mod queue;
mod radio;
mod resume;
mod skip;
mod stop;
mod volume;

use poise::CreateReply;
use serenity::model::id::ChannelId;

use crate::music::error::PlaybackError;
use crate::utils::embed;
use crate::{Context, Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        help::help(),
        play::play(),
        play::p(),
        skip::skip(),
        skip::s(),
        stop::stop(),
        stop::st(),
        queue::queue(),
        queue::q(),
        pause::pause(),
        pause::pa(),
        resume::resume(),
        resume::r(),
        nowplaying::nowplaying(),
        nowplaying::np(),
        loop_cmd::loop_cmd(),
        loop_cmd::l(),
        volume::volume(),
        volume::v(),
        radio::radio(),
        radio::radioindo(),
        cookies::cookies(),
    ]
}

/// Voice channel the command author is sitting in, from the cache.
fn author_voice_channel(ctx: Context<'_>) -> Option<ChannelId> {
    let guild = ctx.guild()?;
    guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|vs| vs.channel_id)
}

/// Lets the announcer post follow-up notices where music was last requested.
async fn remember_channel(ctx: Context<'_>) {
    if let Some(guild_id) = ctx.guild_id() {
        ctx.data().announcer.remember(guild_id, ctx.channel_id()).await;
    }
}

async fn reply_error(ctx: Context<'_>, message: &str) -> Result<(), Error> {
    ctx.send(CreateReply::default().embed(embed::error(message)))
        .await?;
    Ok(())
}

async fn reply_failure(ctx: Context<'_>, err: &PlaybackError) -> Result<(), Error> {
    reply_error(ctx, &err.to_string()).await
}
