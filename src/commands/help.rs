use poise::CreateReply;
use serenity::builder::CreateEmbed;

use crate::{Context, Error};

async fn help_impl(ctx: Context<'_>) -> Result<(), Error> {
    let music_cmds = "\
`/play` (`/p`) · play a song or add it to the queue
`/skip` (`/s`) · skip the current song
`/stop` (`/st`) · stop playback and leave
`/queue` (`/q`) · show the queue
`/pause` (`/pa`) · pause
`/resume` (`/r`) · resume
`/nowplaying` (`/np`) · show the current song
`/loop` (`/l`) · loop mode (off/track/queue), cycles when empty
`/volume` (`/v`) · set the volume (0-100)";

    let radio_cmds = "\
`/radio` · 24/7 lofi radio, or any stream URL
`/radioindo` · 24/7 Indonesian radio";

    let other_cmds = "\
`/cookies` · update the YouTube cookies
The web dashboard mirrors playback and has the same controls.";

    let embed = CreateEmbed::new()
        .title("Music Bot Help")
        .field("Music", music_cmds, false)
        .field("Radio", radio_cmds, false)
        .field("Other", other_cmds, false)
        .color(0x5865F2);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the bot's commands
#[poise::command(slash_command, guild_only)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    help_impl(ctx).await
}
