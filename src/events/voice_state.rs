use std::time::Duration;

use poise::serenity_prelude as serenity;
use serenity::model::id::{ChannelId, GuildId, UserId};
use tracing::info;

use crate::Data;

/// How long the bot stays in a channel with nobody listening.
const ALONE_TIMEOUT: Duration = Duration::from_secs(30);

fn listeners(cache: &serenity::Cache, guild_id: GuildId, channel: ChannelId, bot: UserId) -> Option<usize> {
    let guild = cache.guild(guild_id)?;
    Some(
        guild
            .voice_states
            .values()
            .filter(|vs| vs.user_id != bot && vs.channel_id == Some(channel))
            .count(),
    )
}

pub async fn handle(
    ctx: &serenity::Context,
    _old: &Option<serenity::VoiceState>,
    new: &serenity::VoiceState,
    data: &Data,
) -> Result<(), crate::Error> {
    let guild_id = match new.guild_id {
        Some(id) => id,
        None => return Ok(()),
    };

    let bot_id = ctx.cache.current_user().id;
    let Some(manager) = songbird::get(ctx).await else {
        return Ok(());
    };

    // The bot itself was disconnected (kicked, moved out, channel deleted).
    if new.user_id == bot_id && new.channel_id.is_none() {
        // A newer call may already exist if a session was restarted meanwhile.
        let rejoined = match manager.get(guild_id) {
            Some(call) => call.lock().await.current_channel().is_some(),
            None => false,
        };
        if !rejoined {
            info!("bot left voice in guild {guild_id}, tearing down sessions");
            data.controller.teardown_voice(guild_id).await;
        }
        return Ok(());
    }

    let handler_lock = match manager.get(guild_id) {
        Some(h) => h,
        None => return Ok(()), // Bot is not in a voice channel in this guild
    };

    let bot_channel = {
        let handler = handler_lock.lock().await;
        match handler.current_channel() {
            Some(ch) => ChannelId::new(ch.0.get()),
            None => return Ok(()),
        }
    };

    if listeners(&ctx.cache, guild_id, bot_channel, bot_id) != Some(0) {
        return Ok(());
    }

    let cache = ctx.cache.clone();
    let controller = data.controller.clone();

    tokio::spawn(async move {
        tokio::time::sleep(ALONE_TIMEOUT).await;

        let Some(handler_lock) = manager.get(guild_id) else {
            return;
        };
        let current = handler_lock.lock().await.current_channel();
        if current.map(|ch| ch.0.get()) != Some(bot_channel.get()) {
            return;
        }

        if listeners(&cache, guild_id, bot_channel, bot_id) == Some(0) {
            info!("alone in voice channel, leaving (guild: {guild_id})");
            controller.teardown_voice(guild_id).await;
            if manager.get(guild_id).is_some() {
                let _ = manager.remove(guild_id).await;
            }
        }
    });

    Ok(())
}
