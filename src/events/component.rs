use poise::serenity_prelude as serenity;
use serenity::builder::{
    CreateActionRow, CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use serenity::model::application::ComponentInteraction;
use serenity::model::id::GuildId;

use crate::music::backend::Toggle;
use crate::music::error::PlaybackError;
use crate::playback::Stopped;
use crate::utils::{components, embed};
use crate::{Data, Error};

async fn respond_ephemeral(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    message: &str,
) -> Result<(), Error> {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embed(embed::error(message))
            .ephemeral(true),
    );
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

async fn update_message(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    embed: CreateEmbed,
    components: Vec<CreateActionRow>,
) -> Result<(), Error> {
    let response = CreateInteractionResponse::UpdateMessage(
        CreateInteractionResponseMessage::new()
            .embed(embed)
            .components(components),
    );
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

/// Re-renders the now-playing message from the aggregated state.
async fn refresh(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
    guild_id: GuildId,
) -> Result<(), Error> {
    let snapshot = data.controller.queue_snapshot(guild_id).await;
    let is_paused = data
        .controller
        .aggregator()
        .read()
        .await
        .state(guild_id)
        .is_paused;

    let (e, comps) = match snapshot.current {
        Some(track) => {
            let mut e = embed::now_playing(&track);
            if is_paused {
                e = e.title("⏸️ Paused");
            }
            (e, components::music_components(is_paused, &snapshot.upcoming))
        }
        None => (
            embed::info("⏹️ Nothing Playing", "The queue is empty."),
            components::music_components_disabled(),
        ),
    };
    update_message(ctx, interaction, e, comps).await
}

pub async fn handle(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let guild_id = interaction
        .guild_id
        .ok_or("This can only be used in a server")?;

    let manager = songbird::get(ctx)
        .await
        .ok_or("Voice client is not initialised")?;

    // Check bot is in a voice channel
    let bot_channel = {
        let handler_lock = match manager.get(guild_id) {
            Some(h) => h,
            None => {
                respond_ephemeral(ctx, interaction, "The bot is not in a voice channel.").await?;
                return Ok(());
            }
        };
        let handler = handler_lock.lock().await;
        handler.current_channel()
    };

    // Check user is in the same voice channel
    let user_in_bot_channel = {
        let guild = ctx
            .cache
            .guild(guild_id)
            .ok_or("Could not read the server from cache")?;
        match bot_channel {
            Some(bot_ch) => guild
                .voice_states
                .get(&interaction.user.id)
                .and_then(|vs| vs.channel_id)
                .is_some_and(|ch| ch.get() == bot_ch.0.get()),
            None => false,
        }
    };

    if !user_in_bot_channel {
        respond_ephemeral(ctx, interaction, "You need to be in the bot's voice channel.").await?;
        return Ok(());
    }

    let controller = &data.controller;
    match interaction.data.custom_id.as_str() {
        components::PAUSE => match controller.pause(guild_id).await {
            Ok(Toggle::Changed) | Ok(Toggle::AlreadyInState) => {
                let snapshot = controller.queue_snapshot(guild_id).await;
                let e = match snapshot.current {
                    Some(track) => embed::now_playing(&track).title("⏸️ Paused"),
                    None => embed::error(&PlaybackError::NoSession.to_string()),
                };
                update_message(
                    ctx,
                    interaction,
                    e,
                    components::music_components(true, &snapshot.upcoming),
                )
                .await?;
            }
            Err(e) => respond_ephemeral(ctx, interaction, &e.to_string()).await?,
        },
        components::RESUME => match controller.resume(guild_id).await {
            Ok(_) => {
                let snapshot = controller.queue_snapshot(guild_id).await;
                let e = match snapshot.current {
                    Some(track) => embed::now_playing(&track),
                    None => embed::error(&PlaybackError::NoSession.to_string()),
                };
                update_message(
                    ctx,
                    interaction,
                    e,
                    components::music_components(false, &snapshot.upcoming),
                )
                .await?;
            }
            Err(e) => respond_ephemeral(ctx, interaction, &e.to_string()).await?,
        },
        components::SKIP => match controller.skip(guild_id).await {
            Ok(Some(track)) => {
                let snapshot = controller.queue_snapshot(guild_id).await;
                update_message(
                    ctx,
                    interaction,
                    embed::now_playing(&track),
                    components::music_components(false, &snapshot.upcoming),
                )
                .await?;
            }
            Ok(None) => {
                let e = CreateEmbed::new()
                    .title("⏭️ Skipped")
                    .description("The queue is empty.")
                    .color(0x5865F2);
                update_message(ctx, interaction, e, components::music_components_disabled())
                    .await?;
            }
            Err(e) => {
                respond_ephemeral(ctx, interaction, &format!("Skip failed: {e}")).await?;
            }
        },
        components::STOP => match controller.stop_any(guild_id).await {
            Ok(stopped) => {
                let description = match stopped {
                    Stopped::Queue => "Stopped playback and left the channel.",
                    Stopped::Radio => "Stopped the radio and left the channel.",
                };
                let e = CreateEmbed::new()
                    .title("⏹️ Stopped")
                    .description(description)
                    .color(0xED4245);
                update_message(ctx, interaction, e, components::music_components_disabled())
                    .await?;
            }
            Err(e) => respond_ephemeral(ctx, interaction, &e.to_string()).await?,
        },
        // Informational dropdown - refresh message with current state
        components::QUEUE_SELECT => refresh(ctx, interaction, data, guild_id).await?,
        _ => {}
    }

    Ok(())
}
