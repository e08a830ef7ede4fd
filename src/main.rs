use std::sync::Arc;

use discord_radio_bot::credentials::{CookieStore, Remediation, REMEDIATION_COOLDOWN};
use discord_radio_bot::dashboard::{self, AppState};
use discord_radio_bot::events::announce::ChannelAnnouncer;
use discord_radio_bot::music::backend::Backend;
use discord_radio_bot::music::player::{SongbirdBackend, SourceMode};
use discord_radio_bot::music::source::{YtDlp, FALLBACK_PLAYER_CLIENT};
use discord_radio_bot::playback::event::event_channel;
use discord_radio_bot::playback::{dispatch, new_aggregator, BackendId, BackendStatus, PlaybackController};
use discord_radio_bot::radio::stream::SongbirdRadioOutput;
use discord_radio_bot::radio::{self, RadioManager};
use discord_radio_bot::{commands, config, events, Data};
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env();

    let http_client = reqwest::Client::new();
    let voice = Songbird::serenity();

    let credentials = Arc::new(CookieStore::new(&config.cookies_path));
    if let Err(e) = credentials.ensure_default().await {
        tracing::warn!("could not create the default cookie file: {e}");
    }
    let remediation = Arc::new(Remediation::new(credentials.clone(), REMEDIATION_COOLDOWN));

    let ytdlp = YtDlp::new(config.ytdlp_path.clone(), Some(credentials.clone()));
    let aggregator = new_aggregator();
    let backend_status = if ytdlp.probe().await {
        tracing::info!("yt-dlp found: {}", ytdlp.program());
        BackendStatus::Configured
    } else {
        tracing::error!("yt-dlp is not available at `{}`, playback is disabled", ytdlp.program());
        BackendStatus::Missing
    };
    aggregator.write().await.set_backend_status(backend_status);

    // Both engines share one voice manager and report on one event channel.
    let (event_sink, event_stream) = event_channel();
    let primary: Arc<dyn Backend> = Arc::new(SongbirdBackend::new(
        BackendId::Primary,
        SourceMode::Lazy,
        voice.clone(),
        http_client.clone(),
        ytdlp.clone(),
        event_sink.clone(),
    ));
    let fallback = config.enable_fallback.then(|| {
        Arc::new(SongbirdBackend::new(
            BackendId::Fallback,
            SourceMode::Direct,
            voice.clone(),
            http_client.clone(),
            ytdlp.clone().with_player_client(FALLBACK_PLAYER_CLIENT),
            event_sink.clone(),
        )) as Arc<dyn Backend>
    });

    let (radio_signals, radio_signal_stream) = radio::signal_channel();
    let radio_output = Arc::new(SongbirdRadioOutput::new(
        voice.clone(),
        http_client.clone(),
        radio_signals,
    ));
    let radio = Arc::new(RadioManager::new(aggregator.clone(), radio_output));
    tokio::spawn(radio::run_signals(radio.clone(), radio_signal_stream));

    let controller = Arc::new(PlaybackController::new(
        aggregator.clone(),
        primary,
        fallback,
        radio,
        credentials,
        remediation.clone(),
    ));

    let announcer = Arc::new(ChannelAnnouncer::new(Arc::new(serenity::Http::new(
        &config.discord_token,
    ))));
    let (notice_sink, notice_stream) = dispatch::notice_channel();
    tokio::spawn(dispatch::announce_all(notice_stream, announcer.clone()));
    tokio::spawn(dispatch::run(
        event_stream,
        aggregator.clone(),
        remediation,
        notice_sink,
    ));

    let app_state = AppState::new(controller.clone());
    tokio::spawn(dashboard::broadcast::run(
        aggregator,
        app_state.updates.clone(),
        config.broadcast_interval,
    ));
    let dashboard_addr = config.dashboard_addr;
    tokio::spawn(async move {
        if let Err(e) = dashboard::serve(dashboard_addr, app_state).await {
            tracing::error!("{e}");
        }
    });

    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                tracing::info!("bot is ready");
                Ok(Data {
                    controller,
                    announcer,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .register_songbird_with(voice)
        .await
        .expect("failed to create the Discord client");

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    if let Err(e) = client.start().await {
        tracing::error!("client error: {e}");
    }
}
