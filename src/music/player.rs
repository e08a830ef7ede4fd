use std::sync::Arc;

use async_trait::async_trait;
use serenity::model::id::GuildId;
use songbird::events::{CoreEvent, Event, EventContext, EventHandler, TrackEvent};
use songbird::input::{HttpRequest, Input, YoutubeDl};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Call, Songbird};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::backend::{Backend, PlayOutcome, PlayRequest, QueueSnapshot, Toggle};
use super::error::PlaybackError;
use super::source::{Resolved, YtDlp};
use super::{gain, queue, LoopMode, QueueManager, Track};
use crate::playback::event::{emit, BackendId, EngineEvent, EventSink, Generation};

/// Consecutive tracks allowed to fail before the queue is abandoned.
const MAX_CONSECUTIVE_FAILURES: usize = 3;

/// How an engine turns a resolved track into driver input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceMode {
    /// Hand the page URL to songbird's yt-dlp input, resolved when playback starts.
    Lazy,
    /// Resolve a direct media URL up front and stream it over HTTP.
    Direct,
}

struct Engine {
    id: BackendId,
    mode: SourceMode,
    manager: Arc<Songbird>,
    queues: QueueManager,
    http_client: reqwest::Client,
    ytdlp: YtDlp,
    events: EventSink,
}

impl Engine {
    fn emit(&self, guild_id: GuildId, generation: Generation, kind: EngineEvent) {
        emit(&self.events, guild_id, self.id, generation, kind);
    }

    async fn input_for(&self, song: &Track) -> Result<Input, PlaybackError> {
        match self.mode {
            SourceMode::Lazy => Ok(YoutubeDl::new(self.http_client.clone(), song.source_url.clone())
                .user_args(self.ytdlp.session_args())
                .into()),
            SourceMode::Direct => {
                let url = self.ytdlp.stream_url(&song.source_url).await?;
                Ok(HttpRequest::new(self.http_client.clone(), url).into())
            }
        }
    }
}

/// A songbird-driven queue engine. Two instances with different
/// [`SourceMode`]s serve as the primary and fallback backends.
pub struct SongbirdBackend {
    engine: Arc<Engine>,
}

impl SongbirdBackend {
    pub fn new(
        id: BackendId,
        mode: SourceMode,
        manager: Arc<Songbird>,
        http_client: reqwest::Client,
        ytdlp: YtDlp,
        events: EventSink,
    ) -> Self {
        Self {
            engine: Arc::new(Engine {
                id,
                mode,
                manager,
                queues: super::new_queue_manager(),
                http_client,
                ytdlp,
                events,
            }),
        }
    }

    async fn hook_disconnect(&self, guild_id: GuildId, generation: Generation, call: &Arc<Mutex<Call>>) {
        let engine = &self.engine;
        {
            let mut queues = engine.queues.write().await;
            let q = queues.entry(guild_id).or_default();
            if q.disconnect_hooked {
                return;
            }
            q.disconnect_hooked = true;
        }

        let mut handler = call.lock().await;
        handler.add_global_event(
            Event::Core(CoreEvent::DriverDisconnect),
            DisconnectNotifier {
                engine: engine.clone(),
                guild_id,
                generation,
            },
        );
    }
}

struct TrackEndNotifier {
    engine: Arc<Engine>,
    guild_id: GuildId,
    generation: Generation,
    call: Arc<Mutex<Call>>,
    handle: TrackHandle,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let failure = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(format!("{e:?}")),
                _ => None,
            }),
            _ => None,
        };

        let engine = self.engine.clone();
        let guild_id = self.guild_id;
        let generation = self.generation;
        let call = self.call.clone();
        let handle = self.handle.clone();

        tokio::spawn(async move {
            // Only the first notifier for the current track advances the queue;
            // Error and End can both fire, and skipped tracks end late.
            let still_current = {
                let mut queues = engine.queues.write().await;
                queues
                    .get_mut(&guild_id)
                    .filter(|q| q.track_handle.as_ref().is_some_and(|h| h.uuid() == handle.uuid()))
                    .map(|q| q.track_handle.take())
                    .is_some()
            };
            if !still_current {
                return;
            }

            if let Some(ref reason) = failure {
                let title = queue::get_current(&engine.queues, guild_id)
                    .await
                    .map_or_else(String::new, |t| t.title);
                warn!("{} track failed in guild {guild_id}: {reason}", engine.id);
                engine.emit(
                    guild_id,
                    generation,
                    EngineEvent::Error(PlaybackError::classify(&title, &reason)),
                );
            }

            if let Err(e) = play_next(&engine, guild_id, &call, generation, failure.is_some()).await {
                error!("failed to play the next track: {e}");
            }
        });

        None
    }
}

struct DisconnectNotifier {
    engine: Arc<Engine>,
    guild_id: GuildId,
    generation: Generation,
}

#[async_trait]
impl EventHandler for DisconnectNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let engine = self.engine.clone();
        let guild_id = self.guild_id;
        let generation = self.generation;

        tokio::spawn(async move {
            if !queue::is_current(&engine.queues, guild_id, generation).await {
                return;
            }
            info!("{} engine lost voice in guild {guild_id}", engine.id);
            queue::end_session(&engine.queues, guild_id).await;
            engine.emit(guild_id, generation, EngineEvent::Disconnected);
        });

        None
    }
}

/// Starts `song` for the session `generation`. Returns `false` without
/// playing anything when that session ended while the input was prepared.
async fn play_song(
    engine: &Arc<Engine>,
    guild_id: GuildId,
    call: &Arc<Mutex<Call>>,
    song: &Track,
    generation: Generation,
) -> Result<bool, PlaybackError> {
    let input = engine.input_for(song).await?;
    let volume = queue::get_volume(&engine.queues, guild_id).await;

    let track_handle = {
        let mut handler = call.lock().await;
        let track_handle = handler.play_only_input(input);
        let _ = track_handle.set_volume(gain(volume));

        for event in [TrackEvent::End, TrackEvent::Error] {
            track_handle.add_event(
                Event::Track(event),
                TrackEndNotifier {
                    engine: engine.clone(),
                    guild_id,
                    generation,
                    call: call.clone(),
                    handle: track_handle.clone(),
                },
            )?;
        }

        track_handle
    }; // handler lock dropped here

    {
        let mut queues = engine.queues.write().await;
        match queues.get_mut(&guild_id) {
            Some(q) if q.generation == Some(generation) => q.track_handle = Some(track_handle),
            _ => {
                let _ = track_handle.stop();
                info!("[{}] session in guild {guild_id} ended before {} started", engine.id, song.title);
                return Ok(false);
            }
        }
    }

    let upcoming = queue::upcoming(&engine.queues, guild_id).await;
    engine.emit(
        guild_id,
        generation,
        EngineEvent::TrackStarted {
            track: song.clone(),
            upcoming,
        },
    );

    info!("[{}] now playing in guild {guild_id}: {}", engine.id, song.title);
    Ok(true)
}

async fn play_next(
    engine: &Arc<Engine>,
    guild_id: GuildId,
    call: &Arc<Mutex<Call>>,
    generation: Generation,
    was_skipped: bool,
) -> Result<Option<Track>, PlaybackError> {
    let mut skip = was_skipped;

    for _ in 0..MAX_CONSECUTIVE_FAILURES {
        if !queue::is_current(&engine.queues, guild_id, generation).await {
            return Ok(None);
        }

        match queue::get_next_song(&engine.queues, guild_id, skip).await {
            Some(song) => match play_song(engine, guild_id, call, &song, generation).await {
                Ok(true) => return Ok(Some(song)),
                Ok(false) => return Ok(None),
                Err(e) => {
                    warn!("[{}] could not start {}: {e}", engine.id, song.title);
                    engine.emit(guild_id, generation, EngineEvent::Error(e));
                    skip = true;
                }
            },
            None => break,
        }
    }

    info!("queue is empty (guild: {guild_id})");
    queue::clear(&engine.queues, guild_id).await;
    engine.emit(guild_id, generation, EngineEvent::QueueFinished);
    Ok(None)
}

#[async_trait]
impl Backend for SongbirdBackend {
    fn id(&self) -> BackendId {
        self.engine.id
    }

    async fn play(&self, request: PlayRequest) -> Result<PlayOutcome, PlaybackError> {
        let engine = &self.engine;
        let guild_id = request.guild_id;

        let (songs, playlist) = match engine.ytdlp.resolve(&engine.http_client, &request.query).await? {
            Resolved::Track(song) => (vec![song], None),
            Resolved::Playlist { name, tracks } => (tracks, Some(name)),
        };
        let songs: Vec<Track> = songs
            .into_iter()
            .map(|mut song| {
                song.requester = request.requester.clone();
                song
            })
            .collect();
        let first = songs
            .first()
            .cloned()
            .ok_or_else(|| PlaybackError::NotFound(request.query.clone()))?;
        let count = songs.len();

        let call = engine.manager.join(guild_id, request.channel_id).await?;

        queue::bind_generation(&engine.queues, guild_id, request.generation).await;
        self.hook_disconnect(guild_id, request.generation, &call).await;

        let is_first = queue::is_empty(&engine.queues, guild_id).await;
        let position = queue::add_songs(&engine.queues, guild_id, request.generation, songs)
            .await
            .ok_or(PlaybackError::NoSession)?;

        if !is_first {
            // One event for the whole batch.
            let upcoming = queue::upcoming(&engine.queues, guild_id).await;
            engine.emit(guild_id, request.generation, EngineEvent::TrackAdded { upcoming });
            return Ok(match playlist {
                Some(name) => PlayOutcome::Playlist {
                    name,
                    count,
                    started: None,
                },
                None => PlayOutcome::Queued {
                    track: first,
                    position,
                },
            });
        }

        let next = queue::get_next_song(&engine.queues, guild_id, false)
            .await
            .unwrap_or(first);
        match play_song(engine, guild_id, &call, &next, request.generation).await {
            Ok(true) => {}
            Ok(false) => return Err(PlaybackError::NoSession),
            Err(e) => {
                if queue::is_current(&engine.queues, guild_id, request.generation).await {
                    queue::clear(&engine.queues, guild_id).await;
                }
                return Err(e);
            }
        }

        Ok(match playlist {
            Some(name) => PlayOutcome::Playlist {
                name,
                count,
                started: Some(next),
            },
            None => PlayOutcome::Started(next),
        })
    }

    async fn pause(&self, guild_id: GuildId) -> Result<Toggle, PlaybackError> {
        let (handle, generation) = current_handle(&self.engine.queues, guild_id).await?;
        let info = handle.get_info().await?;
        if matches!(info.playing, PlayMode::Pause) {
            return Ok(Toggle::AlreadyInState);
        }

        handle.pause()?;
        self.engine.emit(guild_id, generation, EngineEvent::Paused);
        Ok(Toggle::Changed)
    }

    async fn resume(&self, guild_id: GuildId) -> Result<Toggle, PlaybackError> {
        let (handle, generation) = current_handle(&self.engine.queues, guild_id).await?;
        let info = handle.get_info().await?;
        if matches!(info.playing, PlayMode::Play) {
            return Ok(Toggle::AlreadyInState);
        }

        handle.play()?;
        self.engine.emit(guild_id, generation, EngineEvent::Resumed);
        Ok(Toggle::Changed)
    }

    async fn skip(&self, guild_id: GuildId) -> Result<Option<Track>, PlaybackError> {
        let engine = &self.engine;
        if queue::get_current(&engine.queues, guild_id).await.is_none() {
            return Err(PlaybackError::NoSession);
        }
        let generation = queue::generation(&engine.queues, guild_id)
            .await
            .ok_or(PlaybackError::NoSession)?;
        let call = engine
            .manager
            .get(guild_id)
            .ok_or(PlaybackError::NoSession)?;

        // Detach the old track first so its end event does not advance again.
        if let Some(handle) = engine
            .queues
            .write()
            .await
            .get_mut(&guild_id)
            .and_then(|q| q.track_handle.take())
        {
            let _ = handle.stop();
        }

        play_next(engine, guild_id, &call, generation, true).await
    }

    async fn stop(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        queue::end_session(&self.engine.queues, guild_id).await;
        if self.engine.manager.get(guild_id).is_some() {
            if let Err(e) = self.engine.manager.remove(guild_id).await {
                warn!("failed to leave voice in guild {guild_id}: {e}");
            }
        }
        info!("[{}] stopped in guild {guild_id}", self.engine.id);
        Ok(())
    }

    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> Result<(), PlaybackError> {
        let engine = &self.engine;
        queue::set_volume(&engine.queues, guild_id, volume).await;
        let generation = queue::generation(&engine.queues, guild_id).await.unwrap_or_default();
        engine.emit(guild_id, generation, EngineEvent::VolumeChanged(volume));
        Ok(())
    }

    async fn set_loop_mode(&self, guild_id: GuildId, mode: LoopMode) -> Result<(), PlaybackError> {
        let engine = &self.engine;
        queue::set_loop_mode(&engine.queues, guild_id, mode).await;
        let generation = queue::generation(&engine.queues, guild_id).await.unwrap_or_default();
        engine.emit(guild_id, generation, EngineEvent::LoopModeChanged(mode));
        Ok(())
    }

    async fn queue_snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        let queues = self.engine.queues.read().await;
        match queues.get(&guild_id) {
            Some(q) => QueueSnapshot {
                current: q.current_song.clone(),
                upcoming: q.songs.iter().cloned().collect(),
                loop_mode: q.loop_mode,
                volume: q.volume,
            },
            None => QueueSnapshot::default(),
        }
    }
}

async fn current_handle(
    queues: &QueueManager,
    guild_id: GuildId,
) -> Result<(TrackHandle, Generation), PlaybackError> {
    let queues = queues.read().await;
    queues
        .get(&guild_id)
        .and_then(|q| q.track_handle.clone().zip(q.generation))
        .ok_or(PlaybackError::NoSession)
}
