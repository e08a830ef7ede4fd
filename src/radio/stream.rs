use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::events::{CoreEvent, Event, EventContext, EventHandler, TrackEvent};
use songbird::input::HttpRequest;
use songbird::tracks::TrackHandle;
use songbird::{Call, Songbird};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{RadioOutput, RadioSignal, RadioSignalSink, RadioStream, RECONNECT_TIMEOUT};
use crate::music::error::PlaybackError;
use crate::music::{gain, DEFAULT_VOLUME};

type StreamHandles = Arc<Mutex<HashMap<GuildId, TrackHandle>>>;

/// Plays radio streams through songbird's HTTP input.
pub struct SongbirdRadioOutput {
    manager: Arc<Songbird>,
    http_client: reqwest::Client,
    signals: RadioSignalSink,
    streams: StreamHandles,
}

impl SongbirdRadioOutput {
    pub fn new(manager: Arc<Songbird>, http_client: reqwest::Client, signals: RadioSignalSink) -> Self {
        Self {
            manager,
            http_client,
            signals,
            streams: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn play_stream(
        &self,
        guild_id: GuildId,
        call: &Arc<Mutex<Call>>,
        stream: &RadioStream,
    ) -> Result<(), PlaybackError> {
        let input = HttpRequest::new(self.http_client.clone(), stream.url.clone());

        // Held across the swap so the old track's end event sees the new handle.
        let mut streams = self.streams.lock().await;
        let handle = {
            let mut handler = call.lock().await;
            handler.play_only_input(input.into())
        };
        let _ = handle.set_volume(gain(DEFAULT_VOLUME));

        for event in [TrackEvent::End, TrackEvent::Error] {
            handle.add_event(
                Event::Track(event),
                StreamEndNotifier {
                    guild_id,
                    session_id: stream.session_id,
                    handle: handle.clone(),
                    streams: self.streams.clone(),
                    signals: self.signals.clone(),
                },
            )?;
        }

        streams.insert(guild_id, handle);
        Ok(())
    }
}

#[async_trait]
impl RadioOutput for SongbirdRadioOutput {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        stream: &RadioStream,
    ) -> Result<(), PlaybackError> {
        let call = self.manager.join(guild_id, channel_id).await?;

        {
            let mut handler = call.lock().await;
            let watch = VoiceWatch {
                guild_id,
                session_id: stream.session_id,
                connects: Arc::new(AtomicU64::new(0)),
                signals: self.signals.clone(),
            };
            handler.add_global_event(Event::Core(CoreEvent::DriverDisconnect), watch.clone());
            handler.add_global_event(Event::Core(CoreEvent::DriverConnect), watch.clone());
            handler.add_global_event(Event::Core(CoreEvent::DriverReconnect), watch);
        }

        self.play_stream(guild_id, &call, stream).await?;
        info!("radio connected in guild {guild_id}");
        Ok(())
    }

    async fn replace(&self, guild_id: GuildId, stream: &RadioStream) -> Result<(), PlaybackError> {
        let call = self.manager.get(guild_id).ok_or(PlaybackError::NoRadio)?;
        self.play_stream(guild_id, &call, stream).await
    }

    async fn disconnect(&self, guild_id: GuildId) {
        if let Some(handle) = self.streams.lock().await.remove(&guild_id) {
            let _ = handle.stop();
        }
        if self.manager.get(guild_id).is_some() {
            if let Err(e) = self.manager.remove(guild_id).await {
                warn!("failed to leave voice in guild {guild_id}: {e}");
            }
        }
    }
}

struct StreamEndNotifier {
    guild_id: GuildId,
    session_id: u64,
    handle: TrackHandle,
    streams: StreamHandles,
    signals: RadioSignalSink,
}

#[async_trait]
impl EventHandler for StreamEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let current = {
            let streams = self.streams.lock().await;
            streams
                .get(&self.guild_id)
                .is_some_and(|h| h.uuid() == self.handle.uuid())
        };
        if current {
            warn!("radio stream ended in guild {}", self.guild_id);
            let _ = self.signals.send(RadioSignal::StreamEnded {
                guild_id: self.guild_id,
                session_id: self.session_id,
            });
        }
        None
    }
}

/// Counts driver connects; a disconnect not followed by one within
/// [`RECONNECT_TIMEOUT`] reports the voice connection as lost.
#[derive(Clone)]
struct VoiceWatch {
    guild_id: GuildId,
    session_id: u64,
    connects: Arc<AtomicU64>,
    signals: RadioSignalSink,
}

#[async_trait]
impl EventHandler for VoiceWatch {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::DriverConnect(_) | EventContext::DriverReconnect(_) => {
                self.connects.fetch_add(1, Ordering::SeqCst);
            }
            EventContext::DriverDisconnect(_) => {
                let seen = self.connects.load(Ordering::SeqCst);
                let watch = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(RECONNECT_TIMEOUT).await;
                    if watch.connects.load(Ordering::SeqCst) == seen {
                        let _ = watch.signals.send(RadioSignal::VoiceLost {
                            guild_id: watch.guild_id,
                            session_id: watch.session_id,
                        });
                    }
                });
            }
            _ => {}
        }
        None
    }
}
