use serde::Serialize;
use serenity::model::id::GuildId;
use tokio::sync::mpsc;
use tracing::warn;

use crate::music::error::PlaybackError;
use crate::music::{LoopMode, Track};

/// Play/stop cycle counter for one guild.
pub type Generation = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    Primary,
    Fallback,
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    TrackStarted { track: Track, upcoming: Vec<Track> },
    TrackAdded { upcoming: Vec<Track> },
    QueueFinished,
    Paused,
    Resumed,
    VolumeChanged(u8),
    LoopModeChanged(LoopMode),
    Disconnected,
    Error(PlaybackError),
}

/// An engine event stamped with where and when it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendEvent {
    pub guild_id: GuildId,
    pub backend: BackendId,
    pub generation: Generation,
    pub kind: EngineEvent,
}

pub type EventSink = mpsc::UnboundedSender<BackendEvent>;
pub type EventStream = mpsc::UnboundedReceiver<BackendEvent>;

pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// Sends an event, logging instead of failing when the dispatcher is gone.
pub fn emit(
    sink: &EventSink,
    guild_id: GuildId,
    backend: BackendId,
    generation: Generation,
    kind: EngineEvent,
) {
    let event = BackendEvent {
        guild_id,
        backend,
        generation,
        kind,
    };
    if sink.send(event).is_err() {
        warn!("event dispatcher closed, dropping {backend} event for guild {guild_id}");
    }
}
