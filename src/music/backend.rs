use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};

use super::error::PlaybackError;
use super::{LoopMode, Track, DEFAULT_VOLUME};
use crate::playback::event::{BackendId, Generation};

#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub query: String,
    pub requester: String,
    /// Stamped on every event this request causes.
    pub generation: Generation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// The queue was empty; the track is starting now.
    Started(Track),
    /// Appended behind the current track at `position` (1-based).
    Queued { track: Track, position: usize },
    /// A whole playlist was appended. `started` is its first track when the
    /// queue was empty and playback began with it.
    Playlist {
        name: String,
        count: usize,
        started: Option<Track>,
    },
}

/// Result of a pause/resume request. Callers show the two cases differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Changed,
    AlreadyInState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub current: Option<Track>,
    pub upcoming: Vec<Track>,
    pub loop_mode: LoopMode,
    pub volume: u8,
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self {
            current: None,
            upcoming: Vec::new(),
            loop_mode: LoopMode::Off,
            volume: DEFAULT_VOLUME,
        }
    }
}

/// Uniform operation set over one playback engine.
///
/// Implementations report state changes as events on their sink rather than
/// through return values; returns only carry what the caller must show.
#[async_trait]
pub trait Backend: Send + Sync {
    fn id(&self) -> BackendId;

    async fn play(&self, request: PlayRequest) -> Result<PlayOutcome, PlaybackError>;

    async fn pause(&self, guild_id: GuildId) -> Result<Toggle, PlaybackError>;

    async fn resume(&self, guild_id: GuildId) -> Result<Toggle, PlaybackError>;

    /// Returns the track that is now playing, if any.
    async fn skip(&self, guild_id: GuildId) -> Result<Option<Track>, PlaybackError>;

    async fn stop(&self, guild_id: GuildId) -> Result<(), PlaybackError>;

    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> Result<(), PlaybackError>;

    async fn set_loop_mode(&self, guild_id: GuildId, mode: LoopMode) -> Result<(), PlaybackError>;

    async fn queue_snapshot(&self, guild_id: GuildId) -> QueueSnapshot;
}
