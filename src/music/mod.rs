pub mod backend;
pub mod error;
pub mod player;
pub mod queue;
pub mod source;

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serenity::model::id::GuildId;
use songbird::tracks::TrackHandle;
use tokio::sync::RwLock;

use crate::playback::event::Generation;

pub const DEFAULT_VOLUME: u8 = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    pub source_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_display: Option<String>,
    pub author: String,
    pub requester: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    #[default]
    Off,
    Track,
    Queue,
}

impl LoopMode {
    /// Next mode in the `off -> track -> queue -> off` cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::Track,
            Self::Track => Self::Queue,
            Self::Queue => Self::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Track => "track",
            Self::Queue => "queue",
        }
    }
}

impl std::fmt::Display for LoopMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::Track => write!(f, "Repeat track"),
            Self::Queue => write!(f, "Repeat queue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLoopMode(pub String);

impl std::fmt::Display for UnknownLoopMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown loop mode `{}` (expected off, track or queue)", self.0)
    }
}

impl std::error::Error for UnknownLoopMode {}

impl FromStr for LoopMode {
    type Err = UnknownLoopMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" | "none" | "0" => Ok(Self::Off),
            "track" | "song" | "t" | "s" | "1" => Ok(Self::Track),
            "queue" | "q" | "all" | "2" => Ok(Self::Queue),
            other => Err(UnknownLoopMode(other.to_string())),
        }
    }
}

pub struct GuildQueue {
    pub songs: VecDeque<Track>,
    pub current_song: Option<Track>,
    pub loop_mode: LoopMode,
    pub volume: u8,
    pub track_handle: Option<TrackHandle>,
    /// Session the queue belongs to; `None` once that session was stopped.
    pub generation: Option<Generation>,
    pub disconnect_hooked: bool,
}

impl Default for GuildQueue {
    fn default() -> Self {
        Self {
            songs: VecDeque::new(),
            current_song: None,
            loop_mode: LoopMode::Off,
            volume: DEFAULT_VOLUME,
            track_handle: None,
            generation: None,
            disconnect_hooked: false,
        }
    }
}

pub type QueueManager = Arc<RwLock<HashMap<GuildId, GuildQueue>>>;

pub fn new_queue_manager() -> QueueManager {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Converts a 0..=100 percentage into songbird's linear gain.
pub fn gain(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}
