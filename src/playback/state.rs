use std::collections::BTreeMap;

use serde::Serialize;

use crate::music::{LoopMode, Track, DEFAULT_VOLUME};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    #[default]
    Unknown,
    Configured,
    Missing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

/// Now-playing state of one guild.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_paused: bool,
    pub volume: u8,
    pub loop_mode: LoopMode,
    pub current_track: Option<Track>,
    pub upcoming: Vec<Track>,
    pub connection_status: ConnectionStatus,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_paused: false,
            volume: DEFAULT_VOLUME,
            loop_mode: LoopMode::Off,
            current_track: None,
            upcoming: Vec::new(),
            connection_status: ConnectionStatus::Disconnected,
        }
    }
}

impl PlaybackState {
    /// Drops the current track and queue; volume and loop mode survive.
    pub fn clear_playback(&mut self) {
        self.is_playing = false;
        self.is_paused = false;
        self.current_track = None;
        self.upcoming.clear();
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioSession {
    pub stream_url: String,
    pub label: String,
    #[serde(skip)]
    pub session_id: u64,
}

/// Immutable copy of everything the dashboard shows.
///
/// The flattened fields mirror the most recently active guild so a single
/// guild dashboard can read them without knowing any ids.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub active: PlaybackState,
    pub backend_status: BackendStatus,
    pub active_guild_id: Option<String>,
    pub guilds: BTreeMap<String, PlaybackState>,
    pub radio_sessions: BTreeMap<String, RadioSession>,
}
