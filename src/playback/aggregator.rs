use std::collections::HashMap;
use std::sync::Arc;

use serenity::model::id::GuildId;
use tokio::sync::RwLock;

use super::event::{BackendEvent, BackendId, EngineEvent, Generation};
use super::state::{BackendStatus, ConnectionStatus, PlaybackState, RadioSession, StatusSnapshot};
use crate::music::error::PlaybackError;

pub type SharedAggregator = Arc<RwLock<Aggregator>>;

pub fn new_aggregator() -> SharedAggregator {
    Arc::new(RwLock::new(Aggregator::default()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied,
    /// Event from an older play/stop cycle.
    Stale,
    /// Event from an adapter that does not own the guild.
    NotOwner,
    /// Error events never touch state; the caller routes them.
    Unrouted(PlaybackError),
}

#[derive(Default)]
struct GuildSession {
    state: PlaybackState,
    owner: Option<BackendId>,
    generation: Generation,
}

#[derive(Default)]
pub struct Aggregator {
    guilds: HashMap<GuildId, GuildSession>,
    radio: HashMap<GuildId, RadioSession>,
    backend_status: BackendStatus,
    active_guild: Option<GuildId>,
}

impl Aggregator {
    /// Hands the guild to `backend` under a fresh generation.
    pub fn claim(&mut self, guild_id: GuildId, backend: BackendId) -> Generation {
        let session = self.guilds.entry(guild_id).or_default();
        session.generation += 1;
        session.owner = Some(backend);
        session.state.clear_playback();
        session.generation
    }

    pub fn owner(&self, guild_id: GuildId) -> Option<(BackendId, Generation)> {
        self.guilds
            .get(&guild_id)
            .and_then(|s| s.owner.map(|owner| (owner, s.generation)))
    }

    /// Ends the guild's queue session. Returns the previous owner.
    pub fn release(&mut self, guild_id: GuildId) -> Option<BackendId> {
        let session = self.guilds.get_mut(&guild_id)?;
        let previous = session.owner.take();
        session.generation += 1;
        session.state.clear_playback();
        previous
    }

    pub fn apply(&mut self, event: &BackendEvent) -> ApplyOutcome {
        let Some(session) = self.guilds.get_mut(&event.guild_id) else {
            return ApplyOutcome::NotOwner;
        };
        if session.owner != Some(event.backend) {
            return ApplyOutcome::NotOwner;
        }
        if session.generation != event.generation {
            return ApplyOutcome::Stale;
        }

        let state = &mut session.state;
        match &event.kind {
            EngineEvent::TrackStarted { track, upcoming } => {
                state.current_track = Some(track.clone());
                state.upcoming = upcoming.clone();
                state.is_playing = true;
                state.is_paused = false;
                state.connection_status = ConnectionStatus::Connected;
            }
            EngineEvent::TrackAdded { upcoming } => {
                if state.current_track.is_some() {
                    state.upcoming = upcoming.clone();
                }
            }
            EngineEvent::QueueFinished => state.clear_playback(),
            EngineEvent::Paused => {
                if state.current_track.is_some() {
                    state.is_paused = true;
                    state.is_playing = false;
                }
            }
            EngineEvent::Resumed => {
                if state.current_track.is_some() {
                    state.is_paused = false;
                    state.is_playing = true;
                }
            }
            EngineEvent::VolumeChanged(volume) => state.volume = (*volume).min(100),
            EngineEvent::LoopModeChanged(mode) => state.loop_mode = *mode,
            EngineEvent::Disconnected => {
                state.connection_status = ConnectionStatus::Disconnected;
                state.clear_playback();
                session.owner = None;
                session.generation += 1;
            }
            EngineEvent::Error(err) => return ApplyOutcome::Unrouted(err.clone()),
        }

        self.active_guild = Some(event.guild_id);
        ApplyOutcome::Applied
    }

    pub fn state(&self, guild_id: GuildId) -> PlaybackState {
        self.guilds
            .get(&guild_id)
            .map(|s| s.state.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let active = self
            .active_guild
            .map(|id| self.state(id))
            .unwrap_or_default();

        StatusSnapshot {
            active,
            backend_status: self.backend_status,
            active_guild_id: self.active_guild.map(|id| id.to_string()),
            guilds: self
                .guilds
                .iter()
                .map(|(id, s)| (id.to_string(), s.state.clone()))
                .collect(),
            radio_sessions: self
                .radio
                .iter()
                .map(|(id, r)| (id.to_string(), r.clone()))
                .collect(),
        }
    }

    pub fn backend_status(&self) -> BackendStatus {
        self.backend_status
    }

    pub fn set_backend_status(&mut self, status: BackendStatus) {
        self.backend_status = status;
    }

    pub fn radio(&self, guild_id: GuildId) -> Option<&RadioSession> {
        self.radio.get(&guild_id)
    }

    pub fn insert_radio(&mut self, guild_id: GuildId, session: RadioSession) {
        self.radio.insert(guild_id, session);
        self.active_guild = Some(guild_id);
    }

    pub fn remove_radio(&mut self, guild_id: GuildId) -> Option<RadioSession> {
        self.radio.remove(&guild_id)
    }

    /// Guild-removal hook: drops every trace of the guild.
    pub fn forget_guild(&mut self, guild_id: GuildId) {
        self.guilds.remove(&guild_id);
        self.radio.remove(&guild_id);
        if self.active_guild == Some(guild_id) {
            self.active_guild = None;
        }
    }
}
