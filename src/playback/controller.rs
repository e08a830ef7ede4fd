use std::sync::Arc;

use serenity::model::id::{ChannelId, GuildId};
use tracing::{info, warn};

use super::aggregator::SharedAggregator;
use super::event::{BackendId, Generation};
use super::state::BackendStatus;
use crate::credentials::{CookieStore, CredentialError, Remediation, RemediationOutcome};
use crate::music::backend::{Backend, PlayOutcome, PlayRequest, QueueSnapshot, Toggle};
use crate::music::error::PlaybackError;
use crate::music::{LoopMode, Track};
use crate::radio::{RadioManager, RadioStart};

/// What `/stop` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stopped {
    Queue,
    Radio,
}

/// Single entry point for every playback command, whether it comes from chat,
/// the dashboard or a button.
pub struct PlaybackController {
    aggregator: SharedAggregator,
    primary: Arc<dyn Backend>,
    fallback: Option<Arc<dyn Backend>>,
    radio: Arc<RadioManager>,
    credentials: Arc<CookieStore>,
    remediation: Arc<Remediation>,
}

impl PlaybackController {
    pub fn new(
        aggregator: SharedAggregator,
        primary: Arc<dyn Backend>,
        fallback: Option<Arc<dyn Backend>>,
        radio: Arc<RadioManager>,
        credentials: Arc<CookieStore>,
        remediation: Arc<Remediation>,
    ) -> Self {
        Self {
            aggregator,
            primary,
            fallback,
            radio,
            credentials,
            remediation,
        }
    }

    pub fn aggregator(&self) -> &SharedAggregator {
        &self.aggregator
    }

    pub fn remediation(&self) -> &Arc<Remediation> {
        &self.remediation
    }

    pub fn radio(&self) -> &Arc<RadioManager> {
        &self.radio
    }

    pub async fn owner(&self, guild_id: GuildId) -> Option<BackendId> {
        self.aggregator.read().await.owner(guild_id).map(|(id, _)| id)
    }

    fn backend(&self, id: BackendId) -> Option<&Arc<dyn Backend>> {
        match id {
            BackendId::Primary => Some(&self.primary),
            BackendId::Fallback => self.fallback.as_ref(),
        }
    }

    async fn owning_backend(&self, guild_id: GuildId) -> Result<&Arc<dyn Backend>, PlaybackError> {
        let owner = self.owner(guild_id).await.ok_or(PlaybackError::NoSession)?;
        self.backend(owner).ok_or(PlaybackError::NoSession)
    }

    pub async fn play(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        query: &str,
        requester: &str,
    ) -> Result<PlayOutcome, PlaybackError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlaybackError::InvalidInput(
                "Please provide a song name or URL".to_string(),
            ));
        }
        if self.aggregator.read().await.backend_status() == BackendStatus::Missing {
            return Err(PlaybackError::BackendMissing);
        }

        if self.radio.teardown(guild_id).await {
            info!("radio stopped for queue playback in guild {guild_id}");
        }

        let request = |generation: Generation| PlayRequest {
            guild_id,
            channel_id,
            query: query.to_string(),
            requester: requester.to_string(),
            generation,
        };

        // Joining the running session and claiming a new one happen under one
        // lock; otherwise two concurrent first plays both claim the guild.
        let (running, generation) = {
            let mut aggregator = self.aggregator.write().await;
            let running = aggregator
                .owner(guild_id)
                .and_then(|(owner, generation)| Some((self.backend(owner)?, generation)));
            match running {
                Some((backend, generation)) => (Some(backend), generation),
                None => (None, aggregator.claim(guild_id, BackendId::Primary)),
            }
        };

        match running {
            Some(backend) => backend.play(request(generation)).await,
            None => self.play_with_fallback(guild_id, generation, request).await,
        }
    }

    /// Plays on the primary engine under the freshly claimed `generation` and
    /// walks the fallback policy when that fails.
    async fn play_with_fallback<F>(
        &self,
        guild_id: GuildId,
        generation: Generation,
        request: F,
    ) -> Result<PlayOutcome, PlaybackError>
    where
        F: Fn(Generation) -> PlayRequest,
    {
        let mut result = self.primary.play(request(generation)).await;

        if matches!(result, Err(PlaybackError::AuthRequired))
            && self.remediation.attempt().await == RemediationOutcome::Refreshed
        {
            info!("retrying primary engine with reloaded cookies (guild: {guild_id})");
            result = self.primary.play(request(generation)).await;
        }

        let err = match result {
            Ok(outcome) => return Ok(outcome),
            Err(e) => e,
        };

        let fallback = match &self.fallback {
            Some(fallback) if err.allows_fallback() => fallback,
            _ => {
                self.release_claim(guild_id, BackendId::Primary).await;
                return Err(err);
            }
        };

        warn!("primary engine failed in guild {guild_id} ({}), trying fallback", err.kind());
        let generation = self.aggregator.write().await.claim(guild_id, BackendId::Fallback);
        match fallback.play(request(generation)).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("fallback engine failed in guild {guild_id}: {e}");
                self.release_claim(guild_id, BackendId::Fallback).await;
                Err(e)
            }
        }
    }

    async fn release_claim(&self, guild_id: GuildId, backend: BackendId) {
        let mut aggregator = self.aggregator.write().await;
        if aggregator.owner(guild_id).map(|(id, _)| id) == Some(backend) {
            aggregator.release(guild_id);
        }
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<Toggle, PlaybackError> {
        self.owning_backend(guild_id).await?.pause(guild_id).await
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<Toggle, PlaybackError> {
        self.owning_backend(guild_id).await?.resume(guild_id).await
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<Option<Track>, PlaybackError> {
        self.owning_backend(guild_id).await?.skip(guild_id).await
    }

    /// Ends the guild's queue session.
    pub async fn stop(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        let backend = self.owning_backend(guild_id).await?;
        let result = backend.stop(guild_id).await;
        self.aggregator.write().await.release(guild_id);
        result
    }

    /// Ends whatever is playing, queue or radio.
    pub async fn stop_any(&self, guild_id: GuildId) -> Result<Stopped, PlaybackError> {
        if self.owner(guild_id).await.is_some() {
            self.stop(guild_id).await?;
            return Ok(Stopped::Queue);
        }
        self.radio.stop(guild_id).await?;
        Ok(Stopped::Radio)
    }

    pub async fn set_volume(&self, guild_id: GuildId, volume: i64) -> Result<u8, PlaybackError> {
        let volume = u8::try_from(volume)
            .ok()
            .filter(|v| *v <= 100)
            .ok_or_else(|| {
                PlaybackError::InvalidInput("Volume must be between 0 and 100".to_string())
            })?;

        self.owning_backend(guild_id)
            .await?
            .set_volume(guild_id, volume)
            .await?;
        Ok(volume)
    }

    /// Sets the loop mode, or advances it one step when `mode` is `None`.
    pub async fn set_loop_mode(
        &self,
        guild_id: GuildId,
        mode: Option<LoopMode>,
    ) -> Result<LoopMode, PlaybackError> {
        let backend = self.owning_backend(guild_id).await?;
        let mode = match mode {
            Some(mode) => mode,
            None => backend.queue_snapshot(guild_id).await.loop_mode.next(),
        };
        backend.set_loop_mode(guild_id, mode).await?;
        Ok(mode)
    }

    pub async fn queue_snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        match self.owning_backend(guild_id).await {
            Ok(backend) => backend.queue_snapshot(guild_id).await,
            Err(_) => QueueSnapshot::default(),
        }
    }

    /// Starts a radio stream, ending any queue session first.
    pub async fn start_radio(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        url: &str,
        label: &str,
    ) -> Result<RadioStart, PlaybackError> {
        if self.owner(guild_id).await.is_some() {
            info!("stopping queue playback for radio in guild {guild_id}");
            if let Err(e) = self.stop(guild_id).await {
                warn!("failed to stop queue before radio: {e}");
            }
        }
        self.radio.start(guild_id, channel_id, url, label).await
    }

    pub async fn stop_radio(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        self.radio.stop(guild_id).await.map(|_| ())
    }

    /// The bot left voice in this guild: drop every session bound to it.
    pub async fn teardown_voice(&self, guild_id: GuildId) {
        if self.owner(guild_id).await.is_some() {
            if let Err(e) = self.stop(guild_id).await {
                warn!("failed to stop queue on voice teardown: {e}");
            }
        }
        self.radio.teardown(guild_id).await;
    }

    /// The bot was removed from the guild.
    pub async fn forget_guild(&self, guild_id: GuildId) {
        self.teardown_voice(guild_id).await;
        self.aggregator.write().await.forget_guild(guild_id);
        info!("forgot guild {guild_id}");
    }

    /// Stores new cookies and lets the next auth failure refresh again.
    pub async fn update_credentials(&self, cookie_header: &str) -> Result<usize, CredentialError> {
        let count = self.credentials.replace(cookie_header).await?;
        self.remediation.reset().await;
        Ok(count)
    }
}
