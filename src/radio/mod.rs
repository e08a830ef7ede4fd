pub mod stream;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::music::error::PlaybackError;
use crate::playback::aggregator::SharedAggregator;
use crate::playback::state::RadioSession;

/// How long the driver gets to reconnect before the session is dropped.
pub const RECONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause between recovery attempts for a stream that keeps failing.
pub const RECOVERY_DELAY: Duration = Duration::from_secs(5);
const MAX_RECOVERY_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct Station {
    pub label: &'static str,
    pub url: &'static str,
}

pub const LOFI: Station = Station {
    label: "Lofi Radio",
    url: "https://lofi.stream.laut.fm/lofi",
};

pub const INDONESIAN: Station = Station {
    label: "Indonesian Radio",
    url: "https://radione.top:8888/dmi",
};

/// One stream bound to one radio session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioStream {
    pub session_id: u64,
    pub url: String,
}

/// Voice-side half of the radio: joins channels and plays the stream.
#[async_trait]
pub trait RadioOutput: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        stream: &RadioStream,
    ) -> Result<(), PlaybackError>;

    /// Swaps the stream on the existing connection.
    async fn replace(&self, guild_id: GuildId, stream: &RadioStream) -> Result<(), PlaybackError>;

    async fn disconnect(&self, guild_id: GuildId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioStart {
    Started,
    /// A session was already running; only its stream changed.
    Changed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioSignal {
    StreamEnded { guild_id: GuildId, session_id: u64 },
    VoiceLost { guild_id: GuildId, session_id: u64 },
}

pub type RadioSignalSink = mpsc::UnboundedSender<RadioSignal>;
pub type RadioSignalStream = mpsc::UnboundedReceiver<RadioSignal>;

pub fn signal_channel() -> (RadioSignalSink, RadioSignalStream) {
    mpsc::unbounded_channel()
}

pub struct RadioManager {
    aggregator: SharedAggregator,
    output: Arc<dyn RadioOutput>,
    next_session: AtomicU64,
    recovery_delay: Duration,
}

impl RadioManager {
    pub fn new(aggregator: SharedAggregator, output: Arc<dyn RadioOutput>) -> Self {
        Self::with_recovery_delay(aggregator, output, RECOVERY_DELAY)
    }

    pub fn with_recovery_delay(
        aggregator: SharedAggregator,
        output: Arc<dyn RadioOutput>,
        recovery_delay: Duration,
    ) -> Self {
        Self {
            aggregator,
            output,
            next_session: AtomicU64::new(1),
            recovery_delay,
        }
    }

    /// Starts a stream, or switches the stream of a running session.
    /// The caller is responsible for ending any queue session first.
    pub async fn start(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        url: &str,
        label: &str,
    ) -> Result<RadioStart, PlaybackError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PlaybackError::InvalidInput(
                "The radio stream must be an http(s) URL".to_string(),
            ));
        }

        let existing = self
            .aggregator
            .read()
            .await
            .radio(guild_id)
            .map(|s| s.session_id);

        let (session_id, outcome) = match existing {
            Some(session_id) => {
                let stream = RadioStream {
                    session_id,
                    url: url.to_string(),
                };
                self.output.replace(guild_id, &stream).await?;
                (session_id, RadioStart::Changed)
            }
            None => {
                let session_id = self.next_session.fetch_add(1, Ordering::Relaxed);
                let stream = RadioStream {
                    session_id,
                    url: url.to_string(),
                };
                self.output.connect(guild_id, channel_id, &stream).await?;
                (session_id, RadioStart::Started)
            }
        };

        self.aggregator.write().await.insert_radio(
            guild_id,
            RadioSession {
                stream_url: url.to_string(),
                label: label.to_string(),
                session_id,
            },
        );

        info!("radio {outcome:?} in guild {guild_id}: {label} ({url})");
        Ok(outcome)
    }

    pub async fn stop(&self, guild_id: GuildId) -> Result<RadioSession, PlaybackError> {
        let session = self
            .aggregator
            .write()
            .await
            .remove_radio(guild_id)
            .ok_or(PlaybackError::NoRadio)?;

        self.output.disconnect(guild_id).await;
        info!("radio stopped in guild {guild_id}");
        Ok(session)
    }

    /// Removes the session if any, without reporting its absence.
    pub async fn teardown(&self, guild_id: GuildId) -> bool {
        self.stop(guild_id).await.is_ok()
    }

    /// Re-acquires the stream of a session whose track ended or failed.
    pub async fn on_stream_ended(&self, guild_id: GuildId, session_id: u64) {
        for attempt in 1..=MAX_RECOVERY_ATTEMPTS {
            let url = match self.current_url(guild_id, session_id).await {
                Some(url) => url,
                None => return,
            };

            let stream = RadioStream { session_id, url };
            match self.output.replace(guild_id, &stream).await {
                Ok(()) => {
                    info!("radio stream recovered in guild {guild_id}");
                    return;
                }
                Err(e) => {
                    warn!("radio recovery attempt {attempt} failed in guild {guild_id}: {e}");
                    tokio::time::sleep(self.recovery_delay).await;
                }
            }
        }

        if self.current_url(guild_id, session_id).await.is_some() {
            warn!("giving up on radio stream in guild {guild_id}");
            self.teardown(guild_id).await;
        }
    }

    pub async fn on_voice_lost(&self, guild_id: GuildId, session_id: u64) {
        if self.current_url(guild_id, session_id).await.is_none() {
            return;
        }
        warn!("radio voice connection lost in guild {guild_id}, removing session");
        self.teardown(guild_id).await;
    }

    async fn current_url(&self, guild_id: GuildId, session_id: u64) -> Option<String> {
        let aggregator = self.aggregator.read().await;
        aggregator
            .radio(guild_id)
            .filter(|s| s.session_id == session_id)
            .map(|s| s.stream_url.clone())
    }
}

/// Applies voice-side signals to the manager for the life of the process.
pub async fn run_signals(manager: Arc<RadioManager>, mut signals: RadioSignalStream) {
    while let Some(signal) = signals.recv().await {
        let manager = manager.clone();
        tokio::spawn(async move {
            match signal {
                RadioSignal::StreamEnded {
                    guild_id,
                    session_id,
                } => manager.on_stream_ended(guild_id, session_id).await,
                RadioSignal::VoiceLost {
                    guild_id,
                    session_id,
                } => manager.on_voice_lost(guild_id, session_id).await,
            }
        });
    }
}
