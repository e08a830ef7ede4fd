use std::sync::Arc;

use async_trait::async_trait;
use serenity::model::id::GuildId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::aggregator::{ApplyOutcome, SharedAggregator};
use super::event::{BackendEvent, EngineEvent, EventStream};
use crate::credentials::{Remediation, RemediationOutcome};
use crate::music::error::PlaybackError;
use crate::music::Track;

/// Something worth telling the guild's text channel about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The queue moved on to another track without a command asking for it.
    NowPlaying(Track),
    QueueFinished,
    Disconnected,
    Failed(PlaybackError),
    CredentialsReloaded,
}

#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, guild_id: GuildId, notice: Notice);
}

pub type NoticeSink = mpsc::UnboundedSender<(GuildId, Notice)>;
pub type NoticeStream = mpsc::UnboundedReceiver<(GuildId, Notice)>;

pub fn notice_channel() -> (NoticeSink, NoticeStream) {
    mpsc::unbounded_channel()
}

fn notify(notices: &NoticeSink, guild_id: GuildId, notice: Notice) {
    if notices.send((guild_id, notice)).is_err() {
        warn!("announcer closed, dropping notice for guild {guild_id}");
    }
}

/// Drains engine events in emission order for the life of the process.
/// Notices are queued for [`announce_all`] so a slow chat API never delays
/// state updates.
pub async fn run(
    mut events: EventStream,
    aggregator: SharedAggregator,
    remediation: Arc<Remediation>,
    notices: NoticeSink,
) {
    while let Some(event) = events.recv().await {
        handle_event(&event, &aggregator, &remediation, &notices).await;
    }
    info!("event dispatcher stopped");
}

/// Posts queued notices in order.
pub async fn announce_all(mut notices: NoticeStream, announcer: Arc<dyn Announcer>) {
    while let Some((guild_id, notice)) = notices.recv().await {
        announcer.announce(guild_id, notice).await;
    }
    info!("announcer stopped");
}

pub async fn handle_event(
    event: &BackendEvent,
    aggregator: &SharedAggregator,
    remediation: &Remediation,
    notices: &NoticeSink,
) -> ApplyOutcome {
    let (outcome, had_track) = {
        let mut aggregator = aggregator.write().await;
        let had_track = aggregator.state(event.guild_id).current_track.is_some();
        (aggregator.apply(event), had_track)
    };

    let guild_id = event.guild_id;
    match &outcome {
        ApplyOutcome::Applied => match &event.kind {
            EngineEvent::TrackStarted { track, .. } if had_track => {
                notify(notices, guild_id, Notice::NowPlaying(track.clone()));
            }
            EngineEvent::QueueFinished => notify(notices, guild_id, Notice::QueueFinished),
            EngineEvent::Disconnected => notify(notices, guild_id, Notice::Disconnected),
            _ => {}
        },
        ApplyOutcome::Stale | ApplyOutcome::NotOwner => {
            debug!(
                "dropped {:?} from {} (generation {}) in guild {guild_id}: {outcome:?}",
                event.kind, event.backend, event.generation
            );
        }
        ApplyOutcome::Unrouted(err) => {
            notify(notices, guild_id, Notice::Failed(err.clone()));
            if *err == PlaybackError::AuthRequired
                && remediation.attempt().await == RemediationOutcome::Refreshed
            {
                notify(notices, guild_id, Notice::CredentialsReloaded);
            }
        }
    }

    outcome
}
