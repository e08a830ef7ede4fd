use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::playback::aggregator::SharedAggregator;
use crate::playback::state::StatusSnapshot;

/// What viewers receive: the snapshot plus when it was taken.
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    /// Unix time in milliseconds.
    pub timestamp: i64,
}

impl StatusMessage {
    pub fn now(snapshot: StatusSnapshot) -> Self {
        Self {
            snapshot,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Serialized status for one push. `None` only if serialization fails.
pub async fn status_json(aggregator: &SharedAggregator) -> Option<String> {
    let snapshot = aggregator.read().await.snapshot();
    match serde_json::to_string(&StatusMessage::now(snapshot)) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("failed to serialize status: {e}");
            None
        }
    }
}

/// Pushes the status to every connected viewer on a fixed interval.
pub async fn run(aggregator: SharedAggregator, updates: broadcast::Sender<String>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if updates.receiver_count() == 0 {
            continue;
        }
        if let Some(json) = status_json(&aggregator).await {
            let delivered = updates.send(json).unwrap_or(0);
            debug!("status pushed to {delivered} viewers");
        }
    }
}
