use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::builder::CreateMessage;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::RwLock;
use tracing::warn;

use crate::music::error::PlaybackError;
use crate::playback::dispatch::{Announcer, Notice};
use crate::utils::embed;

/// Posts playback notices to the text channel a guild last used for music.
pub struct ChannelAnnouncer {
    http: Arc<serenity::Http>,
    channels: RwLock<HashMap<GuildId, ChannelId>>,
}

impl ChannelAnnouncer {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self {
            http,
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub async fn remember(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.channels.write().await.insert(guild_id, channel_id);
    }

    pub async fn forget(&self, guild_id: GuildId) {
        self.channels.write().await.remove(&guild_id);
    }
}

fn notice_embed(notice: &Notice) -> serenity::CreateEmbed {
    match notice {
        Notice::NowPlaying(track) => embed::now_playing(track),
        Notice::QueueFinished => embed::info("🏁 Queue Finished", "No more tracks in the queue."),
        Notice::Disconnected => embed::warning("Disconnected from the voice channel."),
        Notice::Failed(PlaybackError::AuthRequired) => embed::error(
            "YouTube is asking to confirm you're not a bot. Trying to reload the cookies, \
             or update them with `/cookies` or the dashboard.",
        ),
        Notice::Failed(err) => embed::error(&err.to_string()),
        Notice::CredentialsReloaded => embed::info(
            "🍪 Cookies Reloaded",
            "YouTube cookies were reloaded. Please try your request again.",
        ),
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn announce(&self, guild_id: GuildId, notice: Notice) {
        let Some(channel_id) = self.channels.read().await.get(&guild_id).copied() else {
            return;
        };

        let message = CreateMessage::new().embed(notice_embed(&notice));
        if let Err(e) = channel_id.send_message(&self.http, message).await {
            warn!("failed to announce in guild {guild_id}: {e}");
        }
    }
}
