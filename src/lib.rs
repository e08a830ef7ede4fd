pub mod commands;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod events;
pub mod music;
pub mod playback;
pub mod radio;
pub mod utils;

use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub struct Data {
    pub controller: Arc<playback::PlaybackController>,
    pub announcer: Arc<events::announce::ChannelAnnouncer>,
}
