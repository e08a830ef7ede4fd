use std::collections::HashMap;

use serenity::model::id::GuildId;

use super::{gain, GuildQueue, LoopMode, QueueManager, Track, DEFAULT_VOLUME};
use crate::playback::event::Generation;

/// Binds the guild's queue to a session generation. A different generation
/// means a new session, so leftovers from the previous one are dropped.
pub async fn bind_generation(manager: &QueueManager, guild_id: GuildId, generation: Generation) {
    let mut queues = manager.write().await;
    let queue = queues.entry(guild_id).or_default();
    if queue.generation != Some(generation) {
        queue.songs.clear();
        queue.current_song = None;
        if let Some(handle) = queue.track_handle.take() {
            let _ = handle.stop();
        }
        queue.generation = Some(generation);
        queue.disconnect_hooked = false;
    }
}

/// Clears the queue and detaches it from its session, so work still in
/// flight for that session sees it is no longer current.
pub async fn end_session(manager: &QueueManager, guild_id: GuildId) {
    let mut queues = manager.write().await;
    if let Some(queue) = queues.get_mut(&guild_id) {
        queue.songs.clear();
        queue.current_song = None;
        if let Some(handle) = queue.track_handle.take() {
            let _ = handle.stop();
        }
        queue.generation = None;
        queue.disconnect_hooked = false;
    }
}

pub async fn generation(manager: &QueueManager, guild_id: GuildId) -> Option<Generation> {
    let queues = manager.read().await;
    queues.get(&guild_id).and_then(|q| q.generation)
}

pub async fn is_current(manager: &QueueManager, guild_id: GuildId, generation: Generation) -> bool {
    generation_matches(&*manager.read().await, guild_id, generation)
}

fn generation_matches(
    queues: &HashMap<GuildId, GuildQueue>,
    guild_id: GuildId,
    generation: Generation,
) -> bool {
    queues
        .get(&guild_id)
        .is_some_and(|q| q.generation == Some(generation))
}

/// Appends a batch of songs to the session's queue. Returns the new queue
/// length, or `None` when the session has already ended.
pub async fn add_songs(
    manager: &QueueManager,
    guild_id: GuildId,
    generation: Generation,
    songs: Vec<Track>,
) -> Option<usize> {
    let mut queues = manager.write().await;
    if !generation_matches(&queues, guild_id, generation) {
        return None;
    }
    let queue = queues.get_mut(&guild_id)?;
    queue.songs.extend(songs);
    Some(queue.songs.len())
}

pub async fn get_next_song(
    manager: &QueueManager,
    guild_id: GuildId,
    was_skipped: bool,
) -> Option<Track> {
    let mut queues = manager.write().await;
    let queue = queues.entry(guild_id).or_default();

    if !was_skipped && queue.loop_mode == LoopMode::Track && queue.current_song.is_some() {
        return queue.current_song.clone();
    }

    if queue.loop_mode == LoopMode::Queue {
        if let Some(current) = queue.current_song.take() {
            queue.songs.push_back(current);
        }
    }

    let next = queue.songs.pop_front();
    queue.current_song = next.clone();
    next
}

pub async fn clear(manager: &QueueManager, guild_id: GuildId) {
    let mut queues = manager.write().await;
    if let Some(queue) = queues.get_mut(&guild_id) {
        queue.songs.clear();
        queue.current_song = None;
        if let Some(handle) = queue.track_handle.take() {
            let _ = handle.stop();
        }
    }
}

pub async fn upcoming(manager: &QueueManager, guild_id: GuildId) -> Vec<Track> {
    let queues = manager.read().await;
    queues
        .get(&guild_id)
        .map(|q| q.songs.iter().cloned().collect())
        .unwrap_or_default()
}

pub async fn set_loop_mode(manager: &QueueManager, guild_id: GuildId, mode: LoopMode) -> LoopMode {
    let mut queues = manager.write().await;
    let queue = queues.entry(guild_id).or_default();
    queue.loop_mode = mode;
    mode
}

pub async fn set_volume(manager: &QueueManager, guild_id: GuildId, volume: u8) {
    let mut queues = manager.write().await;
    let queue = queues.entry(guild_id).or_default();
    queue.volume = volume;
    if let Some(handle) = &queue.track_handle {
        let _ = handle.set_volume(gain(volume));
    }
}

pub async fn get_current(manager: &QueueManager, guild_id: GuildId) -> Option<Track> {
    let queues = manager.read().await;
    queues.get(&guild_id).and_then(|q| q.current_song.clone())
}

pub async fn get_volume(manager: &QueueManager, guild_id: GuildId) -> u8 {
    let queues = manager.read().await;
    queues.get(&guild_id).map_or(DEFAULT_VOLUME, |q| q.volume)
}

pub async fn is_empty(manager: &QueueManager, guild_id: GuildId) -> bool {
    let queues = manager.read().await;
    queues
        .get(&guild_id)
        .map_or(true, |q| q.current_song.is_none() && q.songs.is_empty())
}
