#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use discord_radio_bot::credentials::{CookieStore, Remediation};
use discord_radio_bot::music::backend::{Backend, PlayOutcome, PlayRequest, QueueSnapshot, Toggle};
use discord_radio_bot::music::error::PlaybackError;
use discord_radio_bot::music::{LoopMode, Track, DEFAULT_VOLUME};
use discord_radio_bot::playback::dispatch::{handle_event, notice_channel, Announcer, Notice, NoticeSink, NoticeStream};
use discord_radio_bot::playback::event::{emit, event_channel, EventSink, EventStream};
use discord_radio_bot::playback::{new_aggregator, BackendId, EngineEvent, Generation, PlaybackController, SharedAggregator};
use discord_radio_bot::radio::{RadioManager, RadioOutput, RadioStream};
use serenity::model::id::{ChannelId, GuildId};
use tempfile::TempDir;

pub const GUILD: GuildId = GuildId::new(111);
pub const OTHER_GUILD: GuildId = GuildId::new(222);
pub const VOICE: ChannelId = ChannelId::new(333);

pub fn track(title: &str) -> Track {
    Track {
        title: title.to_string(),
        source_url: format!("https://youtube.com/watch?v={}", title.replace(' ', "_")),
        thumbnail_url: None,
        duration_display: Some("3:00".to_string()),
        author: "artist".to_string(),
        requester: "tester".to_string(),
    }
}

#[derive(Default)]
struct FakeGuild {
    generation: Generation,
    current: Option<Track>,
    upcoming: VecDeque<Track>,
    paused: bool,
    loop_mode: LoopMode,
    volume: Option<u8>,
}

/// Scripted engine: plays whatever it is asked to and reports through events.
pub struct FakeBackend {
    id: BackendId,
    events: EventSink,
    guilds: Mutex<HashMap<GuildId, FakeGuild>>,
    failures: Mutex<VecDeque<PlaybackError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(id: BackendId, events: EventSink) -> Self {
        Self {
            id,
            events,
            guilds: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The next `play` calls fail with these errors, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = PlaybackError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(op)).count()
    }

    /// Emits an event as if the engine produced it under `generation`.
    pub fn emit_raw(&self, guild_id: GuildId, generation: Generation, kind: EngineEvent) {
        emit(&self.events, guild_id, self.id, generation, kind);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn emit(&self, guild_id: GuildId, guild: &FakeGuild, kind: EngineEvent) {
        emit(&self.events, guild_id, self.id, guild.generation, kind);
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    /// `playlist:<name>:<a>,<b>,...` resolves to a playlist, anything else to
    /// one track titled after the query.
    async fn play(&self, request: PlayRequest) -> Result<PlayOutcome, PlaybackError> {
        tokio::task::yield_now().await;
        self.record(format!("play {}", request.query));
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let (titles, playlist) = match request
            .query
            .strip_prefix("playlist:")
            .and_then(|rest| rest.split_once(':'))
        {
            Some((name, titles)) => (titles.split(',').collect::<Vec<_>>(), Some(name.to_string())),
            None => (vec![request.query.as_str()], None),
        };
        let mut songs: VecDeque<Track> = titles
            .into_iter()
            .map(|title| {
                let mut song = track(title);
                song.requester = request.requester.clone();
                song
            })
            .collect();
        let count = songs.len();

        let mut guilds = self.guilds.lock().unwrap();
        let guild = guilds.entry(request.guild_id).or_default();
        if guild.generation != request.generation {
            guild.generation = request.generation;
            guild.current = None;
            guild.upcoming.clear();
            guild.paused = false;
        }

        if guild.current.is_none() {
            let song = songs.pop_front().ok_or(PlaybackError::NotFound(request.query.clone()))?;
            guild.current = Some(song.clone());
            guild.upcoming.extend(songs);
            let kind = EngineEvent::TrackStarted {
                track: song.clone(),
                upcoming: guild.upcoming.iter().cloned().collect(),
            };
            self.emit(request.guild_id, guild, kind);
            Ok(match playlist {
                Some(name) => PlayOutcome::Playlist {
                    name,
                    count,
                    started: Some(song),
                },
                None => PlayOutcome::Started(song),
            })
        } else {
            let first = songs.front().cloned();
            guild.upcoming.extend(songs);
            let kind = EngineEvent::TrackAdded {
                upcoming: guild.upcoming.iter().cloned().collect(),
            };
            self.emit(request.guild_id, guild, kind);
            Ok(match (playlist, first) {
                (Some(name), _) => PlayOutcome::Playlist {
                    name,
                    count,
                    started: None,
                },
                (None, Some(track)) => PlayOutcome::Queued {
                    track,
                    position: guild.upcoming.len(),
                },
                (None, None) => return Err(PlaybackError::NotFound(request.query.clone())),
            })
        }
    }

    async fn pause(&self, guild_id: GuildId) -> Result<Toggle, PlaybackError> {
        self.record("pause".to_string());
        let mut guilds = self.guilds.lock().unwrap();
        let guild = guilds.get_mut(&guild_id).filter(|g| g.current.is_some()).ok_or(PlaybackError::NoSession)?;
        if guild.paused {
            return Ok(Toggle::AlreadyInState);
        }
        guild.paused = true;
        self.emit(guild_id, guild, EngineEvent::Paused);
        Ok(Toggle::Changed)
    }

    async fn resume(&self, guild_id: GuildId) -> Result<Toggle, PlaybackError> {
        self.record("resume".to_string());
        let mut guilds = self.guilds.lock().unwrap();
        let guild = guilds.get_mut(&guild_id).filter(|g| g.current.is_some()).ok_or(PlaybackError::NoSession)?;
        if !guild.paused {
            return Ok(Toggle::AlreadyInState);
        }
        guild.paused = false;
        self.emit(guild_id, guild, EngineEvent::Resumed);
        Ok(Toggle::Changed)
    }

    async fn skip(&self, guild_id: GuildId) -> Result<Option<Track>, PlaybackError> {
        self.record("skip".to_string());
        let mut guilds = self.guilds.lock().unwrap();
        let guild = guilds.get_mut(&guild_id).filter(|g| g.current.is_some()).ok_or(PlaybackError::NoSession)?;
        guild.paused = false;
        guild.current = guild.upcoming.pop_front();
        match guild.current.clone() {
            Some(next) => {
                let kind = EngineEvent::TrackStarted {
                    track: next.clone(),
                    upcoming: guild.upcoming.iter().cloned().collect(),
                };
                self.emit(guild_id, guild, kind);
                Ok(Some(next))
            }
            None => {
                self.emit(guild_id, guild, EngineEvent::QueueFinished);
                Ok(None)
            }
        }
    }

    async fn stop(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        self.record("stop".to_string());
        if let Some(guild) = self.guilds.lock().unwrap().get_mut(&guild_id) {
            guild.current = None;
            guild.upcoming.clear();
            guild.paused = false;
        }
        Ok(())
    }

    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> Result<(), PlaybackError> {
        self.record(format!("volume {volume}"));
        let mut guilds = self.guilds.lock().unwrap();
        let guild = guilds.entry(guild_id).or_default();
        guild.volume = Some(volume);
        self.emit(guild_id, guild, EngineEvent::VolumeChanged(volume));
        Ok(())
    }

    async fn set_loop_mode(&self, guild_id: GuildId, mode: LoopMode) -> Result<(), PlaybackError> {
        self.record(format!("loop {}", mode.as_str()));
        let mut guilds = self.guilds.lock().unwrap();
        let guild = guilds.entry(guild_id).or_default();
        guild.loop_mode = mode;
        self.emit(guild_id, guild, EngineEvent::LoopModeChanged(mode));
        Ok(())
    }

    async fn queue_snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        let guilds = self.guilds.lock().unwrap();
        match guilds.get(&guild_id) {
            Some(g) => QueueSnapshot {
                current: g.current.clone(),
                upcoming: g.upcoming.iter().cloned().collect(),
                loop_mode: g.loop_mode,
                volume: g.volume.unwrap_or(DEFAULT_VOLUME),
            },
            None => QueueSnapshot::default(),
        }
    }
}

#[derive(Default)]
pub struct FakeRadioOutput {
    calls: Mutex<Vec<String>>,
}

impl FakeRadioOutput {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RadioOutput for FakeRadioOutput {
    async fn connect(
        &self,
        guild_id: GuildId,
        _channel_id: ChannelId,
        stream: &RadioStream,
    ) -> Result<(), PlaybackError> {
        self.calls.lock().unwrap().push(format!("connect {guild_id} {}", stream.url));
        Ok(())
    }

    async fn replace(&self, guild_id: GuildId, stream: &RadioStream) -> Result<(), PlaybackError> {
        self.calls.lock().unwrap().push(format!("replace {guild_id} {}", stream.url));
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) {
        self.calls.lock().unwrap().push(format!("disconnect {guild_id}"));
    }
}

#[derive(Default)]
pub struct RecordingAnnouncer {
    notices: Mutex<Vec<(GuildId, Notice)>>,
}

impl RecordingAnnouncer {
    pub fn notices(&self) -> Vec<(GuildId, Notice)> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, guild_id: GuildId, notice: Notice) {
        self.notices.lock().unwrap().push((guild_id, notice));
    }
}

/// Controller wired to fake engines, with the event channel under test control.
pub struct Harness {
    pub controller: Arc<PlaybackController>,
    pub aggregator: SharedAggregator,
    pub primary: Arc<FakeBackend>,
    pub fallback: Arc<FakeBackend>,
    pub radio_output: Arc<FakeRadioOutput>,
    pub remediation: Arc<Remediation>,
    pub announcer: Arc<RecordingAnnouncer>,
    pub cookies: Arc<CookieStore>,
    events: EventStream,
    notice_sink: NoticeSink,
    notices: NoticeStream,
    _dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cookies = Arc::new(CookieStore::new(dir.path().join("cookies.txt")));
        cookies.ensure_default().await.unwrap();
        let remediation = Arc::new(Remediation::new(cookies.clone(), Duration::from_secs(60)));

        let aggregator = new_aggregator();
        let (sink, events) = event_channel();
        let (notice_sink, notices) = notice_channel();
        let primary = Arc::new(FakeBackend::new(BackendId::Primary, sink.clone()));
        let fallback = Arc::new(FakeBackend::new(BackendId::Fallback, sink));
        let radio_output = Arc::new(FakeRadioOutput::default());
        let radio = Arc::new(RadioManager::with_recovery_delay(
            aggregator.clone(),
            radio_output.clone(),
            Duration::ZERO,
        ));

        let controller = Arc::new(PlaybackController::new(
            aggregator.clone(),
            primary.clone(),
            Some(fallback.clone() as Arc<dyn Backend>),
            radio,
            cookies.clone(),
            remediation.clone(),
        ));

        Self {
            controller,
            aggregator,
            primary,
            fallback,
            radio_output,
            remediation,
            announcer: Arc::new(RecordingAnnouncer::default()),
            cookies,
            events,
            notice_sink,
            notices,
            _dir: dir,
        }
    }

    /// Applies every pending engine event, as the dispatcher task would,
    /// then hands the resulting notices to the recording announcer.
    pub async fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            handle_event(&event, &self.aggregator, &self.remediation, &self.notice_sink).await;
        }
        while let Ok((guild_id, notice)) = self.notices.try_recv() {
            self.announcer.announce(guild_id, notice).await;
        }
    }

    /// Leaves a cookie file with no entries, which a refresh can repair.
    pub async fn blank_cookies(&self) {
        tokio::fs::write(self.cookies.path(), "# Netscape HTTP Cookie File\n").await.unwrap();
    }

    pub async fn state(&self) -> discord_radio_bot::playback::PlaybackState {
        self.aggregator.read().await.state(GUILD)
    }

    pub async fn play(&mut self, query: &str) -> Result<PlayOutcome, PlaybackError> {
        let outcome = self.controller.play(GUILD, VOICE, query, "tester").await;
        self.drain().await;
        outcome
    }
}
