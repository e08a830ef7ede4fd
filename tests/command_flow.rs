mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{track, Harness, GUILD, OTHER_GUILD, VOICE};
use discord_radio_bot::credentials::{CookieStore, Remediation};
use discord_radio_bot::music::backend::{PlayOutcome, Toggle};
use discord_radio_bot::music::error::PlaybackError;
use discord_radio_bot::music::LoopMode;
use discord_radio_bot::playback::dispatch::{self, Announcer, Notice};
use discord_radio_bot::playback::event::{emit, event_channel};
use discord_radio_bot::playback::{
    new_aggregator, ApplyOutcome, BackendId, BackendStatus, EngineEvent, Stopped,
};
use discord_radio_bot::radio::{RadioStart, LOFI};
use serenity::model::id::GuildId;
use tokio::sync::Semaphore;

#[tokio::test]
async fn test_play_queue_skip_flow() {
    let mut h = Harness::new().await;

    let first = h.play("song one").await.unwrap();
    assert!(matches!(first, PlayOutcome::Started(_)));
    let second = h.play("song two").await.unwrap();
    assert!(matches!(second, PlayOutcome::Queued { position: 1, .. }));
    h.play("song three").await.unwrap();

    let state = h.state().await;
    assert!(state.is_playing);
    assert_eq!(state.current_track.unwrap().title, "song one");
    assert_eq!(state.upcoming.len(), 2);

    let next = h.controller.skip(GUILD).await.unwrap();
    h.drain().await;
    assert_eq!(next.unwrap().title, "song two");
    assert_eq!(h.state().await.upcoming, vec![track("song three")]);

    h.controller.skip(GUILD).await.unwrap();
    let last = h.controller.skip(GUILD).await.unwrap();
    h.drain().await;
    assert!(last.is_none());

    let state = h.state().await;
    assert!(state.current_track.is_none());
    assert!(!state.is_playing);
}

#[tokio::test]
async fn test_auto_advance_is_announced_but_first_track_is_not() {
    let mut h = Harness::new().await;

    h.play("a").await.unwrap();
    h.play("b").await.unwrap();
    assert!(h.announcer.notices().is_empty());

    h.controller.skip(GUILD).await.unwrap();
    h.controller.skip(GUILD).await.unwrap();
    h.drain().await;

    assert_eq!(
        h.announcer.notices(),
        vec![
            (GUILD, Notice::NowPlaying(track("b"))),
            (GUILD, Notice::QueueFinished),
        ]
    );
}

#[tokio::test]
async fn test_pause_twice_reports_already_paused() {
    let mut h = Harness::new().await;
    h.play("lofi beats").await.unwrap();

    assert_eq!(h.controller.pause(GUILD).await.unwrap(), Toggle::Changed);
    assert_eq!(h.controller.pause(GUILD).await.unwrap(), Toggle::AlreadyInState);
    h.drain().await;

    let state = h.state().await;
    assert!(state.is_paused);
    assert!(!state.is_playing);

    assert_eq!(h.controller.resume(GUILD).await.unwrap(), Toggle::Changed);
    assert_eq!(h.controller.resume(GUILD).await.unwrap(), Toggle::AlreadyInState);
    h.drain().await;
    assert!(h.state().await.is_playing);
}

#[tokio::test]
async fn test_commands_without_session_fail() {
    let h = Harness::new().await;

    assert_eq!(h.controller.pause(GUILD).await, Err(PlaybackError::NoSession));
    assert_eq!(h.controller.skip(GUILD).await, Err(PlaybackError::NoSession));
    assert_eq!(h.controller.stop(GUILD).await, Err(PlaybackError::NoSession));
    assert_eq!(h.controller.set_volume(GUILD, 30).await, Err(PlaybackError::NoSession));
    assert_eq!(h.controller.stop_any(GUILD).await, Err(PlaybackError::NoRadio));
}

#[tokio::test]
async fn test_volume_out_of_range_leaves_state_untouched() {
    let mut h = Harness::new().await;
    h.play("song").await.unwrap();

    let err = h.controller.set_volume(GUILD, 150).await.unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidInput(_)));
    assert!(h.controller.set_volume(GUILD, -1).await.is_err());
    h.drain().await;
    assert_eq!(h.state().await.volume, 50);
    assert_eq!(h.primary.count("volume"), 0);

    assert_eq!(h.controller.set_volume(GUILD, 75).await.unwrap(), 75);
    h.drain().await;
    assert_eq!(h.state().await.volume, 75);
}

#[tokio::test]
async fn test_loop_cycles_off_track_queue() {
    let mut h = Harness::new().await;
    h.play("song").await.unwrap();

    assert_eq!(h.controller.set_loop_mode(GUILD, None).await.unwrap(), LoopMode::Track);
    assert_eq!(h.controller.set_loop_mode(GUILD, None).await.unwrap(), LoopMode::Queue);
    assert_eq!(h.controller.set_loop_mode(GUILD, None).await.unwrap(), LoopMode::Off);

    h.controller.set_loop_mode(GUILD, Some(LoopMode::Queue)).await.unwrap();
    h.drain().await;
    assert_eq!(h.state().await.loop_mode, LoopMode::Queue);
}

#[tokio::test]
async fn test_empty_query_is_rejected_before_any_engine() {
    let mut h = Harness::new().await;

    let err = h.play("   ").await.unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidInput(_)));
    assert!(h.primary.calls().is_empty());
    assert!(h.controller.owner(GUILD).await.is_none());
}

#[tokio::test]
async fn test_missing_backend_refuses_play() {
    let mut h = Harness::new().await;
    h.aggregator.write().await.set_backend_status(BackendStatus::Missing);

    assert_eq!(h.play("song").await, Err(PlaybackError::BackendMissing));
    assert!(h.primary.calls().is_empty());
}

#[tokio::test]
async fn test_network_failure_falls_back() {
    let mut h = Harness::new().await;
    h.primary.fail_next([PlaybackError::Network("timed out".into())]);

    h.play("song").await.unwrap();

    assert_eq!(h.controller.owner(GUILD).await, Some(BackendId::Fallback));
    assert_eq!(h.fallback.count("play"), 1);
    assert_eq!(h.state().await.current_track.unwrap().title, "song");

    // Later commands go to the owner only.
    h.controller.pause(GUILD).await.unwrap();
    assert_eq!(h.fallback.count("pause"), 1);
    assert_eq!(h.primary.count("pause"), 0);
}

#[tokio::test]
async fn test_not_found_does_not_fall_back() {
    let mut h = Harness::new().await;
    h.primary.fail_next([PlaybackError::NotFound("zzz".into())]);

    assert_eq!(h.play("zzz").await, Err(PlaybackError::NotFound("zzz".into())));
    assert_eq!(h.fallback.count("play"), 0);
    assert!(h.controller.owner(GUILD).await.is_none());
}

#[tokio::test]
async fn test_both_engines_failing_releases_the_guild() {
    let mut h = Harness::new().await;
    h.primary.fail_next([PlaybackError::Unknown("boom".into())]);
    h.fallback.fail_next([PlaybackError::Network("down".into())]);

    assert_eq!(h.play("song").await, Err(PlaybackError::Network("down".into())));
    assert!(h.controller.owner(GUILD).await.is_none());
    let state = h.state().await;
    assert!(!state.is_playing && !state.is_paused);
}

#[tokio::test]
async fn test_auth_failure_refreshes_once_then_falls_back() {
    let mut h = Harness::new().await;
    h.blank_cookies().await;
    h.primary.fail_next([PlaybackError::AuthRequired]);

    h.play("first").await.unwrap();
    assert_eq!(h.primary.count("play"), 2);
    assert_eq!(h.fallback.count("play"), 0);
    assert_eq!(h.controller.owner(GUILD).await, Some(BackendId::Primary));

    h.controller.stop(GUILD).await.unwrap();

    // Inside the cooldown no second refresh happens; the fallback takes over.
    h.primary.fail_next([PlaybackError::AuthRequired]);
    h.play("second").await.unwrap();
    assert_eq!(h.primary.count("play"), 3);
    assert_eq!(h.controller.owner(GUILD).await, Some(BackendId::Fallback));
}

#[tokio::test]
async fn test_auth_failure_with_intact_cookies_skips_retry() {
    let mut h = Harness::new().await;
    h.primary.fail_next([PlaybackError::AuthRequired]);

    h.play("song").await.unwrap();

    // Nothing to repair, so the same engine is not asked twice.
    assert_eq!(h.primary.count("play"), 1);
    assert_eq!(h.fallback.count("play"), 1);
    assert_eq!(h.controller.owner(GUILD).await, Some(BackendId::Fallback));
}

#[tokio::test]
async fn test_new_cookies_reopen_the_refresh_window() {
    let mut h = Harness::new().await;
    h.blank_cookies().await;
    h.primary.fail_next([PlaybackError::AuthRequired]);
    h.play("first").await.unwrap();
    h.controller.stop(GUILD).await.unwrap();

    assert_eq!(h.controller.update_credentials("SID=abc; HSID=def").await.unwrap(), 2);
    assert!(h.cookies.load().await.unwrap().contains("\tSID\tabc"));

    h.blank_cookies().await;
    h.primary.fail_next([PlaybackError::AuthRequired]);
    h.play("second").await.unwrap();
    assert_eq!(h.primary.count("play"), 4);
    assert_eq!(h.controller.owner(GUILD).await, Some(BackendId::Primary));
}

#[tokio::test]
async fn test_stale_event_after_restart_is_ignored() {
    let mut h = Harness::new().await;
    h.play("old").await.unwrap();
    let (_, old_generation) = h.aggregator.read().await.owner(GUILD).unwrap();

    h.controller.stop(GUILD).await.unwrap();
    h.play("new").await.unwrap();

    h.primary.emit_raw(
        GUILD,
        old_generation,
        EngineEvent::TrackStarted {
            track: track("old"),
            upcoming: Vec::new(),
        },
    );
    h.drain().await;

    assert_eq!(h.state().await.current_track.unwrap().title, "new");
}

#[tokio::test]
async fn test_events_from_non_owner_are_dropped() {
    let h = Harness::new().await;
    let generation = h.aggregator.write().await.claim(GUILD, BackendId::Primary);

    let event = discord_radio_bot::playback::BackendEvent {
        guild_id: GUILD,
        backend: BackendId::Fallback,
        generation,
        kind: EngineEvent::Paused,
    };
    assert_eq!(h.aggregator.write().await.apply(&event), ApplyOutcome::NotOwner);
}

#[tokio::test]
async fn test_playback_auth_error_triggers_one_refresh() {
    let mut h = Harness::new().await;
    h.blank_cookies().await;
    h.play("song").await.unwrap();
    let (_, generation) = h.aggregator.read().await.owner(GUILD).unwrap();

    h.primary.emit_raw(GUILD, generation, EngineEvent::Error(PlaybackError::AuthRequired));
    h.primary.emit_raw(GUILD, generation, EngineEvent::Error(PlaybackError::AuthRequired));
    h.drain().await;

    assert_eq!(
        h.announcer.notices(),
        vec![
            (GUILD, Notice::Failed(PlaybackError::AuthRequired)),
            (GUILD, Notice::CredentialsReloaded),
            (GUILD, Notice::Failed(PlaybackError::AuthRequired)),
        ]
    );
}

#[tokio::test]
async fn test_radio_replaces_queue_playback() {
    let mut h = Harness::new().await;
    h.play("song").await.unwrap();

    let started = h
        .controller
        .start_radio(GUILD, VOICE, LOFI.url, LOFI.label)
        .await
        .unwrap();
    h.drain().await;

    assert_eq!(started, RadioStart::Started);
    assert_eq!(h.primary.count("stop"), 1);
    assert!(h.controller.owner(GUILD).await.is_none());

    let snapshot = h.aggregator.read().await.snapshot();
    let guild_state = &snapshot.guilds[&GUILD.to_string()];
    assert!(guild_state.current_track.is_none());
    assert_eq!(snapshot.radio_sessions[&GUILD.to_string()].stream_url, LOFI.url);
}

#[tokio::test]
async fn test_play_ends_radio_session() {
    let mut h = Harness::new().await;
    h.controller
        .start_radio(GUILD, VOICE, LOFI.url, LOFI.label)
        .await
        .unwrap();

    h.play("song").await.unwrap();

    assert!(h.aggregator.read().await.radio(GUILD).is_none());
    assert!(h.radio_output.calls().contains(&format!("disconnect {GUILD}")));
    assert_eq!(h.state().await.current_track.unwrap().title, "song");
}

#[tokio::test]
async fn test_radio_switch_and_double_stop() {
    let h = Harness::new().await;

    let first = h
        .controller
        .start_radio(GUILD, VOICE, LOFI.url, LOFI.label)
        .await
        .unwrap();
    let second = h
        .controller
        .start_radio(GUILD, VOICE, "https://radio.example/live", "Other")
        .await
        .unwrap();
    assert_eq!((first, second), (RadioStart::Started, RadioStart::Changed));

    assert_eq!(h.controller.stop_any(GUILD).await, Ok(Stopped::Radio));
    assert_eq!(h.controller.stop_radio(GUILD).await, Err(PlaybackError::NoRadio));

    assert_eq!(
        h.radio_output.calls(),
        vec![
            format!("connect {GUILD} {}", LOFI.url),
            format!("replace {GUILD} https://radio.example/live"),
            format!("disconnect {GUILD}"),
        ]
    );
}

#[tokio::test]
async fn test_guilds_are_independent() {
    let mut h = Harness::new().await;
    h.play("here").await.unwrap();
    h.controller
        .start_radio(OTHER_GUILD, VOICE, LOFI.url, LOFI.label)
        .await
        .unwrap();

    h.controller.forget_guild(OTHER_GUILD).await;

    assert!(h.state().await.is_playing);
    let snapshot = h.aggregator.read().await.snapshot();
    assert!(snapshot.radio_sessions.is_empty());
    assert!(!snapshot.guilds.contains_key(&OTHER_GUILD.to_string()));
}

#[tokio::test]
async fn test_voice_teardown_clears_queue_and_radio() {
    let mut h = Harness::new().await;
    h.play("song").await.unwrap();

    h.controller.teardown_voice(GUILD).await;
    h.drain().await;

    assert!(h.controller.owner(GUILD).await.is_none());
    let state = h.state().await;
    assert!(!state.is_playing && !state.is_paused);
}

#[tokio::test]
async fn test_playlist_is_queued_as_one_batch() {
    let mut h = Harness::new().await;

    let outcome = h.play("playlist:Mix:a,b,c").await.unwrap();
    assert_eq!(
        outcome,
        PlayOutcome::Playlist {
            name: "Mix".to_string(),
            count: 3,
            started: Some(track("a")),
        }
    );
    assert_eq!(h.state().await.upcoming, vec![track("b"), track("c")]);

    let outcome = h.play("playlist:More:d,e").await.unwrap();
    assert_eq!(
        outcome,
        PlayOutcome::Playlist {
            name: "More".to_string(),
            count: 2,
            started: None,
        }
    );
    let state = h.state().await;
    assert_eq!(state.current_track, Some(track("a")));
    assert_eq!(
        state.upcoming,
        vec![track("b"), track("c"), track("d"), track("e")]
    );
    assert!(h.announcer.notices().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_plays_share_one_session() {
    let mut h = Harness::new().await;

    let plays: Vec<_> = (0..8)
        .map(|n| {
            let controller = h.controller.clone();
            tokio::spawn(async move {
                controller
                    .play(GUILD, VOICE, &format!("song {n}"), "tester")
                    .await
            })
        })
        .collect();

    let mut started = 0;
    for play in plays {
        match play.await.unwrap().unwrap() {
            PlayOutcome::Started(_) => started += 1,
            PlayOutcome::Queued { .. } => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(started, 1);
    assert_eq!(h.primary.count("play"), 8);

    h.drain().await;
    let state = h.state().await;
    assert!(state.current_track.is_some());
    assert_eq!(state.upcoming.len(), 7);
}

/// Holds every notice until the test hands out permits.
struct GatedAnnouncer {
    gate: Semaphore,
    seen: Mutex<Vec<(GuildId, Notice)>>,
}

#[async_trait]
impl Announcer for GatedAnnouncer {
    async fn announce(&self, guild_id: GuildId, notice: Notice) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.seen.lock().unwrap().push((guild_id, notice));
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_slow_announcer_does_not_delay_state_updates() {
    let dir = tempfile::tempdir().unwrap();
    let cookies = Arc::new(CookieStore::new(dir.path().join("cookies.txt")));
    let remediation = Arc::new(Remediation::new(cookies, Duration::from_secs(60)));

    let aggregator = new_aggregator();
    let generation = aggregator.write().await.claim(GUILD, BackendId::Primary);
    let (sink, events) = event_channel();
    let (notice_sink, notices) = dispatch::notice_channel();
    let announcer = Arc::new(GatedAnnouncer {
        gate: Semaphore::new(0),
        seen: Mutex::new(Vec::new()),
    });

    tokio::spawn(dispatch::announce_all(notices, announcer.clone()));
    tokio::spawn(dispatch::run(events, aggregator.clone(), remediation, notice_sink));

    for kind in [
        EngineEvent::TrackStarted {
            track: track("a"),
            upcoming: vec![track("b")],
        },
        EngineEvent::TrackStarted {
            track: track("b"),
            upcoming: Vec::new(),
        },
        EngineEvent::QueueFinished,
        EngineEvent::VolumeChanged(70),
    ] {
        emit(&sink, GUILD, BackendId::Primary, generation, kind);
    }

    for _ in 0..200 {
        if aggregator.read().await.state(GUILD).volume == 70 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(aggregator.read().await.state(GUILD).volume, 70);
    assert!(announcer.seen.lock().unwrap().is_empty());

    announcer.gate.add_permits(2);
    let seen = announcer.clone();
    wait_until(move || seen.seen.lock().unwrap().len() == 2).await;
    assert_eq!(
        *announcer.seen.lock().unwrap(),
        vec![
            (GUILD, Notice::NowPlaying(track("b"))),
            (GUILD, Notice::QueueFinished),
        ]
    );
}
