mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Harness, GUILD};
use discord_radio_bot::dashboard::control::ControlResponse;
use discord_radio_bot::dashboard::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn post(h: &Harness, uri: &str, body: &str) -> ControlResponse {
    let app = router(AppState::new(h.controller.clone()));
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn guild() -> String {
    GUILD.to_string()
}

#[tokio::test]
async fn test_malformed_body_is_reported_not_rejected() {
    let h = Harness::new().await;
    let res = post(&h, "/control", "{not json").await;

    assert!(!res.success);
    assert!(res.message.unwrap().starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_control_requires_guild() {
    let h = Harness::new().await;
    let res = post(&h, "/control", r#"{"action":"pause"}"#).await;
    assert_eq!(res, ControlResponse::fail("No guild ID provided"));

    let res = post(&h, "/control", r#"{"action":"pause","guildId":"0"}"#).await;
    assert_eq!(res, ControlResponse::fail("No guild ID provided"));
}

#[tokio::test]
async fn test_control_unknown_guild() {
    let h = Harness::new().await;
    let body = json!({ "action": "skip", "guildId": "999" }).to_string();

    let res = post(&h, "/control", &body).await;
    assert_eq!(res, ControlResponse::fail("No active queue found"));
}

#[tokio::test]
async fn test_control_pause_and_invalid_action() {
    let mut h = Harness::new().await;
    h.play("song").await.unwrap();

    let pause = json!({ "action": "pause", "guildId": guild() }).to_string();
    assert_eq!(post(&h, "/control", &pause).await, ControlResponse::ok());
    assert_eq!(
        post(&h, "/control", &pause).await,
        ControlResponse::fail("Already paused")
    );

    let numeric = json!({ "action": "resume", "guildId": GUILD.get() }).to_string();
    assert_eq!(post(&h, "/control", &numeric).await, ControlResponse::ok());

    let dance = json!({ "action": "dance", "guildId": guild() }).to_string();
    assert_eq!(
        post(&h, "/control", &dance).await,
        ControlResponse::fail("Invalid action")
    );
}

#[tokio::test]
async fn test_control_stop_ends_radio() {
    let h = Harness::new().await;
    h.controller
        .start_radio(GUILD, common::VOICE, "https://radio.example/live", "Test")
        .await
        .unwrap();

    let stop = json!({ "action": "stop", "guildId": guild() }).to_string();
    assert_eq!(post(&h, "/control", &stop).await, ControlResponse::ok());
    assert!(h.aggregator.read().await.radio(GUILD).is_none());
}

#[tokio::test]
async fn test_volume_validation() {
    let mut h = Harness::new().await;
    h.play("song").await.unwrap();

    for bad in [json!(150), json!(-5), json!("loud"), json!(null)] {
        let body = json!({ "volume": bad, "guildId": guild() }).to_string();
        assert_eq!(
            post(&h, "/volume", &body).await,
            ControlResponse::fail("Invalid volume level")
        );
    }
    assert_eq!(h.primary.count("volume"), 0);

    let body = json!({ "volume": 80, "guildId": guild() }).to_string();
    assert_eq!(post(&h, "/volume", &body).await, ControlResponse::ok());
    h.drain().await;
    assert_eq!(h.state().await.volume, 80);
}

#[tokio::test]
async fn test_loop_modes() {
    let mut h = Harness::new().await;
    h.play("song").await.unwrap();

    let body = json!({ "mode": "shuffle", "guildId": guild() }).to_string();
    assert_eq!(
        post(&h, "/loop", &body).await,
        ControlResponse::fail("Invalid loop mode")
    );

    let body = json!({ "mode": "song", "guildId": guild() }).to_string();
    assert_eq!(post(&h, "/loop", &body).await, ControlResponse::ok());
    h.drain().await;
    assert_eq!(
        h.state().await.loop_mode,
        discord_radio_bot::music::LoopMode::Track
    );
}

#[tokio::test]
async fn test_update_cookies() {
    let h = Harness::new().await;

    let res = post(&h, "/update-cookies", r#"{"cookies":"  "}"#).await;
    assert_eq!(res, ControlResponse::fail("No cookies provided"));

    let res = post(&h, "/update-cookies", r#"{"cookies":"garbage without pairs"}"#).await;
    assert!(!res.success);
    assert!(res.message.unwrap().starts_with("Failed to update YouTube cookies"));

    let res = post(&h, "/update-cookies", r#"{"cookies":"SID=1; HSID=2; SSID=3"}"#).await;
    assert_eq!(res, ControlResponse::ok_with("Updated 3 cookies"));

    let blob = tokio::fs::read_to_string(h.cookies.path()).await.unwrap();
    assert!(blob.starts_with("# Netscape HTTP Cookie File"));
    assert!(blob.contains(".youtube.com\tTRUE\t/\tTRUE\t1782142488\tSSID\t3"));
}

#[tokio::test]
async fn test_status_reflects_playback() {
    let mut h = Harness::new().await;
    h.play("song").await.unwrap();

    let app = router(AppState::new(h.controller.clone()));
    let request = Request::builder().uri("/status").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let status: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status["isPlaying"], true);
    assert_eq!(status["currentTrack"]["title"], "song");
    assert_eq!(status["activeGuildId"], guild());
    assert_eq!(status["guilds"][guild()]["volume"], 50);
}
