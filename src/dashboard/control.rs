use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serenity::model::id::GuildId;
use tracing::{info, warn};

use super::AppState;
use crate::credentials::CredentialError;
use crate::music::backend::Toggle;
use crate::music::error::PlaybackError;
use crate::music::LoopMode;

/// Body of every control endpoint. Failures are reported here, never through
/// the HTTP status.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ControlResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl ControlResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Discord ids arrive as strings from browsers, numbers from scripts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Snowflake {
    Text(String),
    Number(u64),
}

impl Snowflake {
    fn guild_id(&self) -> Option<GuildId> {
        let raw = match self {
            Self::Text(text) => text.trim().parse().ok()?,
            Self::Number(n) => *n,
        };
        (raw != 0).then(|| GuildId::new(raw))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    #[serde(default)]
    action: String,
    guild_id: Option<Snowflake>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRequest {
    #[serde(default)]
    volume: Value,
    guild_id: Option<Snowflake>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopRequest {
    #[serde(default)]
    mode: String,
    guild_id: Option<Snowflake>,
}

#[derive(Debug, Deserialize)]
pub struct CookiesRequest {
    #[serde(default)]
    cookies: String,
}

type Body<T> = Result<Json<T>, JsonRejection>;

fn parse_body<T>(body: Body<T>) -> Result<T, ControlResponse> {
    body.map(|Json(inner)| inner).map_err(|rejection| {
        warn!("rejected dashboard request: {rejection}");
        ControlResponse::fail(format!("Invalid request body: {}", rejection.body_text()))
    })
}

fn require_guild(guild_id: Option<&Snowflake>) -> Result<GuildId, ControlResponse> {
    guild_id
        .and_then(Snowflake::guild_id)
        .ok_or_else(|| ControlResponse::fail("No guild ID provided"))
}

fn failure(err: PlaybackError) -> ControlResponse {
    match err {
        PlaybackError::NoSession => ControlResponse::fail("No active queue found"),
        other => ControlResponse::fail(other.to_string()),
    }
}

fn respond(result: Result<ControlResponse, ControlResponse>) -> Json<ControlResponse> {
    Json(result.unwrap_or_else(|failure| failure))
}

pub async fn control(State(state): State<AppState>, body: Body<ControlRequest>) -> Json<ControlResponse> {
    respond(handle_control(&state, body).await)
}

async fn handle_control(
    state: &AppState,
    body: Body<ControlRequest>,
) -> Result<ControlResponse, ControlResponse> {
    let request = parse_body(body)?;
    let guild_id = require_guild(request.guild_id.as_ref())?;
    let controller = &state.controller;

    match request.action.as_str() {
        "pause" => match controller.pause(guild_id).await.map_err(failure)? {
            Toggle::Changed => Ok(ControlResponse::ok()),
            Toggle::AlreadyInState => Err(ControlResponse::fail("Already paused")),
        },
        "resume" => match controller.resume(guild_id).await.map_err(failure)? {
            Toggle::Changed => Ok(ControlResponse::ok()),
            Toggle::AlreadyInState => Err(ControlResponse::fail("Already playing")),
        },
        "skip" => {
            controller.skip(guild_id).await.map_err(failure)?;
            Ok(ControlResponse::ok())
        }
        "stop" => {
            controller.stop_any(guild_id).await.map_err(failure)?;
            Ok(ControlResponse::ok())
        }
        _ => Err(ControlResponse::fail("Invalid action")),
    }
}

pub async fn volume(State(state): State<AppState>, body: Body<VolumeRequest>) -> Json<ControlResponse> {
    respond(handle_volume(&state, body).await)
}

async fn handle_volume(
    state: &AppState,
    body: Body<VolumeRequest>,
) -> Result<ControlResponse, ControlResponse> {
    let request = parse_body(body)?;
    let guild_id = require_guild(request.guild_id.as_ref())?;

    let volume = request
        .volume
        .as_i64()
        .filter(|v| (0..=100).contains(v))
        .ok_or_else(|| ControlResponse::fail("Invalid volume level"))?;

    state
        .controller
        .set_volume(guild_id, volume)
        .await
        .map_err(failure)?;
    Ok(ControlResponse::ok())
}

pub async fn loop_mode(State(state): State<AppState>, body: Body<LoopRequest>) -> Json<ControlResponse> {
    respond(handle_loop(&state, body).await)
}

async fn handle_loop(state: &AppState, body: Body<LoopRequest>) -> Result<ControlResponse, ControlResponse> {
    let request = parse_body(body)?;
    let guild_id = require_guild(request.guild_id.as_ref())?;

    let mode = match request.mode.as_str() {
        "off" => LoopMode::Off,
        "track" | "song" => LoopMode::Track,
        "queue" => LoopMode::Queue,
        _ => return Err(ControlResponse::fail("Invalid loop mode")),
    };

    state
        .controller
        .set_loop_mode(guild_id, Some(mode))
        .await
        .map_err(failure)?;
    Ok(ControlResponse::ok())
}

pub async fn update_cookies(
    State(state): State<AppState>,
    body: Body<CookiesRequest>,
) -> Json<ControlResponse> {
    respond(handle_cookies(&state, body).await)
}

async fn handle_cookies(
    state: &AppState,
    body: Body<CookiesRequest>,
) -> Result<ControlResponse, ControlResponse> {
    let request = parse_body(body)?;
    if request.cookies.trim().is_empty() {
        return Err(ControlResponse::fail("No cookies provided"));
    }

    match state.controller.update_credentials(&request.cookies).await {
        Ok(count) => {
            info!("cookies updated from the dashboard ({count} entries)");
            Ok(ControlResponse::ok_with(format!("Updated {count} cookies")))
        }
        Err(CredentialError::Empty) => Err(ControlResponse::fail(
            "Failed to update YouTube cookies: no name=value pairs found",
        )),
        Err(e) => {
            warn!("cookie update failed: {e}");
            Err(ControlResponse::fail("Failed to update YouTube cookies"))
        }
    }
}
