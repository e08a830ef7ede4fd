//! Web dashboard: status page, WebSocket push and the HTTP control surface.

pub mod broadcast;
pub mod control;
pub mod page;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::playback::{PlaybackController, StatusSnapshot};

/// Capacity of the viewer channel; slow viewers skip older pushes.
const UPDATE_BUFFER: usize = 16;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("dashboard server stopped: {0}")]
    Serve(std::io::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<PlaybackController>,
    /// Serialized status pushes, fanned out to every viewer.
    pub updates: tokio::sync::broadcast::Sender<String>,
}

impl AppState {
    pub fn new(controller: Arc<PlaybackController>) -> Self {
        let (updates, _) = tokio::sync::broadcast::channel(UPDATE_BUFFER);
        Self { controller, updates }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page::index))
        .route("/status", get(status))
        .route("/ws", get(ws::upgrade))
        .route("/control", post(control::control))
        .route("/volume", post(control::volume))
        .route("/loop", post(control::loop_mode))
        .route("/update-cookies", post(control::update_cookies))
        .with_state(state)
}

async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.controller.aggregator().read().await.snapshot())
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!("dashboard listening on http://{addr}");

    axum::serve(listener, router(state))
        .await
        .map_err(ServerError::Serve)
}
