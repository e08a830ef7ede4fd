use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::broadcast::status_json;
use super::AppState;

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ViewerMessage {
    GetStatus,
}

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| viewer(socket, state))
}

async fn viewer(mut socket: WebSocket, state: AppState) {
    info!("dashboard viewer connected");
    let mut updates = state.updates.subscribe();
    let aggregator = state.controller.aggregator().clone();

    if !send_status(&mut socket, &state).await {
        return;
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(json) => {
                    if socket.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("viewer lagged by {skipped} updates");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ViewerMessage>(&text) {
                        Ok(ViewerMessage::GetStatus) => {
                            if let Some(json) = status_json(&aggregator).await {
                                if socket.send(Message::Text(json)).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(e) => debug!("ignoring viewer message: {e}"),
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    info!("dashboard viewer disconnected");
}

async fn send_status(socket: &mut WebSocket, state: &AppState) -> bool {
    match status_json(state.controller.aggregator()).await {
        Some(json) => socket.send(Message::Text(json)).await.is_ok(),
        None => true,
    }
}
