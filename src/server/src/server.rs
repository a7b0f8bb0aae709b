// Copyright © Roundtable 2026-present

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//    https://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Axum router bridging duplex websocket connections to the coordinator.
//! One upgrade handler per connection; once upgraded, the connection is
//! split into an independent reader task and writer task.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coordinator::{Coordinator, CoordinatorDeadlineHandler};
use futures_util::{SinkExt, StreamExt};
use hub::ConnectionId;
use model::{GameId, UserId};
use protocol::{InboundFrame, OutboundFrame};
use serde::Deserialize;
use tracing::{debug, warn};
use with_error::CoordinatorError;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({ "ok": true })) }))
        .route("/games", post(create_game))
        .route("/ws/:game_id", get(ws_handler))
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Deserialize)]
struct CreateGameRequest {
    name: String,
    subject: String,
    winner_score: u32,
    max_players: usize,
    owner_user_id: String,
    owner_name: String,
    owner_image: String,
}

async fn create_game(State(state): State<AppState>, Json(request): Json<CreateGameRequest>) -> Response {
    let result = state
        .coordinator
        .create_game(
            request.name,
            request.subject,
            request.winner_score,
            request.max_players,
            UserId::new(request.owner_user_id),
            request.owner_name,
            request.owner_image,
        )
        .await;
    match result {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(error) => api_error(error),
    }
}

fn api_error(error: CoordinatorError) -> Response {
    let status = match error {
        CoordinatorError::Validation(_) => StatusCode::BAD_REQUEST,
        CoordinatorError::NotFound(_) => StatusCode::NOT_FOUND,
        CoordinatorError::Conflict => StatusCode::OK,
        CoordinatorError::Io(_) | CoordinatorError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error.to_string()).into_response()
}

/// The `IdentityResolver` claim, taken from the connection's query string
/// and never validated by the core.
#[derive(Deserialize)]
struct IdentityQuery {
    user_id: String,
    name: String,
    image: String,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(game_id): Path<String>,
    Query(identity): Query<IdentityQuery>,
    State(state): State<AppState>,
) -> Response {
    let Ok(game_id) = GameId::parse(&game_id) else {
        return (StatusCode::NOT_FOUND, "unknown game id").into_response();
    };
    let user_id = UserId::new(identity.user_id);

    if let Err(error) = state.coordinator.join(game_id, user_id.clone(), identity.name, identity.image).await {
        return api_error(error);
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state.coordinator, game_id, user_id))
}

/// Registers the connection with the hub, then runs reader and writer halves
/// as independent tasks until either one ends, at which point the other is
/// aborted and the connection is deregistered. This is the one exit path,
/// covering normal close, read error, and write failure alike.
async fn handle_socket(socket: WebSocket, coordinator: Arc<Coordinator>, game_id: GameId, user_id: UserId) {
    let (connection_id, mut outbound_rx) = coordinator.hub().join(game_id);
    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sink.send(Message::Text(message)).await.is_err() {
                break;
            }
        }
    });

    let reader_coordinator = coordinator.clone();
    let reader_user_id = user_id.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    dispatch_frame(&reader_coordinator, &text, &reader_user_id, game_id, connection_id).await;
                }
                Ok(Message::Close(_)) => break,
                Err(error) => {
                    debug!(%game_id, %connection_id, %error, "read error, closing connection");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    coordinator.hub().leave(game_id, connection_id);
}

/// Decodes one inbound text frame and dispatches it to the coordinator.
/// Malformed frames are logged and dropped; the connection is preserved.
/// `CardPlayed` and `JudgeChoseWinningCard` carry no `user_id` of their own
/// (§6.1), so the acting user is always the connection's own identity,
/// established once at upgrade.
async fn dispatch_frame(
    coordinator: &Arc<Coordinator>,
    text: &str,
    connection_user_id: &UserId,
    game_id: GameId,
    connection_id: ConnectionId,
) {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(error) => {
            warn!(%game_id, %connection_id, %error, "dropping malformed inbound frame");
            return;
        }
    };

    let result = match frame {
        InboundFrame::GameBegins(frame) => {
            let handler = CoordinatorDeadlineHandler::new(coordinator.clone());
            coordinator.begin_game(frame.game_id, frame.user_id, handler).await.map(|_| ())
        }
        InboundFrame::CardPlayed(frame) => {
            coordinator.play_card(frame.game_id, connection_user_id.clone(), frame.card_id).await.map(|_| ())
        }
        InboundFrame::JudgeChoseWinningCard(frame) => {
            coordinator.pick_winner(frame.game_id, connection_user_id.clone(), frame.card_id).await.map(|_| ())
        }
        InboundFrame::RoundContinued(frame) => coordinator.continue_round(frame.game_id).await.map(|_| ()),
        InboundFrame::EmojiClicked(frame) => {
            coordinator.emoji_clicked(frame.game_id, frame.user_id, frame.emoji);
            Ok(())
        }
    };

    if let Err(error) = result {
        if !error.is_silent() {
            warn!(%game_id, %connection_id, %error, "command rejected");
            if let Ok(json) = OutboundFrame::chat(error.to_string()).to_json() {
                coordinator.hub().send_to(game_id, connection_id, json);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use database::in_memory::InMemoryEventLog;
    use deck_generator::StaticDeckGenerator;
    use hub::Hub;

    use super::*;

    fn test_state() -> AppState {
        let event_log: Arc<dyn database::EventLog> = Arc::new(InMemoryEventLog::new());
        let hub = Arc::new(Hub::new(8));
        let deck_generator: Arc<dyn deck_generator::DeckGenerator> = Arc::new(StaticDeckGenerator::new());
        let config = coordinator::CoordinatorConfig {
            round_deadline: Duration::from_secs(30),
            finished_game_cleanup: Duration::from_secs(30),
            outbound_queue_capacity: 8,
            starting_hand_size: 7,
        };
        AppState { coordinator: Coordinator::new(event_log, deck_generator, hub, config) }
    }

    #[tokio::test]
    async fn create_game_returns_a_snapshot_with_the_owner_seated() {
        let state = test_state();
        let request = CreateGameRequest {
            name: "living room".into(),
            subject: "space".into(),
            winner_score: 5,
            max_players: 4,
            owner_user_id: "owner".into(),
            owner_name: "Owner".into(),
            owner_image: "img".into(),
        };
        let response = create_game(State(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_error_maps_validation_to_bad_request() {
        let response = api_error(CoordinatorError::validation("nope"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn api_error_maps_not_found_to_404() {
        let response = api_error(CoordinatorError::not_found("nope"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
