//! Per-game websocket channel
//!
//! Move submission, resignation and draw negotiation for one live game.
//! Each transition takes the game's mutex for the whole read-modify-write;
//! the executor's stage-then-commit happens inside that critical section.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use gambit_engine::{DrawOutcome, GameError};

use crate::lobby_ws::WsParams;
use crate::messages::{GameClientMessage, GameData, ServerMessage};
use crate::state::{AppState, GameRoom};

pub async fn game_handler(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<u64>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| game_socket(socket, state, game_id, params.user))
}

async fn game_socket(socket: WebSocket, state: Arc<AppState>, game_id: u64, user: String) {
    let (mut sender, mut receiver) = socket.split();

    let reject = |message: String| ServerMessage::Fail { message };
    if user.is_empty() {
        let message = reject("Not logged in, could not send request.".to_string());
        let _ = sender.send(Message::Text(message.to_json_for(""))).await;
        return;
    }
    let Some(room) = state.game(game_id) else {
        let message = reject("This game has already ended".to_string());
        let _ = sender.send(Message::Text(message.to_json_for(&user))).await;
        return;
    };

    info!(game = game_id, user, "game connection opened");
    let mut events = room.events.subscribe();

    // Current position for the newcomer
    let snapshot = {
        let game = room.game.lock().expect("game lock poisoned");
        ServerMessage::BoardUpdate {
            game_data: GameData::from_game(&game),
        }
    };
    if sender
        .send(Message::Text(snapshot.to_json_for(&user)))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    debug!(game = game_id, user, %text, "game message");
                    if let Some(reply) = handle_game_message(&state, &room, game_id, &user, &text) {
                        if sender
                            .send(Message::Text(reply.to_json_for(&user)))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    error!(game = game_id, user, %err, "game socket error");
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(message) => {
                    if sender
                        .send(Message::Text(message.to_json_for(&user)))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(game = game_id, user, skipped, "game subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    info!(game = game_id, user, "game connection closed");
}

/// Apply one client message. Returns a reply for the requester only;
/// successful transitions broadcast to the room instead.
fn handle_game_message(
    state: &AppState,
    room: &GameRoom,
    game_id: u64,
    user: &str,
    text: &str,
) -> Option<ServerMessage> {
    let message: GameClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(_) => {
            return Some(ServerMessage::Fail {
                message: format!("Invalid data, you sent {text}"),
            });
        }
    };

    let mut game = room.game.lock().expect("game lock poisoned");
    match message {
        GameClientMessage::Move { from_loc, to_loc } => {
            match game.make_move(user, from_loc, to_loc) {
                Ok(()) => {
                    let update = ServerMessage::BoardUpdate {
                        game_data: GameData::from_game(&game),
                    };
                    let over = game.result.is_over();
                    drop(game);
                    let _ = room.events.send(update);
                    if over {
                        state.archive_game(game_id);
                    }
                    None
                }
                // Protocol-level misuse is a plain failure; a move the rules
                // reject is an invalid_move for the requester only.
                Err(err @ (GameError::GameOver | GameError::NotParticipant(_))) => {
                    Some(ServerMessage::Fail {
                        message: err.to_string(),
                    })
                }
                Err(err) => {
                    // Resource-bound overruns are an internal problem, not
                    // gameplay; log them loudly but only reject this move.
                    match &err {
                        GameError::Action(action_err) if !action_err.is_fail() => {
                            error!(game = game_id, user, %action_err, "action runtime error");
                        }
                        _ => debug!(game = game_id, user, %err, "move rejected"),
                    }
                    Some(ServerMessage::InvalidMove {
                        message: err.to_string(),
                    })
                }
            }
        }
        GameClientMessage::Resign => match game.resign(user) {
            Ok(()) => {
                let update = ServerMessage::Agreement {
                    game_data: GameData::from_game(&game),
                };
                drop(game);
                let _ = room.events.send(update);
                state.archive_game(game_id);
                None
            }
            Err(err) => Some(ServerMessage::Fail {
                message: err.to_string(),
            }),
        },
        GameClientMessage::Draw => match game.draw(user) {
            Ok(outcome) => {
                let update = ServerMessage::Agreement {
                    game_data: GameData::from_game(&game),
                };
                let over = game.result.is_over();
                drop(game);
                match outcome {
                    DrawOutcome::Offered | DrawOutcome::Agreed => {
                        let _ = room.events.send(update);
                        if over {
                            state.archive_game(game_id);
                        }
                        None
                    }
                    // A repeat offer changes nothing; echo to the caller only
                    DrawOutcome::AlreadyOffered => Some(update),
                }
            }
            Err(err) => Some(ServerMessage::Fail {
                message: err.to_string(),
            }),
        },
    }
}
