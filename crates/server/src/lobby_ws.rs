//! Lobby websocket channel
//!
//! Matchmaking: clients publish and accept game requests; every change is
//! fanned out to all lobby subscribers. Disconnecting withdraws the
//! departing user's open requests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use gambit_engine::{BoardId, Game, Piece, PieceId};

use crate::messages::{LobbyClientMessage, RequestData, ServerMessage};
use crate::state::AppState;

/// Identity comes from the (out-of-scope) auth layer as a query parameter.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub user: String,
}

pub async fn lobby_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| lobby_socket(socket, state, params.user))
}

async fn lobby_socket(socket: WebSocket, state: Arc<AppState>, user: String) {
    let (mut sender, mut receiver) = socket.split();

    if user.is_empty() {
        let message = ServerMessage::Fail {
            message: "Not logged in, could not send request.".to_string(),
        };
        let _ = sender.send(Message::Text(message.to_json_for(""))).await;
        return;
    }

    info!(user, "lobby connection opened");
    let mut events = state.lobby_events.subscribe();

    // Catch the newcomer up on the open requests
    for message in open_request_messages(&state) {
        if sender
            .send(Message::Text(message.to_json_for(&user)))
            .await
            .is_err()
        {
            return;
        }
    }

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    debug!(user, %text, "lobby message");
                    if let Err(reason) = handle_lobby_message(&state, &user, &text) {
                        let message = ServerMessage::Fail { message: reason };
                        if sender
                            .send(Message::Text(message.to_json_for(&user)))
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
                    error!(user, %err, "lobby socket error");
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
                    warn!(user, skipped, "lobby subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    // Withdraw the departing user's open requests
    let removed = state
        .lobby
        .lock()
        .expect("lobby lock poisoned")
        .remove_user_requests(&user);
    if !removed.is_empty() {
        let _ = state.lobby_events.send(ServerMessage::DeleteGame {
            deleted_ids: removed,
        });
    }
    info!(user, "lobby connection closed");
}

/// `new_game` messages for every currently open request.
fn open_request_messages(state: &AppState) -> Vec<ServerMessage> {
    let workshop = state.workshop.lock().expect("workshop lock poisoned");
    let lobby = state.lobby.lock().expect("lobby lock poisoned");
    lobby
        .requests()
        .filter_map(|request| {
            let board = workshop.board(&request.board)?;
            Some(ServerMessage::NewGame {
                request: RequestData::new(request, board),
                pieces: board_pieces(&workshop, board),
            })
        })
        .collect()
}

fn board_pieces(
    workshop: &gambit_engine::Workshop,
    board: &gambit_engine::BoardSetup,
) -> HashMap<String, Piece> {
    let ids: Vec<PieceId> = board.placements.iter().map(|p| p.piece.clone()).collect();
    workshop
        .pieces(Some(&ids))
        .into_iter()
        .map(|piece| (piece.id.0.clone(), piece.clone()))
        .collect()
}

fn handle_lobby_message(state: &AppState, user: &str, text: &str) -> Result<(), String> {
    let message: LobbyClientMessage =
        serde_json::from_str(text).map_err(|_| format!("Invalid data, you sent {text}"))?;
    match message {
        LobbyClientMessage::RequestGame { board_pk } => request_game(state, user, board_pk),
        LobbyClientMessage::AcceptGame { request_pk } => accept_game(state, user, request_pk),
    }
}

/// Publish a request and broadcast it with the board's piece snapshots.
fn request_game(state: &AppState, user: &str, board_pk: BoardId) -> Result<(), String> {
    let workshop = state.workshop.lock().expect("workshop lock poisoned");
    let board = workshop
        .board(&board_pk)
        .ok_or_else(|| format!("Could not send request: unknown board '{board_pk}'"))?
        .clone();
    let pieces = board_pieces(&workshop, &board);
    drop(workshop);

    let mut lobby = state.lobby.lock().expect("lobby lock poisoned");
    let request = lobby.request_game(user, board_pk);
    let message = ServerMessage::NewGame {
        request: RequestData::new(request, &board),
        pieces,
    };
    drop(lobby);

    let _ = state.lobby_events.send(message);
    Ok(())
}

/// Accept a request: clear the author's requests, flip a coin for colours,
/// create the game and announce it.
fn accept_game(state: &AppState, acceptor: &str, request_pk: u64) -> Result<(), String> {
    let accepted = state
        .lobby
        .lock()
        .expect("lobby lock poisoned")
        .accept_game(request_pk)
        .map_err(|e| e.to_string())?;

    let workshop = state.workshop.lock().expect("workshop lock poisoned");
    let board = workshop
        .board(&accepted.request.board)
        .ok_or_else(|| "The requested board no longer exists".to_string())?
        .clone();
    let pieces: HashMap<PieceId, Piece> = board
        .placements
        .iter()
        .filter_map(|p| workshop.piece(&p.piece).cloned())
        .map(|piece| (piece.id.clone(), piece))
        .collect();
    let snapshot = Arc::new(workshop.registry_snapshot());
    drop(workshop);

    // Coin flip for colours
    let requester = accepted.request.requesting_user.clone();
    let (white, black) = if rand::thread_rng().gen_bool(0.5) {
        (acceptor.to_string(), requester)
    } else {
        (requester, acceptor.to_string())
    };

    let id = state.allocate_game_id();
    let game = Game::new(id, white, black, &board, &pieces, snapshot)
        .map_err(|e| format!("Could not create game: {e}"))?;
    let game_data = crate::messages::GameData::from_game(&game);
    state.insert_game(game);
    info!(game = id, board = %board.name, "game began");

    let _ = state.lobby_events.send(ServerMessage::BeginGame {
        deleted_ids: accepted.removed_ids,
        game_data,
        game_name: board.name,
    });
    Ok(())
}
