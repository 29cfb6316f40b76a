//! Match channel wire messages
//!
//! Bidirectional JSON messages tagged by `event_type`. Every mutating
//! client message is answered with an updated snapshot or a rejection
//! reason, never silence.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use gambit_engine::{BoardId, BoardSetup, Game, GameResult, Loc, LobbyRequest, Piece, Team};

/// Messages a client may send to the lobby channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LobbyClientMessage {
    RequestGame { board_pk: BoardId },
    AcceptGame { request_pk: u64 },
}

/// Messages a client may send to a game channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameClientMessage {
    Move { from_loc: Loc, to_loc: Loc },
    Resign,
    Draw,
}

/// Messages the server sends on either channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A new request appeared in the lobby, with snapshots of every piece
    /// its board references
    NewGame {
        request: RequestData,
        pieces: HashMap<String, Piece>,
    },
    /// A request was accepted; the named game now exists
    BeginGame {
        deleted_ids: Vec<u64>,
        game_data: GameData,
        game_name: String,
    },
    /// Requests left the lobby without producing a game
    DeleteGame { deleted_ids: Vec<u64> },
    /// A move was committed
    BoardUpdate { game_data: GameData },
    /// Resignation or draw state changed
    Agreement { game_data: GameData },
    /// The requester's move was rejected; sent to the requester only
    InvalidMove { message: String },
    /// Anything else went wrong with the request; requester only
    Fail { message: String },
}

impl ServerMessage {
    /// Serialize with the receiving client's identity stamped in, so a
    /// client can tell whether a broadcast concerns itself.
    pub fn to_json_for(&self, whoami: &str) -> String {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.insert("whoami".to_string(), serde_json::Value::from(whoami));
        }
        value.to_string()
    }
}

/// A lobby request with its full board setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestData {
    pub pk: u64,
    pub requesting_user: String,
    pub board_setup: BoardSetup,
}

impl RequestData {
    pub fn new(request: &LobbyRequest, board: &BoardSetup) -> Self {
        Self {
            pk: request.id,
            requesting_user: request.requesting_user.clone(),
            board_setup: board.clone(),
        }
    }
}

/// Snapshot of a live game, shipped on every update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameData {
    pub pk: u64,
    pub white_user: String,
    pub black_user: String,
    pub white_to_move: bool,
    #[serde(flatten)]
    pub result: GameResult,
    pub draw_offer: Option<Team>,
    pub game_state: GameStateData,
}

/// The occupied tiles of the board, keyed `"row,col"`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateData {
    pub board: HashMap<String, TileData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileData {
    pub piece_pk: String,
    pub team: Team,
    pub is_royal: bool,
}

impl GameData {
    pub fn from_game(game: &Game) -> Self {
        let board = game
            .board()
            .units()
            .map(|(loc, unit)| {
                (
                    format!("{},{}", loc.row, loc.col),
                    TileData {
                        piece_pk: unit.piece.0.clone(),
                        team: unit.team,
                        is_royal: unit.is_royal,
                    },
                )
            })
            .collect();
        Self {
            pk: game.id,
            white_user: game.white_user.clone(),
            black_user: game.black_user.clone(),
            white_to_move: game.white_to_move,
            result: game.result,
            draw_offer: game.draw_offer,
            game_state: GameStateData { board },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        let message: GameClientMessage = serde_json::from_str(
            r#"{"event_type": "move", "from_loc": [0, 0], "to_loc": [0, 7]}"#,
        )
        .unwrap();
        match message {
            GameClientMessage::Move { from_loc, to_loc } => {
                assert_eq!(from_loc, Loc::new(0, 0));
                assert_eq!(to_loc, Loc::new(0, 7));
            }
            other => panic!("expected move, got {other:?}"),
        }

        let resign: GameClientMessage =
            serde_json::from_str(r#"{"event_type": "resign"}"#).unwrap();
        assert!(matches!(resign, GameClientMessage::Resign));
    }

    #[test]
    fn test_server_message_is_tagged_and_stamped() {
        let message = ServerMessage::InvalidMove {
            message: "nope".to_string(),
        };
        let json = message.to_json_for("alice");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event_type"], "invalid_move");
        assert_eq!(value["whoami"], "alice");
    }
}
