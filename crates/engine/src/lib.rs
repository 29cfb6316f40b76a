//! Gambit match engine
//!
//! Board and unit model, per-piece relative move grids, the straight-line
//! path resolver, the action executor (staged board with commit-or-rollback),
//! the game state machine and the lobby. The server crate wraps these in a
//! websocket transport; everything here is synchronous and deterministic.

pub mod board;
pub mod error;
pub mod executor;
pub mod game;
pub mod grid;
pub mod lobby;
pub mod official;
pub mod path;
pub mod piece;
pub mod store;
pub mod types;

pub use board::{Board, UnitInstance};
pub use error::{ActionError, GameError, GridError, LobbyError, PathError, StoreError};
pub use executor::{execute, ExecLimits, Value};
pub use game::{DrawOutcome, Game, GameResult, WinReason};
pub use grid::MoveGrid;
pub use lobby::{AcceptedRequest, Lobby, LobbyRequest};
pub use path::path;
pub use piece::{BoardSetup, Piece, Placement};
pub use store::Workshop;
pub use types::{BoardId, Immunity, Loc, PieceId, Team, UnitId, WinCondition, BOARD_SIZE};
