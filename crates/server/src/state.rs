//! Shared server state
//!
//! The lobby and every game room are single-writer resources: each sits
//! behind its own mutex and all transitions are one locked critical
//! section. Broadcast channels handle fan-out only and never guard state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::info;

use gambit_dsl::MoveId;
use gambit_engine::official::official_registry;
use gambit_engine::{
    BoardId, BoardSetup, Game, Lobby, MoveGrid, Piece, PieceId, Placement, Team, WinCondition,
    Workshop,
};

use crate::messages::ServerMessage;

/// Capacity of the fan-out channels; laggy clients drop old events.
const EVENT_CAPACITY: usize = 64;

/// One live game plus its event fan-out
pub struct GameRoom {
    pub game: Mutex<Game>,
    pub events: broadcast::Sender<ServerMessage>,
}

impl GameRoom {
    pub fn new(game: Game) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            game: Mutex::new(game),
            events,
        }
    }
}

/// Global application state
pub struct AppState {
    pub workshop: Mutex<Workshop>,
    pub lobby: Mutex<Lobby>,
    pub lobby_events: broadcast::Sender<ServerMessage>,
    games: Mutex<HashMap<u64, Arc<GameRoom>>>,
    next_game_id: AtomicU64,
}

impl AppState {
    pub fn new(workshop: Workshop) -> Self {
        let (lobby_events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            workshop: Mutex::new(workshop),
            lobby: Mutex::new(Lobby::new()),
            lobby_events,
            games: Mutex::new(HashMap::new()),
            next_game_id: AtomicU64::new(1),
        }
    }

    pub fn allocate_game_id(&self) -> u64 {
        self.next_game_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert_game(&self, game: Game) -> Arc<GameRoom> {
        let id = game.id;
        let room = Arc::new(GameRoom::new(game));
        self.games
            .lock()
            .expect("games lock poisoned")
            .insert(id, room.clone());
        room
    }

    pub fn game(&self, id: u64) -> Option<Arc<GameRoom>> {
        self.games
            .lock()
            .expect("games lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Archive a finished game: later lookups miss, live subscribers keep
    /// their `Arc` until they disconnect.
    pub fn archive_game(&self, id: u64) {
        if self
            .games
            .lock()
            .expect("games lock poisoned")
            .remove(&id)
            .is_some()
        {
            info!(game = id, "game archived");
        }
    }
}

/// Workshop pre-seeded with the official moves plus a demo piece and board,
/// so a fresh server has something to play with.
pub fn demo_workshop() -> Workshop {
    let mut workshop = Workshop::with_registry(official_registry());

    let mut moves = MoveGrid::new();
    let move_or_attack = MoveId::from("official:moveOrAttack");
    for d in 1..=7 {
        for (d_row, d_col) in [(0, d), (d, 0), (-d, 0), (d, d), (-d, d)] {
            moves
                .place(d_row, d_col, Some(move_or_attack.clone()))
                .expect("rider offsets are in range");
        }
    }
    workshop
        .save_piece(Piece {
            id: PieceId::from("demo:rook"),
            name: "Rook".to_string(),
            image_white: String::new(),
            image_black: String::new(),
            moves,
            author: None,
            immunities: Vec::new(),
        })
        .expect("demo piece references official moves");

    let mut placements = Vec::new();
    for (team, back_rank) in [(Team::White, 0), (Team::Black, 7)] {
        for col in 0..4 {
            placements.push(Placement {
                row: back_rank,
                col,
                piece: PieceId::from("demo:rook"),
                team,
                is_royal: col == 0,
            });
        }
    }
    workshop
        .save_board(BoardSetup {
            id: BoardId::from("demo:skirmish"),
            name: "Rook skirmish".to_string(),
            author: None,
            placements,
            wincon_white: WinCondition::AnyRoyalCaptured,
            wincon_black: WinCondition::AnyRoyalCaptured,
        })
        .expect("demo board references the demo piece");

    workshop
}
