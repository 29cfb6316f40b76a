//! Integration test harness for Gambit.
//!
//! Utilities for end-to-end testing of the full pipeline:
//! Author moves → Design pieces → Set up a board → Matchmake → Play.

use std::collections::HashMap;
use std::sync::Arc;

use gambit_dsl::MoveId;
use gambit_engine::official::official_registry;
use gambit_engine::{
    AcceptedRequest, Board, BoardId, BoardSetup, Game, GameError, Loc, Lobby, MoveGrid, Piece,
    PieceId, Placement, Team, WinCondition, Workshop,
};

/// Test harness holding a workshop, a lobby and at most one live game.
pub struct TestHarness {
    pub workshop: Workshop,
    pub lobby: Lobby,
    pub game: Option<Game>,
    next_game_id: u64,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Workshop seeded with the official move library.
    pub fn new() -> Self {
        Self {
            workshop: Workshop::with_registry(official_registry()),
            lobby: Lobby::new(),
            game: None,
            next_game_id: 1,
        }
    }

    /// Save a piece whose whole 8-direction rider uses one official move.
    ///
    /// # Panics
    ///
    /// Panics if the grid write or the save is rejected.
    pub fn save_rider_piece(&mut self, piece_id: &str, move_name: &str) {
        let move_id = MoveId::from(format!("official:{move_name}").as_str());
        let mut moves = MoveGrid::new();
        for d in 1..=7 {
            for (d_row, d_col) in [(0, d), (d, 0), (-d, 0), (d, d), (-d, d)] {
                moves
                    .place(d_row, d_col, Some(move_id.clone()))
                    .expect("rider offsets are in range");
            }
        }
        self.workshop
            .save_piece(Piece {
                id: PieceId::from(piece_id),
                name: piece_id.to_string(),
                image_white: String::new(),
                image_black: String::new(),
                moves,
                author: None,
                immunities: Vec::new(),
            })
            .expect("piece should save");
    }

    /// Save a board setup from (row, col, piece, team, royal) placements.
    pub fn save_board(
        &mut self,
        board_id: &str,
        placements: &[(i32, i32, &str, Team, bool)],
        wincon: WinCondition,
    ) {
        let placements = placements
            .iter()
            .map(|(row, col, piece, team, is_royal)| Placement {
                row: *row,
                col: *col,
                piece: PieceId::from(*piece),
                team: *team,
                is_royal: *is_royal,
            })
            .collect();
        self.workshop
            .save_board(BoardSetup {
                id: BoardId::from(board_id),
                name: board_id.to_string(),
                author: None,
                placements,
                wincon_white: wincon,
                wincon_black: wincon,
            })
            .expect("board should save");
    }

    /// Run the lobby flow: request, accept, create the game.
    ///
    /// The requester always receives white so tests stay deterministic.
    pub fn matchmake(&mut self, requester: &str, acceptor: &str, board_id: &str) -> AcceptedRequest {
        let request_id = self
            .lobby
            .request_game(requester, BoardId::from(board_id))
            .id;
        let accepted = self.lobby.accept_game(request_id).expect("request exists");

        let board = self
            .workshop
            .board(&BoardId::from(board_id))
            .expect("board exists")
            .clone();
        let pieces: HashMap<PieceId, Piece> = self
            .workshop
            .pieces(None)
            .into_iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();
        let game = Game::new(
            self.next_game_id,
            requester.to_string(),
            acceptor.to_string(),
            &board,
            &pieces,
            Arc::new(self.workshop.registry_snapshot()),
        )
        .expect("game should build");
        self.next_game_id += 1;
        self.game = Some(game);
        accepted
    }

    pub fn game(&mut self) -> &mut Game {
        self.game.as_mut().expect("no game in progress")
    }

    pub fn board(&self) -> &Board {
        self.game.as_ref().expect("no game in progress").board()
    }

    pub fn make_move(
        &mut self,
        user: &str,
        from: (i32, i32),
        to: (i32, i32),
    ) -> Result<(), GameError> {
        self.game()
            .make_move(user, Loc::new(from.0, from.1), Loc::new(to.0, to.1))
    }
}
