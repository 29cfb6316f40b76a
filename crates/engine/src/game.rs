//! Game state machine
//!
//! A `Game` owns the live board and is the only writer of it. Every
//! transition (`make_move`, `resign`, `draw`) is a synchronous
//! read-modify-write; the server serializes calls per game, so nothing here
//! needs interior locking. The game holds an immutable registry snapshot:
//! move edits after creation cannot change what a placed piece does.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gambit_dsl::RegistrySnapshot;

use crate::board::{Board, UnitInstance};
use crate::error::GameError;
use crate::executor::{execute, ExecLimits};
use crate::grid::MoveGrid;
use crate::piece::{BoardSetup, Piece};
use crate::types::{Loc, PieceId, Team, UnitId, WinCondition};

/// How a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    Capture,
    Resignation,
    /// The losing side had no legal move on its turn
    NoMoves,
}

/// Result of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GameResult {
    InProgress,
    Won { winner: Team, reason: WinReason },
    Draw,
}

impl GameResult {
    pub fn is_over(&self) -> bool {
        !matches!(self, GameResult::InProgress)
    }
}

/// Outcome of a `draw` message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// An offer is now pending for the caller's side
    Offered,
    /// The caller's side already had the pending offer; ignored
    AlreadyOffered,
    /// Both sides agreed; the game is drawn
    Agreed,
}

/// A live match
#[derive(Debug)]
pub struct Game {
    pub id: u64,
    pub board_name: String,
    pub white_user: String,
    pub black_user: String,
    pub white_to_move: bool,
    pub result: GameResult,
    pub draw_offer: Option<Team>,
    board: Board,
    /// Grid snapshots of every placed piece design
    grids: HashMap<PieceId, MoveGrid>,
    wincon_white: WinCondition,
    wincon_black: WinCondition,
    initial_royals_white: usize,
    initial_royals_black: usize,
    snapshot: Arc<RegistrySnapshot>,
    limits: ExecLimits,
}

impl Game {
    /// Build a game from a board setup.
    ///
    /// Placements snapshot the referenced pieces' public fields; later
    /// edits to a piece design are invisible to this game.
    pub fn new(
        id: u64,
        white_user: String,
        black_user: String,
        setup: &BoardSetup,
        pieces: &HashMap<PieceId, Piece>,
        snapshot: Arc<RegistrySnapshot>,
    ) -> Result<Game, GameError> {
        let mut board = Board::new();
        let mut grids = HashMap::new();
        let mut next_unit = 0u32;

        for placement in &setup.placements {
            let loc = placement.loc();
            if !loc.in_bounds() || board.get(loc).is_some() {
                return Err(GameError::InvalidPlacement(loc));
            }
            let piece = pieces
                .get(&placement.piece)
                .ok_or_else(|| GameError::UnknownPiece(placement.piece.clone()))?;
            grids
                .entry(placement.piece.clone())
                .or_insert_with(|| piece.moves.clone());
            board.set(
                loc,
                Some(UnitInstance {
                    id: UnitId(next_unit),
                    piece: placement.piece.clone(),
                    team: placement.team,
                    is_royal: placement.is_royal,
                    immunities: piece.immunities.clone(),
                }),
            );
            next_unit += 1;
        }

        let initial_royals_white = board.royal_count(Team::White);
        let initial_royals_black = board.royal_count(Team::Black);
        info!(game = id, board = %setup.name, "game created");

        Ok(Game {
            id,
            board_name: setup.name.clone(),
            white_user,
            black_user,
            white_to_move: true,
            result: GameResult::InProgress,
            draw_offer: None,
            board,
            grids,
            wincon_white: setup.wincon_white,
            wincon_black: setup.wincon_black,
            initial_royals_white,
            initial_royals_black,
            snapshot,
            limits: ExecLimits::default(),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    fn side_to_move(&self) -> Team {
        if self.white_to_move {
            Team::White
        } else {
            Team::Black
        }
    }

    /// Which side a user plays. Someone playing both sides (local play)
    /// acts as the side to move.
    fn user_team(&self, user: &str) -> Option<Team> {
        let is_white = self.white_user == user;
        let is_black = self.black_user == user;
        match (is_white, is_black) {
            (true, true) => Some(self.side_to_move()),
            (true, false) => Some(Team::White),
            (false, true) => Some(Team::Black),
            (false, false) => None,
        }
    }

    fn participant(&self, user: &str) -> Result<Team, GameError> {
        self.user_team(user)
            .ok_or_else(|| GameError::NotParticipant(user.to_string()))
    }

    /// Attempt a move. On success the board updates and the turn flips; on
    /// any failure the game is exactly as before.
    pub fn make_move(&mut self, user: &str, from: Loc, to: Loc) -> Result<(), GameError> {
        if self.result.is_over() {
            return Err(GameError::GameOver);
        }
        let mover = self.participant(user)?;
        if mover != self.side_to_move() {
            return Err(GameError::NotYourTurn);
        }

        let next = self.evaluate_move(mover, from, to)?;
        self.board = next;
        self.white_to_move = !self.white_to_move;
        debug!(game = self.id, %mover, %from, %to, "move committed");

        self.check_captures(mover);
        if !self.result.is_over() && !self.has_any_legal_move(self.side_to_move()) {
            // No stalemate rule: a side with no legal move loses
            self.result = GameResult::Won {
                winner: mover,
                reason: WinReason::NoMoves,
            };
            info!(game = self.id, winner = %mover, "opponent has no legal moves");
        }
        Ok(())
    }

    /// Stage one move on a scratch board without touching the game.
    fn evaluate_move(&self, mover: Team, from: Loc, to: Loc) -> Result<Board, GameError> {
        if !from.in_bounds() {
            return Err(GameError::OutOfBounds(from));
        }
        if !to.in_bounds() {
            return Err(GameError::OutOfBounds(to));
        }
        let unit = self.board.get(from).ok_or(GameError::NoUnit(from))?;
        if unit.team != mover {
            return Err(GameError::NotYourUnit(from));
        }
        let grid = self
            .grids
            .get(&unit.piece)
            .ok_or_else(|| GameError::UnknownPiece(unit.piece.clone()))?;
        let (d_row, d_col) = from.delta_to(to);
        let move_id = grid
            .moves_at(d_row, d_col, mover)
            .ok_or(GameError::NoMoveDefined)?;
        let action = self
            .snapshot
            .by_id(move_id)
            .ok_or_else(|| GameError::UnknownMove(move_id.clone()))?
            .clone();
        let next = execute(
            &self.snapshot,
            self.limits,
            &self.board,
            mover,
            &action,
            from,
            to,
        )?;
        Ok(next)
    }

    /// Evaluate both teams' loss conditions after a committed move.
    ///
    /// The mover's opponent is checked first: when a single move triggers
    /// both conditions, the side that acted wins.
    fn check_captures(&mut self, mover: Team) {
        for team in [mover.opponent(), mover] {
            if self.result.is_over() {
                return;
            }
            if self.condition_triggered(team) {
                self.result = GameResult::Won {
                    winner: team.opponent(),
                    reason: WinReason::Capture,
                };
                info!(game = self.id, loser = %team, "win condition triggered");
            }
        }
    }

    fn condition_triggered(&self, team: Team) -> bool {
        let (condition, initial_royals) = match team {
            Team::White => (self.wincon_white, self.initial_royals_white),
            Team::Black => (self.wincon_black, self.initial_royals_black),
        };
        let royals = self.board.royal_count(team);
        match condition {
            WinCondition::AnyRoyalCaptured => royals < initial_royals,
            WinCondition::AllRoyalsCaptured => initial_royals > 0 && royals == 0,
            WinCondition::AllPiecesCaptured => self.board.team_units(team).next().is_none(),
        }
    }

    /// Whether any (unit, target) pair evaluates to a legal move.
    ///
    /// Tries each candidate against a scratch board; bounded by the same
    /// step budget as real moves.
    fn has_any_legal_move(&self, team: Team) -> bool {
        let units: Vec<Loc> = self.board.team_units(team).map(|(loc, _)| loc).collect();
        for from in units {
            for row in 0..crate::types::BOARD_SIZE {
                for col in 0..crate::types::BOARD_SIZE {
                    let to = Loc::new(row, col);
                    if to == from {
                        continue;
                    }
                    if self.evaluate_move(team, from, to).is_ok() {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Resign; the opponent wins immediately.
    pub fn resign(&mut self, user: &str) -> Result<(), GameError> {
        if self.result.is_over() {
            return Err(GameError::GameOver);
        }
        let team = self.participant(user)?;
        self.result = GameResult::Won {
            winner: team.opponent(),
            reason: WinReason::Resignation,
        };
        info!(game = self.id, resigned = %team, "resignation");
        Ok(())
    }

    /// Offer or accept a draw.
    ///
    /// The first call records an offer for the caller's side; a call from
    /// the other side with a live offer agrees the draw; a repeat from the
    /// offering side is ignored. In local play (one user on both sides) a
    /// second call resolves the pending offer for the opposite colour.
    pub fn draw(&mut self, user: &str) -> Result<DrawOutcome, GameError> {
        if self.result.is_over() {
            return Err(GameError::GameOver);
        }
        let team = self.participant(user)?;
        let caller = if self.white_user == self.black_user {
            match self.draw_offer {
                Some(offered) => offered.opponent(),
                None => team,
            }
        } else {
            team
        };

        match self.draw_offer {
            None => {
                self.draw_offer = Some(caller);
                debug!(game = self.id, side = %caller, "draw offered");
                Ok(DrawOutcome::Offered)
            }
            Some(offered) if offered == caller => Ok(DrawOutcome::AlreadyOffered),
            Some(_) => {
                self.result = GameResult::Draw;
                self.draw_offer = None;
                info!(game = self.id, "draw agreed");
                Ok(DrawOutcome::Agreed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MoveGrid;
    use crate::official::official_registry;
    use crate::piece::Placement;
    use crate::types::BoardId;
    use gambit_dsl::MoveId;

    fn rook_piece() -> Piece {
        let mut moves = MoveGrid::new();
        let id = MoveId::from("official:moveOrAttack");
        for d in 1..=7 {
            for (d_row, d_col) in [(0, d), (d, 0), (d, d), (d, -d)] {
                moves.place(d_row, d_col, Some(id.clone())).unwrap();
                moves.place(-d_row, -d_col, Some(id.clone())).unwrap();
            }
        }
        Piece {
            id: PieceId::from("rook"),
            name: "Rook".to_string(),
            image_white: String::new(),
            image_black: String::new(),
            moves,
            author: None,
            immunities: Vec::new(),
        }
    }

    fn setup(placements: Vec<Placement>) -> BoardSetup {
        BoardSetup {
            id: BoardId::from("test-board"),
            name: "test".to_string(),
            author: None,
            placements,
            wincon_white: WinCondition::AnyRoyalCaptured,
            wincon_black: WinCondition::AnyRoyalCaptured,
        }
    }

    fn placement(row: i32, col: i32, team: Team, is_royal: bool) -> Placement {
        Placement {
            row,
            col,
            piece: PieceId::from("rook"),
            team,
            is_royal,
        }
    }

    fn new_game(placements: Vec<Placement>) -> Game {
        let registry = official_registry();
        let mut pieces = HashMap::new();
        pieces.insert(PieceId::from("rook"), rook_piece());
        Game::new(
            1,
            "alice".to_string(),
            "bob".to_string(),
            &setup(placements),
            &pieces,
            Arc::new(registry.snapshot()),
        )
        .unwrap()
    }

    #[test]
    fn test_slide_move_commits_and_flips_turn() {
        let mut game = new_game(vec![
            placement(0, 0, Team::White, false),
            placement(7, 7, Team::Black, false),
        ]);
        game.make_move("alice", Loc::new(0, 0), Loc::new(0, 7)).unwrap();
        assert_eq!(game.board().get(Loc::new(0, 7)).unwrap().team, Team::White);
        assert!(game.board().get(Loc::new(0, 0)).is_none());
        assert!(!game.white_to_move);
    }

    #[test]
    fn test_blocked_slide_is_rejected_and_board_unchanged() {
        let mut game = new_game(vec![
            placement(0, 0, Team::White, false),
            placement(0, 3, Team::Black, false),
            placement(7, 7, Team::Black, false),
        ]);
        let before = game.board().clone();
        let err = game
            .make_move("alice", Loc::new(0, 0), Loc::new(0, 7))
            .unwrap_err();
        assert!(matches!(err, GameError::Action(_)));
        assert_eq!(game.board(), &before);
        assert!(game.white_to_move);
    }

    #[test]
    fn test_out_of_turn_move_is_rejected() {
        let mut game = new_game(vec![
            placement(0, 0, Team::White, false),
            placement(7, 7, Team::Black, false),
        ]);
        let before = game.board().clone();
        let err = game
            .make_move("bob", Loc::new(7, 7), Loc::new(7, 0))
            .unwrap_err();
        assert_eq!(err, GameError::NotYourTurn);
        assert_eq!(game.board(), &before);
        assert!(game.white_to_move);
    }

    #[test]
    fn test_outsider_is_rejected() {
        let mut game = new_game(vec![
            placement(0, 0, Team::White, false),
            placement(7, 7, Team::Black, false),
        ]);
        let err = game
            .make_move("mallory", Loc::new(0, 0), Loc::new(0, 1))
            .unwrap_err();
        assert_eq!(err, GameError::NotParticipant("mallory".to_string()));
    }

    #[test]
    fn test_royal_capture_ends_the_game_immediately() {
        let mut game = new_game(vec![
            placement(0, 0, Team::White, false),
            placement(0, 5, Team::Black, true),
            placement(7, 7, Team::Black, false),
        ]);
        game.make_move("alice", Loc::new(0, 0), Loc::new(0, 5)).unwrap();
        assert_eq!(
            game.result,
            GameResult::Won {
                winner: Team::White,
                reason: WinReason::Capture
            }
        );
        // terminal: no further moves accepted
        let err = game
            .make_move("bob", Loc::new(7, 7), Loc::new(7, 0))
            .unwrap_err();
        assert_eq!(err, GameError::GameOver);
    }

    #[test]
    fn test_draw_offer_matrix() {
        let mut game = new_game(vec![
            placement(0, 0, Team::White, false),
            placement(7, 7, Team::Black, false),
        ]);
        assert_eq!(game.draw("alice").unwrap(), DrawOutcome::Offered);
        // repeat offer from the same side never agrees a draw
        assert_eq!(game.draw("alice").unwrap(), DrawOutcome::AlreadyOffered);
        assert_eq!(game.result, GameResult::InProgress);
        // acceptance from the other side always does
        assert_eq!(game.draw("bob").unwrap(), DrawOutcome::Agreed);
        assert_eq!(game.result, GameResult::Draw);
    }

    #[test]
    fn test_local_play_draw_resolves_for_other_side() {
        let registry = official_registry();
        let mut pieces = HashMap::new();
        pieces.insert(PieceId::from("rook"), rook_piece());
        let mut game = Game::new(
            2,
            "solo".to_string(),
            "solo".to_string(),
            &setup(vec![
                placement(0, 0, Team::White, false),
                placement(7, 7, Team::Black, false),
            ]),
            &pieces,
            Arc::new(registry.snapshot()),
        )
        .unwrap();
        assert_eq!(game.draw("solo").unwrap(), DrawOutcome::Offered);
        assert_eq!(game.draw("solo").unwrap(), DrawOutcome::Agreed);
        assert_eq!(game.result, GameResult::Draw);
    }

    #[test]
    fn test_resignation() {
        let mut game = new_game(vec![
            placement(0, 0, Team::White, false),
            placement(7, 7, Team::Black, false),
        ]);
        game.resign("bob").unwrap();
        assert_eq!(
            game.result,
            GameResult::Won {
                winner: Team::White,
                reason: WinReason::Resignation
            }
        );
    }

    #[test]
    fn test_side_with_no_pieces_loses_by_no_moves() {
        // black's only unit is white's first capture; after the capture
        // black has no legal moves and loses (captures also trigger since
        // all-pieces wincon isn't set here, royal count stays intact)
        let mut game = new_game(vec![
            placement(0, 0, Team::White, false),
            placement(0, 6, Team::Black, false),
        ]);
        game.make_move("alice", Loc::new(0, 0), Loc::new(0, 6)).unwrap();
        assert_eq!(
            game.result,
            GameResult::Won {
                winner: Team::White,
                reason: WinReason::NoMoves
            }
        );
    }

    #[test]
    fn test_unimplemented_grid_offset_is_rejected() {
        let mut game = new_game(vec![
            placement(0, 0, Team::White, false),
            placement(7, 7, Team::Black, false),
        ]);
        // knight jump is not in the rook grid
        let err = game
            .make_move("alice", Loc::new(0, 0), Loc::new(2, 1))
            .unwrap_err();
        assert_eq!(err, GameError::NoMoveDefined);
    }
}
