//! Workshop store
//!
//! The persistence boundary: CRUD-style operations for move definitions,
//! pieces and board setups, each keyed by a stable identifier, with list
//! reads filterable by an id set. In-memory here; a real backing store
//! would sit behind the same surface.

use indexmap::IndexMap;
use tracing::debug;

use gambit_dsl::{MoveDefinition, MoveId, MoveRegistry, RegistrySnapshot};

use crate::error::StoreError;
use crate::piece::{BoardSetup, Piece};
use crate::types::{BoardId, PieceId};

/// Everything the designers have made
#[derive(Debug, Default)]
pub struct Workshop {
    registry: MoveRegistry,
    pieces: IndexMap<PieceId, Piece>,
    boards: IndexMap<BoardId, BoardSetup>,
}

impl Workshop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a pre-seeded move registry (the official library).
    pub fn with_registry(registry: MoveRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    // === Moves ===

    /// Create a move definition; compiles its implementation if present.
    pub fn create_move(&mut self, definition: MoveDefinition) -> Result<(), StoreError> {
        self.registry.register(definition)?;
        Ok(())
    }

    pub fn move_definition(&self, id: &MoveId) -> Option<&MoveDefinition> {
        self.registry.definition(id)
    }

    /// Move definitions in registration order, optionally filtered by id.
    pub fn moves(&self, filter: Option<&[MoveId]>) -> Vec<&MoveDefinition> {
        self.registry
            .definitions()
            .filter(|def| match filter {
                Some(ids) => ids.contains(&def.id),
                None => true,
            })
            .collect()
    }

    /// Immutable compiled-action table for a new game.
    pub fn registry_snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    // === Pieces ===

    /// Create or replace a piece design.
    ///
    /// Every grid cell must reference a playable (implemented) move;
    /// games already in progress keep their own snapshots regardless.
    pub fn save_piece(&mut self, piece: Piece) -> Result<(), StoreError> {
        for (_, _, move_id) in piece.moves.entries() {
            if self.registry.definition(move_id).is_none() {
                return Err(StoreError::UnknownMove(move_id.clone()));
            }
            if !self.registry.is_playable(move_id) {
                return Err(StoreError::UnplayableMove(move_id.clone()));
            }
        }
        debug!(piece = %piece.id, "piece saved");
        self.pieces.insert(piece.id.clone(), piece);
        Ok(())
    }

    pub fn piece(&self, id: &PieceId) -> Option<&Piece> {
        self.pieces.get(id)
    }

    pub fn pieces(&self, filter: Option<&[PieceId]>) -> Vec<&Piece> {
        self.pieces
            .values()
            .filter(|piece| match filter {
                Some(ids) => ids.contains(&piece.id),
                None => true,
            })
            .collect()
    }

    pub fn delete_piece(&mut self, id: &PieceId) -> Result<(), StoreError> {
        self.pieces
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::UnknownPiece(id.clone()))
    }

    // === Board setups ===

    /// Create or replace a board setup. Placements must reference known
    /// pieces and stay on the board.
    pub fn save_board(&mut self, board: BoardSetup) -> Result<(), StoreError> {
        for placement in &board.placements {
            if !self.pieces.contains_key(&placement.piece) {
                return Err(StoreError::UnknownPiece(placement.piece.clone()));
            }
            if !placement.loc().in_bounds() {
                return Err(StoreError::InvalidPlacement {
                    piece: placement.piece.clone(),
                    loc: placement.loc(),
                });
            }
        }
        debug!(board = %board.id, "board setup saved");
        self.boards.insert(board.id.clone(), board);
        Ok(())
    }

    pub fn board(&self, id: &BoardId) -> Option<&BoardSetup> {
        self.boards.get(id)
    }

    pub fn boards(&self, filter: Option<&[BoardId]>) -> Vec<&BoardSetup> {
        self.boards
            .values()
            .filter(|board| match filter {
                Some(ids) => ids.contains(&board.id),
                None => true,
            })
            .collect()
    }

    pub fn delete_board(&mut self, id: &BoardId) -> Result<(), StoreError> {
        self.boards
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::UnknownBoard(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MoveGrid;
    use crate::official::official_registry;
    use crate::types::{Team, WinCondition};
    use gambit_dsl::MoveCategory;

    fn piece_with_grid(id: &str, move_id: &MoveId) -> Piece {
        let mut moves = MoveGrid::new();
        moves.place(1, 0, Some(move_id.clone())).unwrap();
        Piece {
            id: PieceId::from(id),
            name: id.to_string(),
            image_white: String::new(),
            image_black: String::new(),
            moves,
            author: None,
            immunities: Vec::new(),
        }
    }

    #[test]
    fn test_piece_grid_must_reference_playable_moves() {
        let mut workshop = Workshop::with_registry(official_registry());

        // a definition with no implementation is browsable but unusable
        workshop
            .create_move(MoveDefinition {
                id: MoveId::from("custom:wip"),
                name: "workInProgress".to_string(),
                overview: String::new(),
                description: String::new(),
                color: [1, 2, 3],
                symbol: "+".to_string(),
                category: MoveCategory::Custom,
                author: Some("alice".to_string()),
                implementation: None,
            })
            .unwrap();

        let err = workshop
            .save_piece(piece_with_grid("pawnish", &MoveId::from("custom:wip")))
            .unwrap_err();
        assert_eq!(err, StoreError::UnplayableMove(MoveId::from("custom:wip")));

        workshop
            .save_piece(piece_with_grid("pawnish", &MoveId::from("official:slide")))
            .unwrap();
    }

    #[test]
    fn test_unknown_move_reference_is_rejected() {
        let mut workshop = Workshop::with_registry(official_registry());
        let err = workshop
            .save_piece(piece_with_grid("ghost", &MoveId::from("missing")))
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownMove(MoveId::from("missing")));
    }

    #[test]
    fn test_board_placements_are_validated() {
        let mut workshop = Workshop::with_registry(official_registry());
        workshop
            .save_piece(piece_with_grid("pawnish", &MoveId::from("official:slide")))
            .unwrap();

        let board = BoardSetup {
            id: BoardId::from("b1"),
            name: "test".to_string(),
            author: None,
            placements: vec![crate::piece::Placement {
                row: 9,
                col: 0,
                piece: PieceId::from("pawnish"),
                team: Team::White,
                is_royal: false,
            }],
            wincon_white: WinCondition::AllPiecesCaptured,
            wincon_black: WinCondition::AllPiecesCaptured,
        };
        assert!(workshop.save_board(board).is_err());
    }

    #[test]
    fn test_list_reads_support_id_filters() {
        let mut workshop = Workshop::with_registry(official_registry());
        workshop
            .save_piece(piece_with_grid("a", &MoveId::from("official:slide")))
            .unwrap();
        workshop
            .save_piece(piece_with_grid("b", &MoveId::from("official:slide")))
            .unwrap();

        assert_eq!(workshop.pieces(None).len(), 2);
        let filtered = workshop.pieces(Some(&[PieceId::from("b")]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, PieceId::from("b"));

        let moves = workshop.moves(Some(&[MoveId::from("official:slide")]));
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn test_delete() {
        let mut workshop = Workshop::with_registry(official_registry());
        workshop
            .save_piece(piece_with_grid("a", &MoveId::from("official:slide")))
            .unwrap();
        workshop.delete_piece(&PieceId::from("a")).unwrap();
        assert!(workshop.delete_piece(&PieceId::from("a")).is_err());
    }
}
