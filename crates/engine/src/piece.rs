//! Piece designs and board setups
//!
//! Pure data at the persistence boundary. A piece's sprites are opaque
//! handles (data URLs in practice); the engine never looks inside them.

use serde::{Deserialize, Serialize};

use crate::grid::MoveGrid;
use crate::types::{BoardId, Immunity, Loc, PieceId, Team, WinCondition};

/// A designed piece
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub name: String,
    pub image_white: String,
    pub image_black: String,
    #[serde(rename = "piece_moves")]
    pub moves: MoveGrid,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub immunities: Vec<Immunity>,
}

/// One occupied starting square of a board setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub row: i32,
    pub col: i32,
    pub piece: PieceId,
    pub team: Team,
    pub is_royal: bool,
}

impl Placement {
    pub fn loc(&self) -> Loc {
        Loc::new(self.row, self.col)
    }
}

/// A named starting position plus per-team win conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSetup {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(rename = "piece_locations")]
    pub placements: Vec<Placement>,
    pub wincon_white: WinCondition,
    pub wincon_black: WinCondition,
}
