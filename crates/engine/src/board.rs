//! Live board state
//!
//! An 8×8 grid of unit instances. The executor clones the board as its
//! scratch copy, so `Board` is plain data with value semantics; equality
//! compares every tile, which the rollback tests rely on.

use serde::{Deserialize, Serialize};

use crate::types::{Immunity, Loc, PieceId, Team, UnitId, BOARD_SIZE};

/// One unit standing on the board.
///
/// Carries a snapshot of the piece fields the engine needs; edits to the
/// piece design after game creation are invisible here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInstance {
    pub id: UnitId,
    pub piece: PieceId,
    pub team: Team,
    pub is_royal: bool,
    pub immunities: Vec<Immunity>,
}

impl UnitInstance {
    pub fn is_immune_to(&self, immunity: Immunity) -> bool {
        self.immunities.contains(&immunity)
    }
}

/// An 8×8 board of optional units, row-major
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Board {
    tiles: Vec<Option<UnitInstance>>,
}

impl Board {
    pub fn new() -> Self {
        Self {
            tiles: vec![None; (BOARD_SIZE * BOARD_SIZE) as usize],
        }
    }

    fn index(loc: Loc) -> Option<usize> {
        loc.in_bounds()
            .then(|| (loc.row * BOARD_SIZE + loc.col) as usize)
    }

    /// Unit at a location; `None` for empty tiles and off-board locations.
    pub fn get(&self, loc: Loc) -> Option<&UnitInstance> {
        Self::index(loc).and_then(|i| self.tiles[i].as_ref())
    }

    /// Write a tile. Off-board writes are ignored; callers bounds-check.
    pub fn set(&mut self, loc: Loc, unit: Option<UnitInstance>) {
        if let Some(i) = Self::index(loc) {
            self.tiles[i] = unit;
        }
    }

    /// Where a unit instance currently stands.
    ///
    /// If an action transiently duplicated the instance via unit
    /// assignments, the first occurrence in row-major order wins.
    pub fn find(&self, id: UnitId) -> Option<Loc> {
        self.units().find(|(_, u)| u.id == id).map(|(loc, _)| loc)
    }

    /// All occupied tiles in row-major order.
    pub fn units(&self) -> impl Iterator<Item = (Loc, &UnitInstance)> {
        self.tiles.iter().enumerate().filter_map(|(i, tile)| {
            tile.as_ref().map(|unit| {
                (
                    Loc::new(i as i32 / BOARD_SIZE, i as i32 % BOARD_SIZE),
                    unit,
                )
            })
        })
    }

    pub fn team_units(&self, team: Team) -> impl Iterator<Item = (Loc, &UnitInstance)> {
        self.units().filter(move |(_, u)| u.team == team)
    }

    pub fn royal_count(&self, team: Team) -> usize {
        self.team_units(team).filter(|(_, u)| u.is_royal).count()
    }
}
