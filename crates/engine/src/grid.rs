//! Relative move grid
//!
//! A 15×15 table indexed by (Δrow, Δcol) relative to the acting piece. The
//! center cell is the piece itself and is never assignable. Writes go
//! through one entry point that also writes the horizontal mirror cell,
//! modeling the bilateral symmetry of piece design; this is an authoring
//! convenience, not something move execution re-checks.

use serde::{Deserialize, Serialize};

use gambit_dsl::MoveId;

use crate::error::GridError;
use crate::types::Team;

/// Grid side length; offsets range over -7..=7
pub const GRID_SIZE: i32 = 15;
/// Table index of the Δ=0 cell
pub const GRID_CENTER: i32 = 7;

/// Per-piece table mapping relative offsets to move definitions.
///
/// Serialized sparsely as `{relative_row, relative_col, move}` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<GridEntry>", into = "Vec<GridEntry>")]
pub struct MoveGrid {
    cells: Vec<Option<MoveId>>,
}

/// Wire form of one occupied grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridEntry {
    pub relative_row: i32,
    pub relative_col: i32,
    #[serde(rename = "move")]
    pub move_id: MoveId,
}

impl Default for MoveGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveGrid {
    pub fn new() -> Self {
        Self {
            cells: vec![None; (GRID_SIZE * GRID_SIZE) as usize],
        }
    }

    fn index(d_row: i32, d_col: i32) -> Option<usize> {
        let row = d_row + GRID_CENTER;
        let col = d_col + GRID_CENTER;
        if (0..GRID_SIZE).contains(&row) && (0..GRID_SIZE).contains(&col) {
            Some((row * GRID_SIZE + col) as usize)
        } else {
            None
        }
    }

    /// Write a cell and its horizontal mirror (Δrow, −Δcol).
    ///
    /// The center cell (0, 0) is rejected; it always denotes "self".
    pub fn place(
        &mut self,
        d_row: i32,
        d_col: i32,
        move_id: Option<MoveId>,
    ) -> Result<(), GridError> {
        if d_row == 0 && d_col == 0 {
            return Err(GridError::CenterCell);
        }
        let index = Self::index(d_row, d_col).ok_or(GridError::OutOfRange(d_row, d_col))?;
        let mirror = Self::index(d_row, -d_col).expect("mirror of an in-range offset");
        self.cells[index] = move_id.clone();
        self.cells[mirror] = move_id;
        Ok(())
    }

    /// The move a piece may use for the given displacement.
    ///
    /// White and black face opposite directions, so Δrow is negated for
    /// black: "forward" is always toward the opponent.
    pub fn moves_at(&self, d_row: i32, d_col: i32, team: Team) -> Option<&MoveId> {
        let d_row = match team {
            Team::White => d_row,
            Team::Black => -d_row,
        };
        Self::index(d_row, d_col)
            .and_then(|i| self.cells[i].as_ref())
    }

    /// Occupied cells as (Δrow, Δcol, move).
    pub fn entries(&self) -> impl Iterator<Item = (i32, i32, &MoveId)> {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            cell.as_ref().map(|id| {
                let row = i as i32 / GRID_SIZE - GRID_CENTER;
                let col = i as i32 % GRID_SIZE - GRID_CENTER;
                (row, col, id)
            })
        })
    }
}

impl From<Vec<GridEntry>> for MoveGrid {
    fn from(entries: Vec<GridEntry>) -> Self {
        let mut grid = MoveGrid::new();
        for entry in entries {
            if let Some(index) = Self::index(entry.relative_row, entry.relative_col) {
                if entry.relative_row != 0 || entry.relative_col != 0 {
                    grid.cells[index] = Some(entry.move_id);
                }
            }
        }
        grid
    }
}

impl From<MoveGrid> for Vec<GridEntry> {
    fn from(grid: MoveGrid) -> Self {
        grid.entries()
            .map(|(relative_row, relative_col, id)| GridEntry {
                relative_row,
                relative_col,
                move_id: id.clone(),
            })
            .collect()
    }
}
