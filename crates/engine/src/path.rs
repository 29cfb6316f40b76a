//! Straight-line path resolver
//!
//! Orthogonal and diagonal paths share one stepping rule: step by the sign
//! of each delta until the target is reached. Anything else is a caller
//! error; the resolver rejects it rather than looping.

use crate::error::PathError;
use crate::types::Loc;

/// Ordered tiles on the line from `from` to `to`, inclusive by default.
///
/// `begin_exclusive` / `end_exclusive` drop the first / last tile. The two
/// endpoints must share a rank, file or diagonal.
pub fn path(
    from: Loc,
    to: Loc,
    begin_exclusive: bool,
    end_exclusive: bool,
) -> Result<Vec<Loc>, PathError> {
    let (d_row, d_col) = from.delta_to(to);
    let straight = d_row == 0 || d_col == 0 || d_row.abs() == d_col.abs();
    if !straight {
        return Err(PathError::NotColinear { from, to });
    }

    let step = (d_row.signum(), d_col.signum());
    let mut tiles = vec![from];
    let mut current = from;
    while current != to {
        current = Loc::new(current.row + step.0, current.col + step.1);
        tiles.push(current);
    }

    if end_exclusive {
        tiles.pop();
    }
    if begin_exclusive && !tiles.is_empty() {
        tiles.remove(0);
    }
    Ok(tiles)
}
