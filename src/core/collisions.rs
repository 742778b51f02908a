//! Collision resolver - per-tick adjacency checks for the active piece.
//!
//! For every non-empty cell of the piece the cell one column left, one
//! column right and one row below is checked against solid cells and the
//! board edges. A tripped direction flags the whole piece (rigid-body
//! semantics, not per-cell).

use crate::core::board::Board;
use crate::core::piece::Piece;

/// Collision flags for the active piece plus the ground-contact counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collisions {
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
    /// Consecutive ticks the piece has rested on the ground. Resets to 0
    /// on any tick without bottom contact.
    pub ground_ticks: u32,
}

impl Collisions {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset_flags(&mut self) {
        self.bottom = false;
        self.left = false;
        self.right = false;
    }

    /// Recompute the flags for `piece` against `board` and advance the
    /// ground-contact counter.
    pub fn update(&mut self, piece: Option<&Piece>, board: &Board) {
        self.reset_flags();
        let Some(piece) = piece else {
            self.ground_ticks = 0;
            return;
        };
        for (y, row) in piece.tiles.iter().enumerate() {
            let grid_y = piece.y + y as i32;
            let below = grid_y + 1;
            for (x, &tile) in row.iter().enumerate() {
                let grid_x = piece.x + x as i32;
                if tile > 0 {
                    let left = grid_x - 1;
                    if board.occupied(left, grid_y) || left == -1 {
                        self.left = true;
                    }
                    let right = grid_x + 1;
                    if board.occupied(right, grid_y) || right == board.width() {
                        self.right = true;
                    }
                    if board.occupied(grid_x, below) || below == board.height() {
                        self.bottom = true;
                    }
                }
            }
        }
        if self.bottom {
            self.ground_ticks += 1;
        } else {
            self.ground_ticks = 0;
        }
    }
}
