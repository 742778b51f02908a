//! Piece module - a transient falling shape.
//!
//! A piece is a square tile matrix anchored at a board position. Pieces
//! spawn above the visible board (negative `y`), move and rotate each
//! tick, and are merged into the board's solid cells on lock.

use crate::types::{Tile, TileMatrix};

/// An active, movable shape before it locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    /// Anchor column of the matrix's top-left corner.
    pub x: i32,
    /// Anchor row of the matrix's top-left corner. May be negative at spawn.
    pub y: i32,
    /// Square matrix of tile values; 0 is empty.
    pub tiles: TileMatrix,
    /// Whether the piece has been frozen into permanent board state.
    pub solid: bool,
}

impl Piece {
    pub fn new(x: i32, y: i32, tiles: TileMatrix) -> Self {
        Self {
            x,
            y,
            tiles,
            solid: false,
        }
    }

    /// Side length of the tile matrix.
    pub fn size(&self) -> usize {
        self.tiles.len()
    }

    /// Return a new piece at the same anchor with the tiles rotated
    /// 90 degrees clockwise.
    ///
    /// Non-destructive: the caller must validate the rotated shape
    /// against the board before committing it.
    pub fn rotate(&self) -> Piece {
        Piece::new(self.x, self.y, rotate_matrix(&self.tiles))
    }

    /// Whether the absolute position (x, y) falls inside this piece's
    /// bounding square and hits a non-empty cell.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let size = self.size() as i32 - 1;
        if x >= self.x && y >= self.y && x <= self.x + size && y <= self.y + size {
            let rel_x = (x - self.x) as usize;
            let rel_y = (y - self.y) as usize;
            return self.tiles[rel_y][rel_x] > 0;
        }
        false
    }

    /// Whether the piece's top row holds a tile while anchored at the
    /// ceiling. Signals board-full when true at lock time.
    pub fn at_limit(&self) -> bool {
        self.y == 0 && self.tiles[0].iter().any(|&tile| tile > 0)
    }

    /// Deep-copy the piece and mark it solid, ready to be merged into
    /// the board's permanent cells.
    pub fn freeze(&self) -> Piece {
        Piece {
            x: self.x,
            y: self.y,
            tiles: self.tiles.clone(),
            solid: true,
        }
    }

    /// Whether any cell is still non-empty.
    pub fn has_tiles(&self) -> bool {
        self.tiles.iter().flatten().any(|&tile| tile > 0)
    }
}

/// Rotate a square matrix 90 degrees clockwise.
pub fn rotate_matrix(tiles: &TileMatrix) -> TileMatrix {
    let size = tiles.len();
    let mut rotated: TileMatrix = vec![vec![0 as Tile; size]; size];
    for (y, row) in tiles.iter().enumerate() {
        for (x, &tile) in row.iter().enumerate() {
            rotated[x][size - 1 - y] = tile;
        }
    }
    rotated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_matrix_clockwise() {
        let tiles = vec![vec![1, 0], vec![1, 1]];
        assert_eq!(rotate_matrix(&tiles), vec![vec![1, 1], vec![1, 0]]);
    }

    #[test]
    fn test_four_rotations_are_identity() {
        let tiles = vec![vec![0, 4, 0], vec![0, 4, 0], vec![0, 4, 4]];
        let mut rotated = tiles.clone();
        for _ in 0..4 {
            rotated = rotate_matrix(&rotated);
        }
        assert_eq!(rotated, tiles);
    }

    #[test]
    fn test_rotate_preserves_anchor() {
        let piece = Piece::new(3, -2, vec![vec![1, 0], vec![1, 1]]);
        let rotated = piece.rotate();
        assert_eq!((rotated.x, rotated.y), (3, -2));
        assert!(!rotated.solid);
    }

    #[test]
    fn test_contains_relative_lookup() {
        let piece = Piece::new(4, 2, vec![vec![0, 1], vec![1, 1]]);
        assert!(!piece.contains(4, 2)); // empty corner
        assert!(piece.contains(5, 2));
        assert!(piece.contains(4, 3));
        assert!(!piece.contains(6, 2)); // outside bounding square
        assert!(!piece.contains(3, 3));
    }

    #[test]
    fn test_at_limit_requires_top_row_tile_at_ceiling() {
        let topped = Piece::new(0, 0, vec![vec![0, 2], vec![2, 2]]);
        assert!(topped.at_limit());

        let below = Piece::new(0, 1, vec![vec![0, 2], vec![2, 2]]);
        assert!(!below.at_limit());

        let hollow_top = Piece::new(0, 0, vec![vec![0, 0], vec![2, 2]]);
        assert!(!hollow_top.at_limit());
    }

    #[test]
    fn test_freeze_deep_copies() {
        let piece = Piece::new(1, 1, vec![vec![3]]);
        let mut frozen = piece.freeze();
        assert!(frozen.solid);
        frozen.tiles[0][0] = 0;
        assert_eq!(piece.tiles[0][0], 3);
    }
}
