//! Board module - the shared grid of permanently placed cells.
//!
//! Uses a flat row-major grid: O(1) cell lookup, one allocation, and the
//! clear scan is a straight pass over rows. Coordinates are (x, y) with
//! x in 0..width left to right and y in 0..height top to bottom; active
//! pieces may sit at negative y above the visible board.

use crate::core::piece::Piece;
use crate::types::{Tile, TileMatrix};

/// The shared game board. Dimensions are fixed once a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: i32,
    height: i32,
    /// Flat array of cells, row-major order (y * width + x)
    cells: Vec<Tile>,
}

impl Board {
    /// Create a new empty board
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "board dimensions must be positive");
        Self {
            width,
            height,
            cells: vec![0; (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    /// Get the tile at (x, y). Out-of-bounds positions read as empty.
    pub fn tile(&self, x: i32, y: i32) -> Tile {
        self.index(x, y).map_or(0, |idx| self.cells[idx])
    }

    /// Whether a solid cell occupies (x, y).
    pub fn occupied(&self, x: i32, y: i32) -> bool {
        self.tile(x, y) > 0
    }

    /// Set the tile at (x, y). Out-of-bounds writes are dropped.
    pub fn set(&mut self, x: i32, y: i32, tile: Tile) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = tile;
        }
    }

    /// Resize the board and discard all solid state.
    pub fn resize(&mut self, width: i32, height: i32) {
        assert!(width > 0 && height > 0, "board dimensions must be positive");
        self.width = width;
        self.height = height;
        self.cells = vec![0; (width * height) as usize];
    }

    /// Clear all solid state between sessions.
    pub fn reset(&mut self) {
        self.cells.fill(0);
    }

    /// Whether the given tile structure placed at (at_x, at_y) would
    /// overlap a solid cell or leave the board on the sides or bottom.
    ///
    /// Rows above the board (negative y) are never obstructed, so pieces
    /// can spawn and move above the ceiling. This single predicate backs
    /// movement, rotation validation and spawn placement alike.
    pub fn obstructed(&self, tiles: &TileMatrix, at_x: i32, at_y: i32) -> bool {
        for (y, row) in tiles.iter().enumerate() {
            let grid_y = at_y + y as i32;
            for (x, &tile) in row.iter().enumerate() {
                let grid_x = at_x + x as i32;
                if tile > 0 {
                    if grid_x < 0 || grid_x >= self.width {
                        return true;
                    }
                    if grid_y >= self.height {
                        return true;
                    }
                    if self.occupied(grid_x, grid_y) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Merge a frozen piece's tiles into the solid cells.
    ///
    /// Returns true if the merged piece breaches the ceiling, i.e. any
    /// tile lands on or above row 0. The caller treats that as game over.
    pub fn solidify(&mut self, piece: &Piece) -> bool {
        let mut breached = false;
        for (y, row) in piece.tiles.iter().enumerate() {
            let grid_y = piece.y + y as i32;
            for (x, &tile) in row.iter().enumerate() {
                let grid_x = piece.x + x as i32;
                if tile > 0 {
                    if grid_y <= 0 {
                        breached = true;
                    }
                    self.set(grid_x, grid_y, tile);
                }
            }
        }
        breached || piece.at_limit()
    }

    /// Scan for full rows, clear them and compact the grid.
    ///
    /// A row is full iff its non-empty cell count equals the width.
    /// Rows are collected and cleared in ascending order, shifting
    /// everything above each cleared row down by one row at a time so
    /// stacked clears cascade instead of jumping by a fixed amount.
    ///
    /// Returns the cleared row indices in ascending order.
    pub fn scan_and_clear(&mut self) -> Vec<i32> {
        let mut cleared = Vec::new();
        for y in 0..self.height {
            let start = (y * self.width) as usize;
            let end = start + self.width as usize;
            let filled = self.cells[start..end].iter().filter(|&&t| t > 0).count();
            if filled as i32 == self.width {
                cleared.push(y);
                self.clear_row(y);
            }
        }
        cleared
    }

    /// Remove one row and shift every row above it down by one.
    fn clear_row(&mut self, y: i32) {
        let width = self.width as usize;
        for row in (1..=y as usize).rev() {
            let src = (row - 1) * width;
            let dst = row * width;
            self.cells.copy_within(src..src + width, dst);
        }
        self.cells[..width].fill(0);
    }

    /// Count of non-empty cells on the whole board.
    pub fn filled_cells(&self) -> usize {
        self.cells.iter().filter(|&&t| t > 0).count()
    }

    /// Serialize the solid cells as fixed-width digit strings, one per
    /// row, for the bulk-map resync packet.
    pub fn rows_as_digits(&self) -> Vec<String> {
        (0..self.height)
            .map(|y| {
                let start = (y * self.width) as usize;
                let end = start + self.width as usize;
                self.cells[start..end]
                    .iter()
                    .map(|&t| char::from_digit(u32::from(t) % 10, 10).unwrap_or('0'))
                    .collect()
            })
            .collect()
    }
}
