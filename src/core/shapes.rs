//! Canonical tile matrices for the spawnable shapes.
//!
//! Each shape is a square matrix; the value doubles as the tile type on
//! the board and in bulk-map serialization.

use crate::core::rng::SimpleRng;
use crate::types::{Tile, TileMatrix};

const SHAPES: [&[&[Tile]]; 6] = [
    &[
        &[1, 1], //
        &[1, 1],
    ],
    &[
        &[2, 2, 2, 2],
        &[0, 0, 0, 0],
        &[0, 0, 0, 0],
        &[0, 0, 0, 0],
    ],
    &[
        &[0, 3, 0], //
        &[3, 3, 3],
        &[0, 0, 0],
    ],
    &[
        &[0, 4, 0], //
        &[0, 4, 0],
        &[0, 4, 4],
    ],
    &[
        &[5, 0, 0], //
        &[5, 5, 0],
        &[0, 5, 0],
    ],
    &[
        &[0, 6, 0], //
        &[6, 6, 0],
        &[6, 0, 0],
    ],
];

/// Number of distinct spawnable shapes.
pub const SHAPE_COUNT: usize = SHAPES.len();

/// Build the tile matrix for a shape index.
///
/// Panics if `index >= SHAPE_COUNT`; callers draw indices from
/// [`random_shape`] or iterate `0..SHAPE_COUNT`.
pub fn shape(index: usize) -> TileMatrix {
    SHAPES[index].iter().map(|row| row.to_vec()).collect()
}

/// Draw a random shape matrix.
pub fn random_shape(rng: &mut SimpleRng) -> TileMatrix {
    shape(rng.next_range(SHAPE_COUNT as u32) as usize)
}
