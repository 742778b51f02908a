//! Core module - pure, deterministic simulation logic
//!
//! Contains the board, pieces, collision resolution, the movement state
//! machine and scoring. It has zero dependencies on networking or I/O:
//! the same seed and the same inputs produce the same session.

pub mod board;
pub mod collisions;
pub mod controller;
pub mod piece;
pub mod rng;
pub mod scoring;
pub mod shapes;

pub use board::Board;
pub use collisions::Collisions;
pub use controller::{Controller, ControllerEvent, LockOutcome, TickEvents};
pub use piece::{rotate_matrix, Piece};
pub use rng::SimpleRng;
pub use scoring::score_for_clear;
pub use shapes::{random_shape, shape, SHAPE_COUNT};
