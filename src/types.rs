//! Core types shared across the application
//! This module contains pure data types with no external dependencies

use serde::{Deserialize, Serialize};

/// A single board cell. `0` is empty, any other value is a tile type.
pub type Tile = u8;

/// A square matrix of tiles making up one shape.
pub type TileMatrix = Vec<Vec<Tile>>;

/// Default board dimensions (columns x rows)
pub const DEFAULT_BOARD_WIDTH: i32 = 12;
pub const DEFAULT_BOARD_HEIGHT: i32 = 22;

/// Default simulation timing (ticks unless noted)
pub const DEFAULT_TICK_MS: u64 = 200;
pub const DEFAULT_MOVE_DELAY: u32 = 1;
pub const DEFAULT_LOCK_DELAY: u32 = 5;
pub const DEFAULT_SPAWN_DELAY: u32 = 3;
pub const DEFAULT_START_DELAY: u32 = 50;

/// Default control-swap reassignment window (ticks)
pub const DEFAULT_SWAP_MIN: u32 = 50;
pub const DEFAULT_SWAP_MAX: u32 = 150;

/// Default session requirements
pub const DEFAULT_MIN_PLAYERS: usize = 2;

/// Default connection inactivity timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Identifier assigned to a participant when their join is accepted.
///
/// Allocation is a plain monotonic counter owned by the server task; the
/// simulation core only ever compares and routes on the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A joined participant as the simulation sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
}

/// Movement intent keys accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKey {
    Left,
    Right,
    Down,
    Rotate,
}

impl InputKey {
    /// Parse an input key from its wire string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "left" => Some(InputKey::Left),
            "right" => Some(InputKey::Right),
            "down" => Some(InputKey::Down),
            "rotate" => Some(InputKey::Rotate),
            _ => None,
        }
    }

    /// Convert to the wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKey::Left => "left",
            InputKey::Right => "right",
            InputKey::Down => "down",
            InputKey::Rotate => "rotate",
        }
    }
}
