//! Simulation configuration.
//!
//! The core never parses anything itself: timing, board sizing and policy
//! selection are resolved here (defaults or environment) and handed in as
//! plain values.

use crate::types::*;

/// Which control policy a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// One shared piece; control rotates between participants.
    ControlSwap,
    /// One independently falling piece per participant on a shared board.
    Teamwork,
}

impl ModeKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "controlswap" | "control-swap" | "swap" => Some(ModeKind::ControlSwap),
            "teamwork" | "team" => Some(ModeKind::Teamwork),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModeKind::ControlSwap => "control-swap",
            ModeKind::Teamwork => "teamwork",
        }
    }
}

/// Tuning values consumed by the simulation core.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    /// Fixed scheduler period in milliseconds.
    pub tick_ms: u64,
    /// Ticks between gravity steps of the active piece.
    pub move_delay: u32,
    /// Grounded ticks before a piece solidifies.
    pub lock_delay: u32,
    /// Ticks between a lock and the next spawn.
    pub spawn_delay: u32,
    /// Ticks of countdown before a session starts.
    pub start_delay: u32,
    /// Participants required to start (and keep running) a session.
    pub min_players: usize,
    /// Control-swap reassignment window, inclusive tick bounds.
    pub swap_min: u32,
    pub swap_max: u32,
    pub mode: ModeKind,
    /// Seed for the deterministic RNG (shape draws, swap intervals, spawn columns).
    pub seed: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BOARD_WIDTH,
            height: DEFAULT_BOARD_HEIGHT,
            tick_ms: DEFAULT_TICK_MS,
            move_delay: DEFAULT_MOVE_DELAY,
            lock_delay: DEFAULT_LOCK_DELAY,
            spawn_delay: DEFAULT_SPAWN_DELAY,
            start_delay: DEFAULT_START_DELAY,
            min_players: DEFAULT_MIN_PLAYERS,
            swap_min: DEFAULT_SWAP_MIN,
            swap_max: DEFAULT_SWAP_MAX,
            mode: ModeKind::ControlSwap,
            seed: 1,
        }
    }
}

impl GameConfig {
    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(key: &str, default: T) -> T {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        }

        let defaults = Self::default();
        let mode = std::env::var("GRIDLOCK_MODE")
            .ok()
            .and_then(|s| ModeKind::from_str(&s))
            .unwrap_or(defaults.mode);

        Self {
            // Shapes are up to 4 cells wide, so smaller boards can
            // never host a spawn.
            width: var("GRIDLOCK_WIDTH", defaults.width).max(4),
            height: var("GRIDLOCK_HEIGHT", defaults.height).max(4),
            tick_ms: var("GRIDLOCK_TICK_MS", defaults.tick_ms).max(1),
            move_delay: var("GRIDLOCK_MOVE_DELAY", defaults.move_delay),
            lock_delay: var("GRIDLOCK_LOCK_DELAY", defaults.lock_delay),
            spawn_delay: var("GRIDLOCK_SPAWN_DELAY", defaults.spawn_delay),
            start_delay: var("GRIDLOCK_START_DELAY", defaults.start_delay),
            min_players: var("GRIDLOCK_MIN_PLAYERS", defaults.min_players),
            swap_min: var("GRIDLOCK_SWAP_MIN", defaults.swap_min),
            swap_max: var("GRIDLOCK_SWAP_MAX", defaults.swap_max),
            mode,
            seed: var("GRIDLOCK_SEED", seed_from_clock()),
        }
    }
}

/// Non-deterministic fallback seed when none is configured.
fn seed_from_clock() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(1)
}
