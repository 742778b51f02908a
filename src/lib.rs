//! Server-authoritative multiplayer falling-block puzzle.
//!
//! All participants share one board. The simulation advances on a fixed
//! tick; clients only ever send movement intents and receive committed
//! state changes back, so the server remains the single source of truth.
//!
//! Layering, lowest first:
//! - [`types`] and [`config`]: plain data, no I/O
//! - [`core`]: deterministic simulation (board, pieces, collisions)
//! - [`game`]: session lifecycle and control policies
//! - [`net`]: JSON wire protocol and the TCP front end

pub mod config;
pub mod core;
pub mod game;
pub mod net;
pub mod types;
