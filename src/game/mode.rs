//! Control policy seam.
//!
//! A session drives exactly one [`GameMode`]. The mode decides who may
//! steer which piece and how pieces spawn; the session owns the board,
//! the RNG, the roster and the outbox and lends them to the mode each
//! call through a [`ModeContext`].

use crate::config::GameConfig;
use crate::core::{score_for_clear, Board, LockOutcome, Piece, SimpleRng};
use crate::game::Outbox;
use crate::net::protocol::ServerPacket;
use crate::types::{InputKey, PlayerId, PlayerInfo, TileMatrix};

/// Whether the session keeps running after a mode callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeStatus {
    Continue,
    /// The mode wants the session torn down (board full, nobody left).
    Stop,
}

/// Borrowed session state handed to every mode callback.
pub struct ModeContext<'a> {
    pub board: &'a mut Board,
    pub rng: &'a mut SimpleRng,
    pub config: &'a GameConfig,
    /// Joined participants, in join order.
    pub roster: &'a [PlayerInfo],
    pub outbox: &'a mut Outbox,
}

/// A control policy: who steers which piece, and when pieces spawn.
pub trait GameMode {
    /// Session transitioned to playing; set up per-participant state.
    fn start(&mut self, ctx: &mut ModeContext<'_>);

    /// One simulation tick while playing.
    fn update(&mut self, ctx: &mut ModeContext<'_>) -> ModeStatus;

    /// Session is stopping; drop per-participant state.
    fn stop(&mut self, ctx: &mut ModeContext<'_>);

    /// A movement intent arrived from `player`. Modes enforce their own
    /// control rules and silently drop inputs from non-controllers.
    fn input(&mut self, ctx: &mut ModeContext<'_>, player: PlayerId, key: InputKey);

    /// `player` joined mid-session.
    fn player_joined(&mut self, ctx: &mut ModeContext<'_>, player: &PlayerInfo);

    /// `player` left mid-session (already removed from the roster).
    fn player_left(&mut self, ctx: &mut ModeContext<'_>, player: PlayerId) -> ModeStatus;

    /// Current pooled session score.
    fn score(&self) -> u32;
}

/// Publish the observable consequences of a lock: cleared rows in
/// ascending order, then the canonical board resync, then the score
/// delta when rows were cleared.
pub(crate) fn publish_lock(
    board: &Board,
    outbox: &mut Outbox,
    score: &mut u32,
    outcome: &LockOutcome,
) {
    for &y in &outcome.cleared {
        outbox.broadcast(ServerPacket::RowCleared { y });
    }
    outbox.broadcast(ServerPacket::BulkMap {
        lines: board.rows_as_digits(),
    });
    if !outcome.cleared.is_empty() {
        *score += score_for_clear(outcome.cleared.len());
        outbox.broadcast(ServerPacket::ScoreUpdate { score: *score });
    }
}

/// Build a piece anchored fully above the visible board at `column`.
pub(crate) fn spawn_at(column: i32, tiles: TileMatrix) -> Piece {
    let size = tiles.len() as i32;
    Piece::new(column, -size, tiles)
}

/// Horizontally centered spawn column for a shape of the given size.
pub(crate) fn center_column(width: i32, size: i32) -> i32 {
    width / 2 - size / 2
}
