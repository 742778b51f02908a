//! Game module - the session lifecycle and its control policies.
//!
//! A session moves through waiting -> countdown -> playing and back.
//! All simulation state is owned by one task; modes communicate with
//! the outside world exclusively through queued outbound packets, so
//! the whole layer stays synchronous and deterministic under test.

pub mod control_swap;
pub mod mode;
pub mod teamwork;

pub use control_swap::ControlSwap;
pub use mode::{GameMode, ModeContext, ModeStatus};
pub use teamwork::Teamwork;

use crate::config::{GameConfig, ModeKind};
use crate::core::{Board, SimpleRng};
use crate::net::protocol::ServerPacket;
use crate::types::{InputKey, PlayerId, PlayerInfo};

/// Who a queued packet is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Except(PlayerId),
    One(PlayerId),
}

/// Outbound packet queue filled during a tick and drained by the
/// network layer afterwards.
#[derive(Debug, Default)]
pub struct Outbox {
    queued: Vec<(Target, ServerPacket)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast(&mut self, packet: ServerPacket) {
        self.queued.push((Target::All, packet));
    }

    pub fn to(&mut self, player: PlayerId, packet: ServerPacket) {
        self.queued.push((Target::One(player), packet));
    }

    pub fn except(&mut self, player: PlayerId, packet: ServerPacket) {
        self.queued.push((Target::Except(player), packet));
    }

    pub fn drain(&mut self) -> Vec<(Target, ServerPacket)> {
        std::mem::take(&mut self.queued)
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not enough participants yet.
    Waiting,
    /// Enough participants; counting down `updates` ticks to start.
    Countdown { updates: u32 },
    Playing,
}

/// One game session: board, RNG, lifecycle state and the active policy.
pub struct Game {
    config: GameConfig,
    board: Board,
    rng: SimpleRng,
    mode: Box<dyn GameMode + Send>,
    state: SessionState,
    outbox: Outbox,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        let board = Board::new(config.width, config.height);
        let rng = SimpleRng::new(config.seed);
        let mode: Box<dyn GameMode + Send> = match config.mode {
            ModeKind::ControlSwap => Box::new(ControlSwap::new()),
            ModeKind::Teamwork => Box::new(Teamwork::new()),
        };
        Self {
            config,
            board,
            rng,
            mode,
            state: SessionState::Waiting,
            outbox: Outbox::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started(&self) -> bool {
        self.state == SessionState::Playing
    }

    pub fn score(&self) -> u32 {
        self.mode.score()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Advance the session by one scheduler tick.
    pub fn update(&mut self, roster: &[PlayerInfo]) {
        match self.state {
            SessionState::Waiting => {
                if roster.len() >= self.config.min_players {
                    let updates = self.config.start_delay;
                    self.state = SessionState::Countdown { updates };
                    self.outbox.broadcast(ServerPacket::TimeTillStart {
                        seconds: ticks_to_seconds(updates, self.config.tick_ms),
                    });
                    tracing::info!(players = roster.len(), "starting countdown");
                }
            }
            SessionState::Countdown { updates } => {
                if roster.len() < self.config.min_players {
                    tracing::info!("countdown aborted, not enough players");
                    self.state = SessionState::Waiting;
                    return;
                }
                let updates = updates.saturating_sub(1);
                if updates == 0 {
                    self.start_session(roster);
                    return;
                }
                let before = ticks_to_seconds(updates + 1, self.config.tick_ms);
                let now = ticks_to_seconds(updates, self.config.tick_ms);
                if now != before {
                    self.outbox
                        .broadcast(ServerPacket::TimeTillStart { seconds: now });
                }
                self.state = SessionState::Countdown { updates };
            }
            SessionState::Playing => {
                if roster.len() < self.config.min_players {
                    self.stop_session(roster);
                    return;
                }
                let (mut ctx, mode) = split(self, roster);
                if mode.update(&mut ctx) == ModeStatus::Stop {
                    self.stop_session(roster);
                }
            }
        }
    }

    /// Route a movement intent to the mode. Dropped outside of play.
    pub fn input(&mut self, roster: &[PlayerInfo], player: PlayerId, key: InputKey) {
        if self.state == SessionState::Playing {
            let (mut ctx, mode) = split(self, roster);
            mode.input(&mut ctx, player, key);
        }
    }

    /// A participant joined. Mid-countdown joiners get the current
    /// remaining time; mid-session joiners get the board geometry and a
    /// full resync before the mode adds them.
    pub fn player_joined(&mut self, roster: &[PlayerInfo], player: &PlayerInfo) {
        match self.state {
            SessionState::Waiting => {}
            SessionState::Countdown { updates } => {
                self.outbox.to(
                    player.id,
                    ServerPacket::TimeTillStart {
                        seconds: ticks_to_seconds(updates, self.config.tick_ms),
                    },
                );
            }
            SessionState::Playing => {
                self.outbox.to(
                    player.id,
                    ServerPacket::MapSize {
                        width: self.config.width,
                        height: self.config.height,
                    },
                );
                self.outbox.to(
                    player.id,
                    ServerPacket::BulkMap {
                        lines: self.board.rows_as_digits(),
                    },
                );
                self.outbox.to(player.id, ServerPacket::Play);
                self.outbox.to(
                    player.id,
                    ServerPacket::ScoreUpdate {
                        score: self.mode.score(),
                    },
                );
                let (mut ctx, mode) = split(self, roster);
                mode.player_joined(&mut ctx, player);
            }
        }
    }

    /// A participant left (already removed from `roster`).
    pub fn player_left(&mut self, roster: &[PlayerInfo], player: PlayerId) {
        if self.state == SessionState::Playing {
            let status = {
                let (mut ctx, mode) = split(self, roster);
                mode.player_left(&mut ctx, player)
            };
            if status == ModeStatus::Stop {
                self.stop_session(roster);
            }
        }
    }

    /// Take every packet queued since the last drain.
    pub fn drain_outbox(&mut self) -> Vec<(Target, ServerPacket)> {
        self.outbox.drain()
    }

    fn start_session(&mut self, roster: &[PlayerInfo]) {
        self.board.reset();
        self.outbox.broadcast(ServerPacket::MapSize {
            width: self.config.width,
            height: self.config.height,
        });
        self.outbox.broadcast(ServerPacket::BulkMap {
            lines: self.board.rows_as_digits(),
        });
        self.outbox.broadcast(ServerPacket::Play);
        self.state = SessionState::Playing;
        let (mut ctx, mode) = split(self, roster);
        mode.start(&mut ctx);
        tracing::info!(mode = self.config.mode.as_str(), "session started");
    }

    fn stop_session(&mut self, roster: &[PlayerInfo]) {
        self.outbox.broadcast(ServerPacket::Stop);
        {
            let (mut ctx, mode) = split(self, roster);
            mode.stop(&mut ctx);
        }
        self.board.reset();
        self.state = SessionState::Waiting;
        tracing::info!(score = self.mode.score(), "session stopped");
    }
}

/// Borrow the session's parts disjointly: the context for the callback
/// plus the mode itself, so both can be held at once.
fn split<'a>(
    game: &'a mut Game,
    roster: &'a [PlayerInfo],
) -> (ModeContext<'a>, &'a mut (dyn GameMode + Send)) {
    let Game {
        board,
        rng,
        config,
        outbox,
        mode,
        ..
    } = game;
    (
        ModeContext {
            board,
            rng,
            config,
            roster,
            outbox,
        },
        mode.as_mut(),
    )
}

/// Remaining whole seconds for a tick counter, rounded up.
fn ticks_to_seconds(updates: u32, tick_ms: u64) -> u64 {
    (u64::from(updates) * tick_ms).div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(n: u64) -> Vec<PlayerInfo> {
        (1..=n)
            .map(|i| PlayerInfo {
                id: PlayerId(i),
                name: format!("p{i}"),
            })
            .collect()
    }

    fn config() -> GameConfig {
        GameConfig {
            start_delay: 10,
            tick_ms: 1000,
            min_players: 2,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_waiting_until_min_players() {
        let mut game = Game::new(config());
        game.update(&roster(1));
        assert_eq!(game.state(), SessionState::Waiting);
        game.update(&roster(2));
        assert_eq!(game.state(), SessionState::Countdown { updates: 10 });
    }

    #[test]
    fn test_countdown_broadcasts_seconds_and_starts() {
        let mut game = Game::new(config());
        let players = roster(2);
        game.update(&players);
        let first = game.drain_outbox();
        assert!(first
            .iter()
            .any(|(_, p)| matches!(p, ServerPacket::TimeTillStart { seconds: 10 })));

        for _ in 0..9 {
            game.update(&players);
            assert!(!game.started());
        }
        game.update(&players);
        assert!(game.started());

        let packets: Vec<_> = game.drain_outbox().into_iter().map(|(_, p)| p).collect();
        assert!(packets
            .iter()
            .any(|p| matches!(p, ServerPacket::TimeTillStart { seconds: 1 })));
        assert!(packets.iter().any(|p| matches!(p, ServerPacket::MapSize { .. })));
        assert!(packets.iter().any(|p| matches!(p, ServerPacket::BulkMap { .. })));
        assert!(packets.iter().any(|p| matches!(p, ServerPacket::Play)));
    }

    #[test]
    fn test_countdown_aborts_when_players_leave() {
        let mut game = Game::new(config());
        game.update(&roster(2));
        game.update(&roster(1));
        assert_eq!(game.state(), SessionState::Waiting);
    }

    #[test]
    fn test_session_stops_below_min_players() {
        let mut game = Game::new(config());
        let players = roster(2);
        game.update(&players);
        for _ in 0..10 {
            game.update(&players);
        }
        assert!(game.started());
        game.drain_outbox();

        game.player_left(&roster(1), PlayerId(2));
        game.update(&roster(1));
        assert_eq!(game.state(), SessionState::Waiting);
        let packets: Vec<_> = game.drain_outbox().into_iter().map(|(_, p)| p).collect();
        assert!(packets.iter().any(|p| matches!(p, ServerPacket::Stop)));
    }

    #[test]
    fn test_countdown_joiner_gets_remaining_time() {
        let mut game = Game::new(config());
        game.update(&roster(2));
        game.update(&roster(2));
        assert_eq!(game.state(), SessionState::Countdown { updates: 9 });
        game.drain_outbox();

        let joined = roster(3);
        game.player_joined(&joined, &joined[2]);
        let packets = game.drain_outbox();
        assert!(packets.iter().any(|(t, p)| {
            *t == Target::One(PlayerId(3))
                && matches!(p, ServerPacket::TimeTillStart { seconds: 9 })
        }));
    }

    #[test]
    fn test_input_dropped_while_waiting() {
        let mut game = Game::new(config());
        let players = roster(2);
        game.input(&players, PlayerId(1), InputKey::Left);
        assert!(game.drain_outbox().is_empty());
    }
}
