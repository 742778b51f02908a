//! Control-swap policy: one shared piece, rotating control.
//!
//! A single controller drives one active piece at a time. Exactly one
//! participant holds control; the holder is reassigned at random after
//! a randomized number of ticks, and immediately when the holder
//! disconnects. Inputs from anyone else are dropped.

use crate::core::{random_shape, Controller, ControllerEvent, TickEvents};
use crate::game::mode::{center_column, publish_lock, spawn_at, GameMode, ModeContext, ModeStatus};
use crate::net::protocol::ServerPacket;
use crate::types::{InputKey, PlayerId, PlayerInfo, TileMatrix};

pub struct ControlSwap {
    controller: Controller,
    holder: Option<PlayerId>,
    /// Ticks since the last control reassignment.
    swap_updates: u32,
    /// Randomized reassignment threshold for the current holder.
    next_swap_in: u32,
    /// Ticks since the last lock, gating the next spawn.
    spawn_updates: u32,
    next_tiles: TileMatrix,
    score: u32,
}

impl ControlSwap {
    pub fn new() -> Self {
        Self {
            controller: Controller::new(),
            holder: None,
            swap_updates: 0,
            next_swap_in: 0,
            spawn_updates: 0,
            next_tiles: Vec::new(),
            score: 0,
        }
    }

    /// Hand control to a random roster member and announce it.
    fn reassign(&mut self, ctx: &mut ModeContext<'_>) {
        self.swap_updates = 0;
        self.next_swap_in = ctx.rng.next_between(ctx.config.swap_min, ctx.config.swap_max);
        let Some(index) = pick_index(ctx) else {
            self.holder = None;
            return;
        };
        let holder = &ctx.roster[index];
        self.holder = Some(holder.id);
        ctx.outbox.to(holder.id, ServerPacket::ControlGranted);
        ctx.outbox.except(
            holder.id,
            ServerPacket::ControlAssigned {
                name: holder.name.clone(),
                uuid: holder.id,
            },
        );
        tracing::debug!(holder = %holder.id, name = %holder.name, "control reassigned");
    }

    fn spawn(&mut self, ctx: &mut ModeContext<'_>) {
        let tiles = std::mem::replace(&mut self.next_tiles, random_shape(ctx.rng));
        let column = center_column(ctx.config.width, tiles.len() as i32);
        let piece = spawn_at(column, tiles);
        ctx.outbox.broadcast(ServerPacket::ActivePiece {
            tile: piece.tiles.clone(),
        });
        ctx.outbox.broadcast(ServerPacket::MoveActive {
            x: piece.x,
            y: piece.y,
        });
        ctx.outbox.broadcast(ServerPacket::NextPiece {
            tile: self.next_tiles.clone(),
        });
        self.controller.set_piece(piece);
        self.spawn_updates = 0;
    }

    /// Current holder, if any and still present in the roster.
    fn active_holder(&self, roster: &[PlayerInfo]) -> Option<PlayerId> {
        self.holder
            .filter(|id| roster.iter().any(|player| player.id == *id))
    }

    fn describe_to(&self, ctx: &mut ModeContext<'_>, player: PlayerId) {
        if let Some(piece) = self.controller.piece() {
            ctx.outbox.to(
                player,
                ServerPacket::ActivePiece {
                    tile: piece.tiles.clone(),
                },
            );
            ctx.outbox
                .to(player, ServerPacket::MoveActive { x: piece.x, y: piece.y });
            ctx.outbox.to(
                player,
                ServerPacket::NextPiece {
                    tile: self.next_tiles.clone(),
                },
            );
        }
        if let Some(holder) = self
            .holder
            .and_then(|id| ctx.roster.iter().find(|p| p.id == id))
        {
            ctx.outbox.to(
                player,
                ServerPacket::ControlAssigned {
                    name: holder.name.clone(),
                    uuid: holder.id,
                },
            );
        }
    }
}

impl Default for ControlSwap {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for ControlSwap {
    fn start(&mut self, ctx: &mut ModeContext<'_>) {
        self.controller = Controller::new();
        self.score = 0;
        self.spawn_updates = ctx.config.spawn_delay;
        self.next_tiles = random_shape(ctx.rng);
        self.reassign(ctx);
    }

    fn update(&mut self, ctx: &mut ModeContext<'_>) -> ModeStatus {
        if ctx.roster.is_empty() {
            return ModeStatus::Stop;
        }

        self.swap_updates += 1;
        if self.swap_updates >= self.next_swap_in || self.active_holder(ctx.roster).is_none() {
            self.reassign(ctx);
        }

        if !self.controller.has_piece() {
            if self.spawn_updates >= ctx.config.spawn_delay {
                self.spawn(ctx);
            } else {
                self.spawn_updates += 1;
                return ModeStatus::Continue;
            }
        }

        let mut events = TickEvents::new();
        self.controller.update(ctx.board, ctx.config, &mut events);
        for event in &events {
            match event {
                ControllerEvent::Moved { x, y } => {
                    ctx.outbox.broadcast(ServerPacket::MoveActive { x: *x, y: *y });
                }
                ControllerEvent::Rotated => {
                    ctx.outbox.broadcast(ServerPacket::RotateActive);
                }
                ControllerEvent::Locked(outcome) => {
                    publish_lock(ctx.board, ctx.outbox, &mut self.score, outcome);
                    if outcome.topped_out {
                        return ModeStatus::Stop;
                    }
                }
            }
        }
        ModeStatus::Continue
    }

    fn stop(&mut self, _ctx: &mut ModeContext<'_>) {
        self.controller = Controller::new();
        self.holder = None;
    }

    fn input(&mut self, ctx: &mut ModeContext<'_>, player: PlayerId, key: InputKey) {
        if self.active_holder(ctx.roster) == Some(player) {
            self.controller.queue(key);
        }
    }

    fn player_joined(&mut self, ctx: &mut ModeContext<'_>, player: &PlayerInfo) {
        self.describe_to(ctx, player.id);
    }

    fn player_left(&mut self, ctx: &mut ModeContext<'_>, player: PlayerId) -> ModeStatus {
        if ctx.roster.is_empty() {
            return ModeStatus::Stop;
        }
        if self.holder == Some(player) {
            self.reassign(ctx);
        }
        ModeStatus::Continue
    }

    fn score(&self) -> u32 {
        self.score
    }
}

fn pick_index(ctx: &mut ModeContext<'_>) -> Option<usize> {
    if ctx.roster.is_empty() {
        return None;
    }
    Some(ctx.rng.next_range(ctx.roster.len() as u32) as usize)
}

/// Test-only handle on the live piece.
#[cfg(test)]
impl ControlSwap {
    pub(crate) fn piece(&self) -> Option<&crate::core::Piece> {
        self.controller.piece()
    }

    pub(crate) fn holder(&self) -> Option<PlayerId> {
        self.holder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::core::{Board, SimpleRng};
    use crate::game::Outbox;

    struct Harness {
        board: Board,
        rng: SimpleRng,
        config: GameConfig,
        outbox: Outbox,
    }

    impl Harness {
        fn new() -> Self {
            let config = GameConfig {
                spawn_delay: 0,
                swap_min: 100,
                swap_max: 100,
                ..GameConfig::default()
            };
            Self {
                board: Board::new(config.width, config.height),
                rng: SimpleRng::new(7),
                config,
                outbox: Outbox::new(),
            }
        }

        fn ctx<'a>(&'a mut self, roster: &'a [PlayerInfo]) -> ModeContext<'a> {
            ModeContext {
                board: &mut self.board,
                rng: &mut self.rng,
                config: &self.config,
                roster,
                outbox: &mut self.outbox,
            }
        }
    }

    fn roster(n: u64) -> Vec<PlayerInfo> {
        (1..=n)
            .map(|i| PlayerInfo {
                id: PlayerId(i),
                name: format!("p{i}"),
            })
            .collect()
    }

    #[test]
    fn test_start_grants_control_and_spawns() {
        let mut harness = Harness::new();
        let players = roster(2);
        let mut mode = ControlSwap::new();
        mode.start(&mut harness.ctx(&players));
        let holder = mode.holder().expect("no holder assigned");
        assert!(players.iter().any(|p| p.id == holder));

        mode.update(&mut harness.ctx(&players));
        let piece = mode.piece().expect("no piece spawned");
        assert!(piece.y < 0);

        let packets: Vec<_> = harness.outbox.drain().into_iter().collect();
        assert!(packets
            .iter()
            .any(|(t, p)| matches!(p, ServerPacket::ControlGranted) && *t == crate::game::Target::One(holder)));
        assert!(packets
            .iter()
            .any(|(_, p)| matches!(p, ServerPacket::ActivePiece { .. })));
        assert!(packets
            .iter()
            .any(|(_, p)| matches!(p, ServerPacket::NextPiece { .. })));
    }

    #[test]
    fn test_only_holder_input_is_applied() {
        let mut harness = Harness::new();
        let players = roster(2);
        let mut mode = ControlSwap::new();
        mode.start(&mut harness.ctx(&players));
        mode.update(&mut harness.ctx(&players));

        let holder = mode.holder().unwrap();
        let other = players.iter().find(|p| p.id != holder).unwrap().id;
        let x_before = mode.piece().unwrap().x;

        mode.input(&mut harness.ctx(&players), other, InputKey::Left);
        mode.update(&mut harness.ctx(&players));
        assert_eq!(mode.piece().unwrap().x, x_before);

        mode.input(&mut harness.ctx(&players), holder, InputKey::Left);
        mode.update(&mut harness.ctx(&players));
        assert_eq!(mode.piece().unwrap().x, x_before - 1);
    }

    #[test]
    fn test_holder_disconnect_triggers_reassignment() {
        let mut harness = Harness::new();
        let players = roster(3);
        let mut mode = ControlSwap::new();
        mode.start(&mut harness.ctx(&players));
        let holder = mode.holder().unwrap();

        let remaining: Vec<_> = players.iter().filter(|p| p.id != holder).cloned().collect();
        let status = mode.player_left(&mut harness.ctx(&remaining), holder);
        assert_eq!(status, ModeStatus::Continue);
        let new_holder = mode.holder().unwrap();
        assert_ne!(new_holder, holder);
        assert!(remaining.iter().any(|p| p.id == new_holder));
    }

    #[test]
    fn test_swap_after_interval() {
        let mut harness = Harness::new();
        harness.config.swap_min = 3;
        harness.config.swap_max = 3;
        let players = roster(2);
        let mut mode = ControlSwap::new();
        mode.start(&mut harness.ctx(&players));
        harness.outbox.drain();

        for _ in 0..3 {
            mode.update(&mut harness.ctx(&players));
        }
        let packets: Vec<_> = harness.outbox.drain();
        assert!(packets
            .iter()
            .any(|(_, p)| matches!(p, ServerPacket::ControlGranted)));
    }

    #[test]
    fn test_topping_out_stops_the_session() {
        let mut harness = Harness::new();
        let players = roster(2);
        // Stack reaching row 1 under every spawn column; column 0 stays
        // empty so the clear scan never fires.
        for y in 1..harness.config.height {
            for x in 1..harness.config.width {
                harness.board.set(x, y, 7);
            }
        }
        let mut mode = ControlSwap::new();
        mode.start(&mut harness.ctx(&players));

        let mut status = ModeStatus::Continue;
        for _ in 0..64 {
            status = mode.update(&mut harness.ctx(&players));
            if status == ModeStatus::Stop {
                break;
            }
        }
        assert_eq!(status, ModeStatus::Stop);
    }

    #[test]
    fn test_last_player_leaving_stops() {
        let mut harness = Harness::new();
        let players = roster(1);
        let mut mode = ControlSwap::new();
        mode.start(&mut harness.ctx(&players));
        let status = mode.player_left(&mut harness.ctx(&[]), PlayerId(1));
        assert_eq!(status, ModeStatus::Stop);
    }
}
