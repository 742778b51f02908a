//! Teamwork policy: one independently falling piece per participant.
//!
//! Every participant owns a controller on the shared board. Spawns pick
//! a random column that avoids the columns covered by other live pieces
//! at decision time; pieces may still converge afterwards, and the
//! obstruction checks inside each controller keep them from overlapping
//! solid cells. Score is pooled across the whole team.

use std::collections::BTreeMap;

use crate::core::{random_shape, Controller, ControllerEvent, TickEvents};
use crate::game::mode::{publish_lock, spawn_at, GameMode, ModeContext, ModeStatus};
use crate::net::protocol::ServerPacket;
use crate::types::{InputKey, PlayerId, PlayerInfo, TileMatrix};

struct Seat {
    controller: Controller,
    spawn_updates: u32,
    next_tiles: TileMatrix,
}

impl Seat {
    fn new(ctx: &mut ModeContext<'_>) -> Self {
        Self {
            controller: Controller::new(),
            spawn_updates: ctx.config.spawn_delay,
            next_tiles: random_shape(ctx.rng),
        }
    }
}

/// BTreeMap keeps seat iteration in id order, so ticks stay
/// deterministic for a given seed and join sequence.
pub struct Teamwork {
    seats: BTreeMap<PlayerId, Seat>,
    score: u32,
}

impl Teamwork {
    pub fn new() -> Self {
        Self {
            seats: BTreeMap::new(),
            score: 0,
        }
    }

    fn add_seat(&mut self, ctx: &mut ModeContext<'_>, player: &PlayerInfo) {
        let seat = Seat::new(ctx);
        ctx.outbox.to(
            player.id,
            ServerPacket::NextPiece {
                tile: seat.next_tiles.clone(),
            },
        );
        self.seats.insert(player.id, seat);
    }

    /// Column ranges covered by live pieces, except `skip`'s own.
    fn taken_columns(&self, skip: PlayerId) -> Vec<(i32, i32)> {
        self.seats
            .iter()
            .filter(|(id, _)| **id != skip)
            .filter_map(|(_, seat)| seat.controller.piece())
            .map(|piece| (piece.x, piece.x + piece.size() as i32 - 1))
            .collect()
    }
}

impl Default for Teamwork {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for Teamwork {
    fn start(&mut self, ctx: &mut ModeContext<'_>) {
        self.score = 0;
        self.seats.clear();
        for player in ctx.roster {
            self.add_seat(ctx, player);
        }
    }

    fn update(&mut self, ctx: &mut ModeContext<'_>) -> ModeStatus {
        if self.seats.is_empty() {
            return ModeStatus::Stop;
        }

        let owners: Vec<PlayerId> = self.seats.keys().copied().collect();
        for owner in owners {
            // Column snapshot is taken per seat so earlier spawns in the
            // same tick are visible to later ones.
            let taken = self.taken_columns(owner);
            let Some(seat) = self.seats.get_mut(&owner) else {
                continue;
            };

            if !seat.controller.has_piece() {
                if seat.spawn_updates < ctx.config.spawn_delay {
                    seat.spawn_updates += 1;
                    continue;
                }
                let tiles = std::mem::replace(&mut seat.next_tiles, random_shape(ctx.rng));
                let column = pick_column(ctx, &taken, tiles.len() as i32);
                let piece = spawn_at(column, tiles);
                ctx.outbox.to(
                    owner,
                    ServerPacket::ActivePiece {
                        tile: piece.tiles.clone(),
                    },
                );
                ctx.outbox
                    .to(owner, ServerPacket::MoveActive { x: piece.x, y: piece.y });
                ctx.outbox.to(
                    owner,
                    ServerPacket::NextPiece {
                        tile: seat.next_tiles.clone(),
                    },
                );
                ctx.outbox.except(
                    owner,
                    ServerPacket::MovingPiece {
                        uuid: owner,
                        tile: piece.tiles.clone(),
                        x: piece.x,
                        y: piece.y,
                    },
                );
                seat.controller.set_piece(piece);
                seat.spawn_updates = 0;
                continue;
            }

            let mut events = TickEvents::new();
            seat.controller.update(ctx.board, ctx.config, &mut events);
            for event in &events {
                match event {
                    ControllerEvent::Moved { x, y } => {
                        ctx.outbox
                            .to(owner, ServerPacket::MoveActive { x: *x, y: *y });
                        if let Some(piece) = seat.controller.piece() {
                            ctx.outbox.except(
                                owner,
                                ServerPacket::MovingPiece {
                                    uuid: owner,
                                    tile: piece.tiles.clone(),
                                    x: *x,
                                    y: *y,
                                },
                            );
                        }
                    }
                    ControllerEvent::Rotated => {
                        ctx.outbox.to(owner, ServerPacket::RotateActive);
                        if let Some(piece) = seat.controller.piece() {
                            ctx.outbox.except(
                                owner,
                                ServerPacket::MovingPiece {
                                    uuid: owner,
                                    tile: piece.tiles.clone(),
                                    x: piece.x,
                                    y: piece.y,
                                },
                            );
                        }
                    }
                    ControllerEvent::Locked(outcome) => {
                        publish_lock(ctx.board, ctx.outbox, &mut self.score, outcome);
                        if outcome.topped_out {
                            return ModeStatus::Stop;
                        }
                    }
                }
            }
        }
        ModeStatus::Continue
    }

    fn stop(&mut self, _ctx: &mut ModeContext<'_>) {
        self.seats.clear();
    }

    fn input(&mut self, _ctx: &mut ModeContext<'_>, player: PlayerId, key: InputKey) {
        if let Some(seat) = self.seats.get_mut(&player) {
            seat.controller.queue(key);
        }
    }

    fn player_joined(&mut self, ctx: &mut ModeContext<'_>, player: &PlayerInfo) {
        self.add_seat(ctx, player);
    }

    fn player_left(&mut self, _ctx: &mut ModeContext<'_>, player: PlayerId) -> ModeStatus {
        self.seats.remove(&player);
        if self.seats.is_empty() {
            ModeStatus::Stop
        } else {
            ModeStatus::Continue
        }
    }

    fn score(&self) -> u32 {
        self.score
    }
}

/// Pick a spawn column avoiding the given ranges, with up to `width`
/// random attempts before settling for the last candidate.
fn pick_column(ctx: &mut ModeContext<'_>, taken: &[(i32, i32)], size: i32) -> i32 {
    let width = ctx.config.width;
    let slots = (width - size + 1).max(1) as u32;
    let mut candidate = 0;
    for _ in 0..width.max(1) {
        candidate = ctx.rng.next_range(slots) as i32;
        let overlaps = taken
            .iter()
            .any(|&(start, end)| candidate <= end && candidate + size - 1 >= start);
        if !overlaps {
            return candidate;
        }
    }
    candidate
}

#[cfg(test)]
impl Teamwork {
    pub(crate) fn piece_of(&self, player: PlayerId) -> Option<&crate::core::Piece> {
        self.seats.get(&player)?.controller.piece()
    }

    pub(crate) fn seat_count(&self) -> usize {
        self.seats.len()
    }
}
