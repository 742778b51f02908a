//! Protocol module - packet schema for the persistent message channels.
//!
//! Every packet is one JSON object per line carrying a small integer
//! `id` discriminant plus a fixed field set keyed by that id. Inbound
//! packets are decoded through one validating constructor: field
//! presence and types are checked, and unknown or malformed packets
//! become an explicit error variant the caller logs and drops without
//! touching connection state.

use serde_json::{json, Value};
use thiserror::Error;

use crate::types::{InputKey, PlayerId, TileMatrix};

/// Why an inbound line failed to decode into a packet.
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("packet missing \"id\"")]
    MissingId,
    #[error("no inbound packet mapped to id {0}")]
    UnknownId(u64),
    #[error("packet missing field \"{0}\"")]
    MissingField(&'static str),
    #[error("packet field \"{0}\" has the wrong type or value")]
    InvalidField(&'static str),
}

/// Client -> server packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    KeepAlive,
    JoinRequest { name: String },
    Input { key: InputKey },
    Disconnect { reason: String },
}

impl ClientPacket {
    pub const KEEP_ALIVE: u64 = 0;
    pub const JOIN_REQUEST: u64 = 1;
    pub const INPUT: u64 = 2;
    pub const DISCONNECT: u64 = 3;

    /// Decode one line into a packet, validating field presence and
    /// types against the structure registered for the id.
    pub fn decode(line: &str) -> Result<Self, PacketError> {
        let value: Value = serde_json::from_str(line)?;
        let id = value
            .get("id")
            .ok_or(PacketError::MissingId)?
            .as_u64()
            .ok_or(PacketError::MissingId)?;
        match id {
            Self::KEEP_ALIVE => Ok(ClientPacket::KeepAlive),
            Self::JOIN_REQUEST => Ok(ClientPacket::JoinRequest {
                name: string_field(&value, "name")?,
            }),
            Self::INPUT => {
                let key = string_field(&value, "key")?;
                let key = InputKey::from_str(&key).ok_or(PacketError::InvalidField("key"))?;
                Ok(ClientPacket::Input { key })
            }
            Self::DISCONNECT => Ok(ClientPacket::Disconnect {
                reason: string_field(&value, "reason")?,
            }),
            other => Err(PacketError::UnknownId(other)),
        }
    }

    /// Encode for the wire (used by test clients).
    pub fn encode(&self) -> String {
        let value = match self {
            ClientPacket::KeepAlive => json!({ "id": Self::KEEP_ALIVE }),
            ClientPacket::JoinRequest { name } => {
                json!({ "id": Self::JOIN_REQUEST, "name": name })
            }
            ClientPacket::Input { key } => json!({ "id": Self::INPUT, "key": key.as_str() }),
            ClientPacket::Disconnect { reason } => {
                json!({ "id": Self::DISCONNECT, "reason": reason })
            }
        };
        value.to_string()
    }
}

/// Server -> client packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPacket {
    KeepAlive,
    JoinResponse { uuid: PlayerId },
    JoinFailure { reason: String },
    PlayerJoin { name: String, uuid: PlayerId },
    PlayerLeave { name: String, reason: String },
    TimeTillStart { seconds: u64 },
    Play,
    Stop,
    /// Sent to the participant who now drives the shared piece.
    ControlGranted,
    /// Sent to everyone else naming who holds control.
    ControlAssigned { name: String, uuid: PlayerId },
    MapSize { width: i32, height: i32 },
    /// Canonical full-board resync: one fixed-width digit string per row.
    BulkMap { lines: Vec<String> },
    ActivePiece { tile: TileMatrix },
    NextPiece { tile: TileMatrix },
    MoveActive { x: i32, y: i32 },
    RotateActive,
    ScoreUpdate { score: u32 },
    RowCleared { y: i32 },
    /// Another participant's piece changed (concurrent variant only).
    MovingPiece {
        uuid: PlayerId,
        tile: TileMatrix,
        x: i32,
        y: i32,
    },
}

impl ServerPacket {
    /// Wire discriminant for this packet.
    pub fn id(&self) -> u64 {
        match self {
            ServerPacket::KeepAlive => 0,
            ServerPacket::JoinResponse { .. } => 1,
            ServerPacket::JoinFailure { .. } => 2,
            ServerPacket::PlayerJoin { .. } => 3,
            ServerPacket::PlayerLeave { .. } => 4,
            ServerPacket::TimeTillStart { .. } => 5,
            ServerPacket::Play => 6,
            ServerPacket::Stop => 7,
            ServerPacket::ControlGranted => 8,
            ServerPacket::ControlAssigned { .. } => 9,
            ServerPacket::MapSize { .. } => 10,
            ServerPacket::BulkMap { .. } => 11,
            ServerPacket::ActivePiece { .. } => 12,
            ServerPacket::NextPiece { .. } => 13,
            ServerPacket::MoveActive { .. } => 14,
            ServerPacket::RotateActive => 15,
            ServerPacket::ScoreUpdate { .. } => 16,
            ServerPacket::RowCleared { .. } => 17,
            ServerPacket::MovingPiece { .. } => 18,
        }
    }

    /// Encode as one JSON line (without the trailing newline).
    pub fn encode(&self) -> String {
        let id = self.id();
        let value = match self {
            ServerPacket::KeepAlive
            | ServerPacket::Play
            | ServerPacket::Stop
            | ServerPacket::ControlGranted
            | ServerPacket::RotateActive => json!({ "id": id }),
            ServerPacket::JoinResponse { uuid } => json!({ "id": id, "uuid": uuid }),
            ServerPacket::JoinFailure { reason } => json!({ "id": id, "reason": reason }),
            ServerPacket::PlayerJoin { name, uuid } => {
                json!({ "id": id, "name": name, "uuid": uuid })
            }
            ServerPacket::PlayerLeave { name, reason } => {
                json!({ "id": id, "name": name, "reason": reason })
            }
            ServerPacket::TimeTillStart { seconds } => json!({ "id": id, "time": seconds }),
            ServerPacket::ControlAssigned { name, uuid } => {
                json!({ "id": id, "name": name, "uuid": uuid })
            }
            ServerPacket::MapSize { width, height } => {
                json!({ "id": id, "width": width, "height": height })
            }
            ServerPacket::BulkMap { lines } => json!({ "id": id, "lines": lines }),
            ServerPacket::ActivePiece { tile } => json!({ "id": id, "tile": tile }),
            ServerPacket::NextPiece { tile } => json!({ "id": id, "tile": tile }),
            ServerPacket::MoveActive { x, y } => json!({ "id": id, "x": x, "y": y }),
            ServerPacket::ScoreUpdate { score } => json!({ "id": id, "score": score }),
            ServerPacket::RowCleared { y } => json!({ "id": id, "y": y }),
            ServerPacket::MovingPiece { uuid, tile, x, y } => {
                json!({ "id": id, "uuid": uuid, "tile": tile, "x": x, "y": y })
            }
        };
        value.to_string()
    }
}

fn string_field(value: &Value, key: &'static str) -> Result<String, PacketError> {
    let field = value.get(key).ok_or(PacketError::MissingField(key))?;
    field
        .as_str()
        .map(str::to_owned)
        .ok_or(PacketError::InvalidField(key))
}
