//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Greeting sent once on connect
pub const GREETING: &str = "Hello welcome!";

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Sent by the client after it loads. The player already exists from
    /// connect, so the coordinates are not used for placement.
    NewPlayer { x: f32, y: f32 },

    /// Latest control state, replaces any earlier one
    ClientUpdate(ControlState),

    /// Fire the ship's cannon
    PlayerShot,
}

impl ClientMsg {
    /// Parse and validate a text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let msg: ClientMsg = serde_json::from_str(text)?;
        msg.validate()?;
        Ok(msg)
    }

    /// Reject payloads that would poison the simulation
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ClientMsg::NewPlayer { x, y } if !x.is_finite() || !y.is_finite() => {
                Err(ProtocolError::NonFinite("newPlayer"))
            }
            _ => Ok(()),
        }
    }
}

/// The four independent control booleans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    /// Turn counter-clockwise
    pub left: bool,
    /// Turn clockwise
    pub right: bool,
    /// Thrust forward
    pub up: bool,
    /// Thrust in reverse
    pub down: bool,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Plain-text greeting
    Message { text: String },

    /// Tells the client which entry in the state maps is its own
    #[serde(rename_all = "camelCase")]
    Welcome { id: Uuid, server_time: u64 },

    /// Full game state, sent every tick
    State(GameStateSnapshot),
}

/// Entire game state as seen by every client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub players: BTreeMap<Uuid, PlayerSnapshot>,
    pub bullets: BTreeMap<Uuid, BulletSnapshot>,
    /// True between the last kill of a round and the reset
    pub over: bool,
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    /// Heading in degrees
    pub angle: f32,
    pub thrust: f32,
    #[serde(rename = "vX")]
    pub vel_x: f32,
    #[serde(rename = "vY")]
    pub vel_y: f32,
    pub dead: bool,
}

/// Bullet state in a snapshot, keyed by shooter id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    #[serde(rename = "vX")]
    pub vel_x: f32,
    #[serde(rename = "vY")]
    pub vel_y: f32,
    /// Seconds left before the bullet disappears
    #[serde(rename = "lifeSpan")]
    pub life_span: f32,
}

/// Inbound message rejected at the session boundary
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("non-finite number in {0}")]
    NonFinite(&'static str),
}
