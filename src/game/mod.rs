//! Game simulation modules

pub mod combat;
pub mod r#match;
pub mod physics;
pub mod round;
pub mod session;
pub mod snapshot;
pub mod state;

pub use r#match::{GameMatch, MatchHandle};

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// Connection identity, also the key of the player and bullet maps
pub type PlayerId = Uuid;

/// Event queued by a socket task for the match task
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub player_id: PlayerId,
    pub kind: SessionEventKind,
    pub received_at: u64,
}

#[derive(Debug, Clone)]
pub enum SessionEventKind {
    Connected,
    Message(ClientMsg),
    Disconnected,
}
