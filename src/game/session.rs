//! Session handlers: connect, controls, shots and disconnect

use tracing::{debug, info, warn};

use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ControlState};

use super::combat::Bullet;
use super::state::{MatchState, PlayerState};
use super::{PlayerId, SessionEvent, SessionEventKind};

/// Session operation addressed to a player the match does not know
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("player {0} is already connected")]
    AlreadyConnected(PlayerId),

    #[error("player {0} is dead")]
    Dead(PlayerId),

    #[error("player {0} is still cooling down")]
    CoolingDown(PlayerId),
}

impl MatchState {
    /// Route one queued socket event
    pub fn handle_event(&mut self, event: SessionEvent) {
        let player_id = event.player_id;
        let queued_ms = unix_millis().saturating_sub(event.received_at);
        let result = match event.kind {
            SessionEventKind::Connected => self.connect(player_id),
            SessionEventKind::Message(ClientMsg::NewPlayer { .. }) => {
                // Placement is random and already happened on connect
                debug!(player_id = %player_id, "Ignoring newPlayer coordinates");
                Ok(())
            }
            SessionEventKind::Message(ClientMsg::ClientUpdate(controls)) => {
                self.apply_controls(player_id, controls)
            }
            SessionEventKind::Message(ClientMsg::PlayerShot) => self.shoot(player_id),
            SessionEventKind::Disconnected => self.disconnect(player_id).map(|_| ()),
        };

        if let Err(e) = result {
            debug!(player_id = %player_id, error = %e, queued_ms, "Session event dropped");
        }
    }

    /// Create the player for a new connection at a random position
    pub fn connect(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        if self.players.contains_key(&player_id) {
            return Err(SessionError::AlreadyConnected(player_id));
        }

        let (x, y) = self.random_position();
        self.players.insert(player_id, PlayerState::spawn(x, y));

        info!(
            player_id = %player_id,
            player_count = self.player_count(),
            "Player joined"
        );
        Ok(())
    }

    /// Store the latest controls; the next tick uses whatever arrived last
    pub fn apply_controls(
        &mut self,
        player_id: PlayerId,
        controls: ControlState,
    ) -> Result<(), SessionError> {
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(SessionError::UnknownPlayer(player_id))?;
        player.controls = Some(controls);
        Ok(())
    }

    /// Fire the player's cannon, replacing any bullet they still have in flight
    pub fn shoot(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        let cooldown = f64::from(self.config.shot_cooldown);
        let now = self.clock;
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(SessionError::UnknownPlayer(player_id))?;

        if player.dead {
            return Err(SessionError::Dead(player_id));
        }
        if cooldown > 0.0 {
            if let Some(last) = player.last_shot_at {
                if now - last < cooldown {
                    return Err(SessionError::CoolingDown(player_id));
                }
            }
        }
        player.last_shot_at = Some(now);

        let bullet = Bullet::fire(player.x, player.y, player.angle, &self.config);
        if self.bullets.fire(player_id, bullet).is_some() {
            debug!(player_id = %player_id, "Replaced bullet still in flight");
        }
        Ok(())
    }

    /// Remove the player; returns its final state
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<PlayerState, SessionError> {
        let player = self
            .players
            .remove(&player_id)
            .ok_or(SessionError::UnknownPlayer(player_id))?;

        info!(
            player_id = %player_id,
            player_count = self.player_count(),
            "Player left"
        );

        let players = self.player_count();
        if self.round.record_departure(
            player.dead,
            players,
            self.clock,
            self.config.round_reset_delay,
        ) {
            warn!(players, "Departure ended the round");
        }

        Ok(player)
    }
}
