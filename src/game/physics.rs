//! Ship physics: steering, thrust, bounce and arena wraparound

use crate::config::GameConfig;
use crate::ws::protocol::ControlState;

use super::state::{MatchState, PlayerState};

/// Stateless physics helpers
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Degrees to radians
    pub fn radians(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Toroidal wrap on one axis. Crossing `dimension + margin` lands on
    /// `-margin` and crossing `-margin` lands on `dimension + margin`.
    pub fn wrap(value: f32, dimension: f32, margin: f32) -> f32 {
        let mut value = value;
        if value > dimension + margin {
            value = -margin;
        }
        if value < -margin {
            value = dimension + margin;
        }
        value
    }

    /// Axis-aligned overlap test used for ship/ship and bullet/ship hits
    pub fn overlaps(x1: f32, y1: f32, x2: f32, y2: f32, size: f32) -> bool {
        (x2 - x1).abs() < size && (y2 - y1).abs() < size
    }

    /// Advance one ship by `dt` seconds.
    ///
    /// `colliding` says whether the ship currently overlaps another live
    /// ship; the bounce only negates this ship's own velocity. Position is
    /// integrated from velocity directly, velocity from thrust scaled by dt.
    pub fn update_ship(
        player: &mut PlayerState,
        controls: ControlState,
        colliding: bool,
        dt: f32,
        config: &GameConfig,
    ) {
        // Turning inputs are independent, both held cancel out
        if controls.left {
            player.angle -= config.rotation_speed * dt;
        }
        if controls.right {
            player.angle += config.rotation_speed * dt;
        }

        if controls.up {
            player.thrust = config.thrust;
        } else if controls.down {
            player.thrust = -config.thrust;
        } else {
            player.thrust = 0.0;
            player.vel_x *= config.friction;
            player.vel_y *= config.friction;
        }

        let heading = Self::radians(player.angle);
        player.vel_x += heading.cos() * player.thrust * dt;
        player.vel_y += heading.sin() * player.thrust * dt;

        player.vel_x = player.vel_x.clamp(-config.max_velocity, config.max_velocity);
        player.vel_y = player.vel_y.clamp(-config.max_velocity, config.max_velocity);

        if colliding {
            player.vel_x = -player.vel_x;
            player.vel_y = -player.vel_y;
        }

        player.x = Self::wrap(player.x + player.vel_x, config.width, config.wrap_margin);
        player.y = Self::wrap(player.y + player.vel_y, config.height, config.wrap_margin);
    }
}

impl MatchState {
    /// Move every live ship that has sent controls.
    ///
    /// Ships are processed one at a time in id order, each seeing the
    /// already-moved positions of the ships before it.
    pub(super) fn update_players(&mut self, dt: f32) {
        let ids: Vec<_> = self.players.keys().copied().collect();

        for id in ids {
            let Some(player) = self.players.get(&id) else {
                continue;
            };
            if player.dead {
                continue;
            }
            let Some(controls) = player.controls else {
                continue;
            };

            let (x, y) = (player.x, player.y);
            let size = self.config.player_size;
            let colliding = self.players.iter().any(|(other_id, other)| {
                *other_id != id && !other.dead && PhysicsSystem::overlaps(x, y, other.x, other.y, size)
            });

            if let Some(player) = self.players.get_mut(&id) {
                PhysicsSystem::update_ship(player, controls, colliding, dt, &self.config);
            }
        }
    }
}
