//! Combat system - bullets, lifespan and hit detection

use std::collections::btree_map::{self, BTreeMap};

use tracing::info;

use crate::config::GameConfig;

use super::physics::PhysicsSystem;
use super::state::MatchState;
use super::PlayerId;

/// Active bullet in the game
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    /// Heading frozen at spawn, degrees
    pub angle: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    /// Seconds left to live
    pub life_span: f32,
}

impl Bullet {
    /// Bullet leaving the cannon of a ship at (x, y) facing `angle`
    pub fn fire(x: f32, y: f32, angle: f32, config: &GameConfig) -> Self {
        let heading = PhysicsSystem::radians(angle);
        Self {
            x: x + heading.cos() * config.player_cannon_size,
            y: y + heading.sin() * config.player_cannon_size,
            angle,
            vel_x: 0.0,
            vel_y: 0.0,
            life_span: config.bullet_duration,
        }
    }

    /// Accelerate along the frozen heading, move and wrap
    pub fn advance(&mut self, dt: f32, config: &GameConfig) {
        let heading = PhysicsSystem::radians(self.angle);
        self.vel_x += heading.cos() * config.bullet_speed * dt;
        self.vel_y += heading.sin() * config.bullet_speed * dt;
        self.x = PhysicsSystem::wrap(self.x + self.vel_x, config.width, config.wrap_margin);
        self.y = PhysicsSystem::wrap(self.y + self.vel_y, config.height, config.wrap_margin);
    }

    /// A fresh bullet cannot kill anyone, its shooter included
    pub fn is_armed(&self, config: &GameConfig) -> bool {
        self.life_span < config.bullet_duration - config.bullet_grace
    }
}

/// Live bullets keyed by shooter.
///
/// Each shooter owns at most one live bullet. Firing again replaces the
/// previous bullet instead of adding a second one.
#[derive(Debug, Clone, Default)]
pub struct Bullets {
    by_shooter: BTreeMap<PlayerId, Bullet>,
}

impl Bullets {
    /// Install `bullet` as the shooter's only bullet, returning the one it replaced
    pub fn fire(&mut self, shooter: PlayerId, bullet: Bullet) -> Option<Bullet> {
        self.by_shooter.insert(shooter, bullet)
    }

    #[cfg(test)]
    pub fn get(&self, shooter: &PlayerId) -> Option<&Bullet> {
        self.by_shooter.get(shooter)
    }

    pub fn remove(&mut self, shooter: &PlayerId) -> Option<Bullet> {
        self.by_shooter.remove(shooter)
    }

    pub fn len(&self) -> usize {
        self.by_shooter.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.by_shooter.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PlayerId, Bullet> {
        self.by_shooter.iter()
    }

    fn shooters(&self) -> Vec<PlayerId> {
        self.by_shooter.keys().copied().collect()
    }
}

impl MatchState {
    /// Age, move and resolve every bullet.
    ///
    /// Returns the players killed this tick, in the order they died.
    pub(super) fn update_bullets(&mut self, dt: f32) -> Vec<PlayerId> {
        let mut killed = Vec::new();

        for shooter in self.bullets.shooters() {
            let Some(bullet) = self.bullets.by_shooter.get_mut(&shooter) else {
                continue;
            };

            bullet.life_span -= dt;
            if bullet.life_span <= 0.0 {
                self.bullets.remove(&shooter);
                continue;
            }

            bullet.advance(dt, &self.config);

            if !bullet.is_armed(&self.config) {
                continue;
            }

            // Every live ship under the bullet dies, then the bullet is spent
            let (bx, by) = (bullet.x, bullet.y);
            let size = self.config.player_size;
            let victims: Vec<PlayerId> = self
                .players
                .iter()
                .filter(|(_, p)| !p.dead && PhysicsSystem::overlaps(bx, by, p.x, p.y, size))
                .map(|(id, _)| *id)
                .collect();

            if victims.is_empty() {
                continue;
            }
            self.bullets.remove(&shooter);

            for victim in victims {
                if let Some(p) = self.players.get_mut(&victim) {
                    p.dead = true;
                }
                info!(shooter_id = %shooter, victim_id = %victim, "Player killed");
                self.record_kill();
                killed.push(victim);
            }
        }

        killed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::PlayerState;
    use uuid::Uuid;

    fn state() -> MatchState {
        MatchState::new(GameConfig {
            seed: Some(3),
            ..GameConfig::default()
        })
    }

    #[test]
    fn fire_spawns_ahead_of_cannon() {
        let config = GameConfig::default();
        let bullet = Bullet::fire(100.0, 100.0, 90.0, &config);
        assert!((bullet.x - 100.0).abs() < 1e-4);
        assert!((bullet.y - 104.0).abs() < 1e-4);
        assert_eq!(bullet.angle, 90.0);
        assert_eq!(bullet.life_span, 0.8);
        assert_eq!((bullet.vel_x, bullet.vel_y), (0.0, 0.0));
    }

    #[test]
    fn second_shot_replaces_first() {
        let config = GameConfig::default();
        let shooter = Uuid::from_u128(1);
        let mut bullets = Bullets::default();

        assert!(bullets.fire(shooter, Bullet::fire(0.0, 0.0, 0.0, &config)).is_none());
        let replaced = bullets.fire(shooter, Bullet::fire(50.0, 0.0, 0.0, &config));
        assert!(replaced.is_some());
        assert_eq!(bullets.len(), 1);
        assert!((bullets.get(&shooter).unwrap().x - 54.0).abs() < 1e-4);
    }

    #[test]
    fn lifespan_counts_down_and_expires() {
        let mut state = state();
        let shooter = Uuid::from_u128(1);
        let bullet = Bullet::fire(400.0, 250.0, 0.0, &state.config);
        state.bullets.fire(shooter, bullet);

        let mut previous = 0.8;
        for _ in 0..7 {
            state.update_bullets(0.1);
            let life = state.bullets.get(&shooter).unwrap().life_span;
            assert!((previous - life - 0.1).abs() < 1e-5);
            previous = life;
        }

        // 0.8 - 8 * 0.1 reaches zero (within float error) on the eighth tick
        state.update_bullets(0.1001);
        assert!(state.bullets.is_empty());
    }

    #[test]
    fn bullet_accelerates_and_wraps() {
        let config = GameConfig::default();
        let mut bullet = Bullet::fire(815.0, 250.0, 0.0, &config);
        // x starts at 819, first step adds 15
        bullet.advance(0.1, &config);
        assert_eq!(bullet.x, -20.0);
        assert!((bullet.vel_x - 15.0).abs() < 1e-4);
        bullet.advance(0.1, &config);
        assert!((bullet.vel_x - 30.0).abs() < 1e-4);
        assert!((bullet.x - 10.0).abs() < 1e-3);
    }

    #[test]
    fn grace_window_protects_shooter() {
        let mut state = state();
        let shooter = Uuid::from_u128(1);
        state.players.insert(shooter, PlayerState::spawn(400.0, 250.0));
        state.players.insert(Uuid::from_u128(2), PlayerState::spawn(100.0, 100.0));

        // Fired straight up out of the ship, still overlapping after one tick
        let bullet = Bullet::fire(400.0, 250.0, 90.0, &state.config);
        state.bullets.fire(shooter, bullet);

        let killed = state.update_bullets(0.1);
        assert!(killed.is_empty());
        assert!(!state.players[&shooter].dead);
        let bullet = state.bullets.get(&shooter).unwrap();
        assert!(!bullet.is_armed(&state.config));
    }

    #[test]
    fn armed_bullet_kills_and_is_destroyed() {
        let mut state = state();
        let shooter = Uuid::from_u128(1);
        let target = Uuid::from_u128(2);
        let bystander = Uuid::from_u128(3);
        state.players.insert(shooter, PlayerState::spawn(100.0, 100.0));
        state.players.insert(target, PlayerState::spawn(600.0, 400.0));
        state.players.insert(bystander, PlayerState::spawn(300.0, 100.0));

        let mut bullet = Bullet::fire(598.0, 400.0, 0.0, &state.config);
        bullet.life_span = 0.5;
        state.bullets.fire(shooter, bullet);

        let killed = state.update_bullets(0.1);
        assert_eq!(killed, vec![target]);
        assert!(state.players[&target].dead);
        assert!(state.bullets.is_empty());
        assert_eq!(state.round.dead_count(), 1);
    }

    #[test]
    fn one_bullet_kills_every_ship_it_overlaps() {
        let mut state = state();
        let shooter = Uuid::from_u128(1);
        let first = Uuid::from_u128(2);
        let second = Uuid::from_u128(3);
        state.players.insert(shooter, PlayerState::spawn(100.0, 100.0));
        state.players.insert(first, PlayerState::spawn(600.0, 400.0));
        state.players.insert(second, PlayerState::spawn(605.0, 400.0));

        let mut bullet = Bullet::fire(598.0, 400.0, 0.0, &state.config);
        bullet.life_span = 0.5;
        state.bullets.fire(shooter, bullet);

        let killed = state.update_bullets(0.1);
        assert_eq!(killed, vec![first, second]);
        assert!(state.players[&first].dead);
        assert!(state.players[&second].dead);
        assert!(state.bullets.is_empty());
        // Both deaths are counted, which ends a three player round at once
        assert_eq!(state.round.dead_count(), 2);
        assert!(state.round.is_over());
    }

    #[test]
    fn dead_players_are_not_hit_again() {
        let mut state = state();
        let shooter = Uuid::from_u128(1);
        let target = Uuid::from_u128(2);
        state.players.insert(shooter, PlayerState::spawn(100.0, 100.0));
        let mut corpse = PlayerState::spawn(600.0, 400.0);
        corpse.dead = true;
        state.players.insert(target, corpse);

        let mut bullet = Bullet::fire(598.0, 400.0, 0.0, &state.config);
        bullet.life_span = 0.5;
        state.bullets.fire(shooter, bullet);

        assert!(state.update_bullets(0.1).is_empty());
        assert_eq!(state.bullets.len(), 1);
    }
}
