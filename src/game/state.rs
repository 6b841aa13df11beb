//! Simulation context: every piece of mutable game state lives here

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::GameConfig;
use crate::ws::protocol::ControlState;

use super::combat::Bullets;
use super::round::RoundState;
use super::PlayerId;

/// Player state in a match (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    /// Heading in degrees, never normalized
    pub angle: f32,
    pub thrust: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    /// Only goes false -> true within a round
    pub dead: bool,
    /// Latest control state, None until the client sends one
    pub controls: Option<ControlState>,
    /// Simulation time of the last accepted shot
    pub last_shot_at: Option<f64>,
}

impl PlayerState {
    /// Fresh ship at rest at the given position
    pub fn spawn(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            thrust: 0.0,
            vel_x: 0.0,
            vel_y: 0.0,
            dead: false,
            controls: None,
            last_shot_at: None,
        }
    }
}

/// Match state (owned by match task)
pub struct MatchState {
    pub config: GameConfig,
    pub players: BTreeMap<PlayerId, PlayerState>,
    pub bullets: Bullets,
    pub round: RoundState,
    /// Sum of all deltaTimes so far, in seconds
    pub clock: f64,
    pub tick: u64,
    pub rng: ChaCha8Rng,
}

impl MatchState {
    pub fn new(config: GameConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self {
            config,
            players: BTreeMap::new(),
            bullets: Bullets::default(),
            round: RoundState::default(),
            clock: 0.0,
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform random point inside the arena
    pub fn random_position(&mut self) -> (f32, f32) {
        let x = self.rng.gen_range(0.0..self.config.width);
        let y = self.rng.gen_range(0.0..self.config.height);
        (x, y)
    }

    /// Number of connected players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Ships are fully resolved before bullets. Simulation keeps running
    /// while the round is over; only the pending reset is special.
    /// Returns the players killed during this step.
    pub fn step(&mut self, dt: f32) -> Vec<PlayerId> {
        self.tick += 1;
        self.clock += f64::from(dt);

        self.update_round();
        self.update_players(dt);
        self.update_bullets(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::ControlState;

    #[test]
    fn spawn_positions_stay_in_bounds_and_repeat_with_seed() {
        let config = GameConfig {
            seed: Some(7),
            ..GameConfig::default()
        };
        let mut a = MatchState::new(config.clone());
        let mut b = MatchState::new(config);

        for _ in 0..100 {
            let (x, y) = a.random_position();
            assert!((0.0..800.0).contains(&x));
            assert!((0.0..500.0).contains(&y));
            assert_eq!((x, y), b.random_position());
        }
    }

    #[test]
    fn bounds_hold_over_long_random_play() {
        let mut state = MatchState::new(GameConfig {
            seed: Some(42),
            ..GameConfig::default()
        });
        let ids: Vec<_> = (1..=4).map(uuid::Uuid::from_u128).collect();
        for id in &ids {
            state.connect(*id).unwrap();
        }

        for tick in 0..2_000u32 {
            for (i, id) in ids.iter().enumerate() {
                let bits = tick.wrapping_mul(31).wrapping_add(i as u32 * 7);
                let controls = ControlState {
                    left: bits % 3 == 0,
                    right: bits % 5 == 0,
                    up: bits % 2 == 0,
                    down: bits % 7 == 0,
                };
                let _ = state.apply_controls(*id, controls);
            }
            // Jittery ticks, including the occasional stall
            let dt = if tick % 500 == 499 { 4.0 } else { 0.08 + (tick % 5) as f32 * 0.01 };
            state.step(dt);

            let c = &state.config;
            for p in state.players.values() {
                assert!(p.x >= -c.wrap_margin && p.x <= c.width + c.wrap_margin);
                assert!(p.y >= -c.wrap_margin && p.y <= c.height + c.wrap_margin);
                assert!(p.vel_x.abs() <= c.max_velocity);
                assert!(p.vel_y.abs() <= c.max_velocity);
            }
        }
    }

    #[test]
    fn round_ends_then_resets_after_delay() {
        let mut state = MatchState::new(GameConfig {
            seed: Some(9),
            ..GameConfig::default()
        });
        let shooter = uuid::Uuid::from_u128(1);
        let target = uuid::Uuid::from_u128(2);
        state.connect(shooter).unwrap();
        state.connect(target).unwrap();

        // Park the ships far apart and line up a live bullet on the target
        state.players.get_mut(&shooter).unwrap().x = 50.0;
        state.players.get_mut(&shooter).unwrap().y = 50.0;
        state.players.get_mut(&target).unwrap().x = 600.0;
        state.players.get_mut(&target).unwrap().y = 400.0;
        let mut bullet = crate::game::combat::Bullet::fire(598.0, 400.0, 0.0, &state.config);
        bullet.life_span = 0.5;
        state.bullets.fire(shooter, bullet);

        let killed = state.step(0.1);
        assert_eq!(killed, vec![target]);
        assert!(state.round.is_over());
        assert_eq!(state.round.dead_count(), 1);

        // Still over just before the delay runs out
        for _ in 0..29 {
            state.step(0.1);
        }
        assert!(state.round.is_over());
        assert!(state.players[&target].dead);

        // 3 seconds after the kill everybody is back
        state.step(0.1001);
        assert!(!state.round.is_over());
        assert_eq!(state.round.dead_count(), 0);
        for p in state.players.values() {
            assert!(!p.dead);
            assert_eq!((p.vel_x, p.vel_y), (0.0, 0.0));
        }
    }

    #[test]
    fn armed_bullet_can_kill_its_own_shooter() {
        let mut state = MatchState::new(GameConfig {
            seed: Some(13),
            ..GameConfig::default()
        });
        let shooter = uuid::Uuid::from_u128(1);
        let other = uuid::Uuid::from_u128(2);
        state.connect(shooter).unwrap();
        state.connect(other).unwrap();
        state.players.get_mut(&shooter).unwrap().x = 400.0;
        state.players.get_mut(&shooter).unwrap().y = 250.0;
        state.players.get_mut(&other).unwrap().x = 50.0;
        state.players.get_mut(&other).unwrap().y = 50.0;

        // Past the grace window and sitting just behind its own shooter
        let mut bullet = crate::game::combat::Bullet::fire(378.0, 250.0, 0.0, &state.config);
        bullet.life_span = 0.55;
        state.bullets.fire(shooter, bullet);

        let killed = state.step(0.1);
        assert_eq!(killed, vec![shooter]);
        assert!(state.players[&shooter].dead);
        assert!(state.round.is_over());
    }

    #[test]
    fn reset_still_fires_after_everyone_left() {
        let mut state = MatchState::new(GameConfig {
            seed: Some(17),
            ..GameConfig::default()
        });
        let shooter = uuid::Uuid::from_u128(1);
        let target = uuid::Uuid::from_u128(2);
        state.connect(shooter).unwrap();
        state.connect(target).unwrap();
        state.players.get_mut(&shooter).unwrap().x = 50.0;
        state.players.get_mut(&shooter).unwrap().y = 50.0;
        state.players.get_mut(&target).unwrap().x = 600.0;
        state.players.get_mut(&target).unwrap().y = 400.0;
        let mut bullet = crate::game::combat::Bullet::fire(598.0, 400.0, 0.0, &state.config);
        bullet.life_span = 0.5;
        state.bullets.fire(shooter, bullet);

        state.step(0.1);
        assert!(state.round.is_over());

        state.disconnect(shooter).unwrap();
        state.disconnect(target).unwrap();
        assert!(state.round.is_over());

        for _ in 0..31 {
            state.step(0.1);
        }
        assert!(!state.round.is_over());
        assert_eq!(state.round.dead_count(), 0);
        assert_eq!(state.player_count(), 0);
    }

    #[test]
    fn spawned_player_is_at_rest() {
        let p = PlayerState::spawn(10.0, 20.0);
        assert_eq!((p.vel_x, p.vel_y, p.angle, p.thrust), (0.0, 0.0, 0.0, 0.0));
        assert!(!p.dead);
        assert!(p.controls.is_none());
    }
}
