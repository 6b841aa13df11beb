//! Snapshot building for the per-tick state broadcast

use crate::ws::protocol::{BulletSnapshot, GameStateSnapshot, PlayerSnapshot, ServerMsg};

use super::combat::Bullet;
use super::state::{MatchState, PlayerState};

impl From<&PlayerState> for PlayerSnapshot {
    fn from(p: &PlayerState) -> Self {
        Self {
            x: p.x,
            y: p.y,
            angle: p.angle,
            thrust: p.thrust,
            vel_x: p.vel_x,
            vel_y: p.vel_y,
            dead: p.dead,
        }
    }
}

impl From<&Bullet> for BulletSnapshot {
    fn from(b: &Bullet) -> Self {
        Self {
            x: b.x,
            y: b.y,
            angle: b.angle,
            vel_x: b.vel_x,
            vel_y: b.vel_y,
            life_span: b.life_span,
        }
    }
}

/// Builds full-state snapshots. Every client gets everything, every tick,
/// whether or not anything changed.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the state message for the current tick
    pub fn build(&mut self, state: &MatchState) -> ServerMsg {
        let snapshot = GameStateSnapshot {
            players: state
                .players
                .iter()
                .map(|(id, p)| (*id, PlayerSnapshot::from(p)))
                .collect(),
            bullets: state
                .bullets
                .iter()
                .map(|(id, b)| (*id, BulletSnapshot::from(b)))
                .collect(),
            over: state.round.is_over(),
        };

        self.stats.record(snapshot.players.len());
        ServerMsg::State(snapshot)
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}

/// Running broadcast counters for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub avg_players_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, player_count: usize) {
        self.total_snapshots += 1;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_players_per_snapshot =
            self.avg_players_per_snapshot * ((n - 1.0) / n) + (player_count as f32 / n);
    }
}
