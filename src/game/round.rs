//! Round lifecycle: Active -> Ended -> (delay) -> Active

use tracing::info;

use super::state::{MatchState, PlayerState};

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundPhase {
    /// Play in progress
    Active,
    /// Everybody but one is dead; reset fires at `reset_at` on the sim clock
    Ended { reset_at: f64 },
}

/// Dead counter plus the over flag
#[derive(Debug, Clone)]
pub struct RoundState {
    phase: RoundPhase,
    dead_count: usize,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            phase: RoundPhase::Active,
            dead_count: 0,
        }
    }
}

impl RoundState {
    #[cfg(test)]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, RoundPhase::Ended { .. })
    }

    pub fn dead_count(&self) -> usize {
        self.dead_count
    }

    /// All but one of `player_count` are dead
    fn threshold_reached(&self, player_count: usize) -> bool {
        self.dead_count >= player_count.saturating_sub(1)
    }

    /// Count a kill; returns true when this kill ends the round.
    /// With a single player the threshold is zero, so a self-kill ends it.
    pub fn record_kill(&mut self, player_count: usize, now: f64, reset_delay: f32) -> bool {
        self.dead_count += 1;
        self.try_end(player_count, now, reset_delay)
    }

    /// Re-evaluate after a player left.
    ///
    /// A departing dead player no longer counts as dead. The threshold is
    /// then checked against the remaining players, but only once somebody
    /// has died this round, so a lone survivor of a kill-free round keeps
    /// playing instead of winning by walkover.
    pub fn record_departure(
        &mut self,
        was_dead: bool,
        player_count: usize,
        now: f64,
        reset_delay: f32,
    ) -> bool {
        if was_dead {
            self.dead_count = self.dead_count.saturating_sub(1);
        }
        if self.dead_count == 0 {
            return false;
        }
        self.try_end(player_count, now, reset_delay)
    }

    fn try_end(&mut self, player_count: usize, now: f64, reset_delay: f32) -> bool {
        if self.is_over() || !self.threshold_reached(player_count) {
            return false;
        }
        self.phase = RoundPhase::Ended {
            reset_at: now + f64::from(reset_delay),
        };
        true
    }

    /// The reset delay has elapsed
    pub fn reset_due(&self, now: f64) -> bool {
        match self.phase {
            RoundPhase::Ended { reset_at } => now >= reset_at,
            RoundPhase::Active => false,
        }
    }

    fn restart(&mut self) {
        self.phase = RoundPhase::Active;
        self.dead_count = 0;
    }
}

impl MatchState {
    /// Kill bookkeeping, called once per death
    pub(super) fn record_kill(&mut self) {
        let players = self.player_count();
        if self
            .round
            .record_kill(players, self.clock, self.config.round_reset_delay)
        {
            info!(
                dead = self.round.dead_count(),
                players, "Round over, resetting in {}s", self.config.round_reset_delay
            );
        }
    }

    /// Respawn everyone once the post-round delay has run out
    pub(super) fn update_round(&mut self) {
        if !self.round.reset_due(self.clock) {
            return;
        }

        let ids: Vec<_> = self.players.keys().copied().collect();
        for id in ids {
            let (x, y) = self.random_position();
            self.players.insert(id, PlayerState::spawn(x, y));
        }
        self.round.restart();

        info!(players = self.player_count(), "New round started");
    }
}
