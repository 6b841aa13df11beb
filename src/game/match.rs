//! The match task: single owner of the simulation and its tick loop

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::util::time::TickClock;
use crate::ws::protocol::ServerMsg;

use super::snapshot::SnapshotBuilder;
use super::state::MatchState;
use super::SessionEvent;

/// Queued session events between two ticks
const EVENT_QUEUE_CAPACITY: usize = 1024;
/// Snapshots a slow client may fall behind before it starts skipping
const SNAPSHOT_BUFFER: usize = 16;

/// Handle to the running match, cloned into every socket task
#[derive(Clone)]
pub struct MatchHandle {
    pub event_tx: mpsc::Sender<SessionEvent>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<AtomicUsize>,
}

impl MatchHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    /// Subscribe to per-tick state broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.snapshot_tx.subscribe()
    }
}

/// The authoritative game match.
///
/// Socket tasks only enqueue events; all state mutation happens here, on
/// one task, between ticks.
pub struct GameMatch {
    state: MatchState,
    event_rx: mpsc::Receiver<SessionEvent>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<AtomicUsize>,
}

impl GameMatch {
    /// Create a new match
    pub fn new(config: GameConfig) -> (Self, MatchHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_BUFFER);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = MatchHandle {
            event_tx,
            snapshot_tx: snapshot_tx.clone(),
            player_count: player_count.clone(),
        };

        let game_match = Self {
            state: MatchState::new(config),
            event_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(),
            player_count,
        };

        (game_match, handle)
    }

    /// Run the authoritative tick loop until every handle is dropped
    pub async fn run(mut self) {
        let tick_duration = Duration::from_millis(self.state.config.tick_ms);
        info!(tick_ms = self.state.config.tick_ms, "Match loop started");

        let mut tick_interval = interval(tick_duration);
        // A late tick pushes the schedule back instead of bursting
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut clock = TickClock::new();

        loop {
            tick_interval.tick().await;

            if !self.drain_events() {
                info!("All match handles dropped, stopping match loop");
                break;
            }

            self.tick(clock.delta());
        }

        info!(
            ticks = self.state.tick,
            snapshots = self.snapshot_builder.stats().total_snapshots,
            "Match loop stopped"
        );
    }

    /// Apply every event queued since the last tick, in arrival order.
    /// Returns false once the queue is closed and empty.
    fn drain_events(&mut self) -> bool {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.state.handle_event(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }

        self.player_count
            .store(self.state.player_count(), Ordering::Relaxed);
        true
    }

    /// Step the simulation and broadcast the resulting state
    fn tick(&mut self, dt: f32) {
        let killed = self.state.step(dt);
        if !killed.is_empty() {
            debug!(
                tick = self.state.tick,
                kills = killed.len(),
                bullets_left = self.state.bullets.len(),
                "Kills this tick"
            );
        }

        let snapshot = self.snapshot_builder.build(&self.state);
        // No receivers just means nobody is connected
        let _ = self.snapshot_tx.send(snapshot);
    }
}
