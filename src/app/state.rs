//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{GameMatch, MatchHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub game: MatchHandle,
}

impl AppState {
    /// Build the state and the match it talks to. The caller spawns the match.
    pub fn new(config: Config) -> (Self, GameMatch) {
        let config = Arc::new(config);

        // The one and only match
        let (game_match, game) = GameMatch::new(config.game.clone());

        (Self { config, game }, game_match)
    }
}
