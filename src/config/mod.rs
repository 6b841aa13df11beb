//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Directory holding the browser client assets
    pub static_dir: PathBuf,
    /// Gameplay tuning
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        let mut game = GameConfig::default();
        if let Some(tick_ms) = parse_var::<u64>("TICK_MS")? {
            if tick_ms == 0 {
                return Err(ConfigError::Invalid("TICK_MS"));
            }
            game.tick_ms = tick_ms;
        }
        if let Some(cooldown_ms) = parse_var::<u64>("SHOT_COOLDOWN_MS")? {
            game.shot_cooldown = cooldown_ms as f32 / 1000.0;
        }
        game.seed = parse_var::<u64>("GAME_SEED")?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),

            game,
        })
    }
}

/// Read an optional variable and parse it, reporting which one was bad
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

/// Gameplay constants. Units are arena pixels, degrees and seconds.
#[derive(Clone, Debug)]
pub struct GameConfig {
    pub width: f32,
    pub height: f32,
    /// Distance past an edge a body may travel before wrapping
    pub wrap_margin: f32,
    /// Degrees per second
    pub rotation_speed: f32,
    pub max_velocity: f32,
    pub thrust: f32,
    /// Velocity multiplier applied on ticks without thrust input
    pub friction: f32,
    /// Half-extent of the axis-aligned hit box
    pub player_size: f32,
    /// Bullet spawn offset ahead of the ship
    pub player_cannon_size: f32,
    pub bullet_speed: f32,
    pub bullet_duration: f32,
    /// Time after spawn during which a bullet cannot kill
    pub bullet_grace: f32,
    pub round_reset_delay: f32,
    /// Server-side minimum time between shots; 0 trusts the client
    pub shot_cooldown: f32,
    pub tick_ms: u64,
    /// Spawn RNG seed, random when unset
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            wrap_margin: 20.0,
            rotation_speed: 200.0,
            max_velocity: 10.0,
            thrust: 10.0,
            friction: 0.98,
            player_size: 20.0,
            player_cannon_size: 4.0,
            bullet_speed: 150.0,
            bullet_duration: 0.8,
            bullet_grace: 0.2,
            round_reset_delay: 3.0,
            shot_cooldown: 0.0,
            tick_ms: 100,
            seed: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
