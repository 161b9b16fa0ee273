//! Command-line and environment configuration for the server binary.
//!
//! Every flag can also come from an environment variable, and a `.env`
//! file in the working directory is loaded before parsing (see
//! [`ServerConfig::load`]).

use std::time::Duration;

use clap::{Args, Parser};
use teamquiz_room::{GameSettings, RoomConfig};

use crate::TeamquizError;
use crate::limit::RateLimit;

/// Server configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "teamquiz-server")]
#[command(about = "Live two-team quiz server", long_about = None)]
pub struct ServerConfig {
    /// Address the real-time WebSocket gateway binds to
    #[arg(long, env = "TEAMQUIZ_WS_ADDR", default_value = "0.0.0.0:3001")]
    pub ws_addr: String,

    /// Address the admin HTTP surface binds to
    #[arg(long, env = "TEAMQUIZ_ADMIN_ADDR", default_value = "0.0.0.0:3002")]
    pub admin_addr: String,

    /// Shared secret for admin routes. Without it every admin call is refused
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Origin allowed to call the admin surface from a browser (any if unset)
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Admin requests allowed per client within one rate-limit window
    #[arg(long, env = "TEAMQUIZ_RATE_LIMIT_MAX", default_value_t = 100)]
    pub rate_limit_max: u32,

    /// Length of the rate-limit window in seconds
    #[arg(long, env = "TEAMQUIZ_RATE_LIMIT_WINDOW", default_value_t = 10)]
    pub rate_limit_window_secs: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "TEAMQUIZ_LOG", default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub game: GameArgs,
}

/// Overrides for [`GameSettings`]; defaults match `GameSettings::default()`.
#[derive(Args, Debug, Clone)]
pub struct GameArgs {
    /// Capacity of each team
    #[arg(long, default_value_t = 5)]
    pub team_size: usize,

    /// Total roster capacity across both teams
    #[arg(long, default_value_t = 10)]
    pub max_players: usize,

    /// Informational target number of rounds
    #[arg(long, default_value_t = 10)]
    pub rounds: u32,

    /// Points for a correct answer
    #[arg(long, default_value_t = 10)]
    pub points_correct: i64,

    /// Points for a wrong answer (zero or negative)
    #[arg(long, default_value_t = -5, allow_negative_numbers = true)]
    pub points_wrong: i64,

    /// Length of the answer window in seconds
    #[arg(long, default_value_t = 15)]
    pub question_seconds: u32,
}

impl ServerConfig {
    /// Loads `.env` (if present) and parses the process arguments.
    pub fn load() -> Self {
        // A missing .env is normal in production.
        dotenvy::dotenv().ok();
        Self::parse()
    }

    /// The validated game settings.
    pub fn settings(&self) -> Result<GameSettings, TeamquizError> {
        let settings = GameSettings {
            max_players: self.game.max_players,
            team_size: self.game.team_size,
            rounds: self.game.rounds,
            points_correct: self.game.points_correct,
            points_wrong: self.game.points_wrong,
            question_seconds: self.game.question_seconds,
        };
        settings.validate().map_err(TeamquizError::Config)?;
        Ok(settings)
    }

    /// Admin rate limit; validated when the server is built.
    pub fn rate_limit(&self) -> RateLimit {
        RateLimit {
            max_requests: self.rate_limit_max,
            window: Duration::from_secs(self.rate_limit_window_secs),
        }
    }

    /// Room config with the validated settings and default plumbing.
    pub fn room_config(&self) -> Result<RoomConfig, TeamquizError> {
        Ok(RoomConfig::with_settings(self.settings()?))
    }
}
