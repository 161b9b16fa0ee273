//! Room configuration.

use std::time::Duration;

use teamquiz_protocol::GameSettings;

/// Number of players reported in `round-end` and `game-ended`.
pub const TOP_PLAYERS: usize = 3;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Everything the registry needs to spawn a room.
///
/// `settings` is copied into each room at creation and never changes for
/// that room afterwards.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Game rules snapshotted into every new room.
    pub settings: GameSettings,

    /// Capacity of each room actor's command channel. Senders wait when
    /// it is full.
    pub command_buffer: usize,

    /// Spacing between `round-tick` events.
    pub tick_period: Duration,

    /// Length of freshly generated room codes.
    pub code_len: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            settings: GameSettings::default(),
            command_buffer: 64,
            tick_period: teamquiz_tick::DEFAULT_PERIOD,
            code_len: 4,
        }
    }
}

impl RoomConfig {
    /// Default config with custom game settings.
    pub fn with_settings(settings: GameSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }
}
