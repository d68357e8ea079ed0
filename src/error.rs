//! Error types.
//!
//! Two families: [`SettingsError`] is fatal and surfaces at startup,
//! [`HostError`] is per-player and only ever logged by the core.

use crate::types::{PlayerId, WorldKey};

/// Invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("absolute sleeper count must not be negative (got {0})")]
    NegativeCount(i64),

    #[error("sleeper percentage must be within 0..=100 (got {0})")]
    PercentageOutOfRange(i64),

    #[error("{field} must be at least 1")]
    ZeroTicks { field: &'static str },

    #[error("day_time must be below the day length {day_length} (got {value})")]
    DayTimeOutOfRange { value: u64, day_length: u64 },

    #[error("failed to load settings: {0}")]
    Source(#[from] config::ConfigError),
}

/// A collaborator failed to act on one player or world.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("player {0} is not reachable")]
    PlayerUnavailable(PlayerId),

    #[error("world {0} is not loaded")]
    UnknownWorld(WorldKey),

    #[error("no template registered for message key '{0}'")]
    MissingTemplate(String),
}
