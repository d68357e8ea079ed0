//! Core sleep types shared across all modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length of one in-game day in clock ticks.
pub const DAY_LENGTH_TICKS: u64 = 24_000;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Opaque key identifying one game world.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldKey(pub String);

impl WorldKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque player identity.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dimension a world belongs to. Only overworlds have a day/night cycle
/// worth skipping.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorldKind {
    #[default]
    Overworld,
    Nether,
    End,
}

impl WorldKind {
    /// Whether sleep is tracked in worlds of this kind.
    pub fn is_tracked(self, overworld_only: bool) -> bool {
        !overworld_only || self == WorldKind::Overworld
    }
}

// ---------------------------------------------------------------------------
// Population
// ---------------------------------------------------------------------------

/// Per-evaluation view of one world's population. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PopulationSnapshot {
    /// Players currently online in the world.
    pub online: u32,
    /// Of those, how many are exempt via bypass permission.
    pub bypassed: u32,
}

impl PopulationSnapshot {
    pub fn new(online: u32, bypassed: u32) -> Self {
        Self { online, bypassed }
    }

    /// Online players that count toward a percentage threshold.
    pub fn eligible(&self) -> u32 {
        self.online.saturating_sub(self.bypassed)
    }
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

/// Placeholder → value pairs applied to a message template.
pub type Substitutions = BTreeMap<String, String>;

/// Message template keys sent by the core.
pub mod keys {
    pub const GOOD_MORNING: &str = "good_morning";
    pub const BUFF_RECEIVED: &str = "buff_received";
    pub const NO_BUFF_RECEIVED: &str = "no_buff_received";
    pub const SLEEP_PROGRESS: &str = "sleep_progress";
    pub const ENOUGH_SLEEPING: &str = "enough_sleeping";
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SleepStats {
    pub tracked_worlds: usize,
    pub sleeping_players: usize,
    pub active_transitions: usize,
    pub total_ticks: u64,
    pub completed_nights: u64,
}
