//! Inbound event protocol for the standalone server.
//!
//! The server reads one JSON object per line. Every object carries an
//! `event` tag in snake_case:
//!
//! | `event`        | Fields                          | Effect                              |
//! |----------------|---------------------------------|-------------------------------------|
//! | `world_load`   | world, kind?, time?             | load + register the world           |
//! | `world_unload` | world                           | unregister + unload                 |
//! | `player_join`  | player, world, bypassed?        | player comes online                 |
//! | `player_leave` | player                          | player goes offline (leaves bed)    |
//! | `bed_enter`    | player                          | `on_bed_enter` in the player's world|
//! | `bed_leave`    | player                          | `on_bed_leave` in the player's world|
//! | `stats`        | *(none)*                        | log a `SleepStats` line             |

use crate::types::{PlayerId, WorldKey, WorldKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    WorldLoad {
        world: WorldKey,
        #[serde(default)]
        kind: WorldKind,
        /// Initial clock value; defaults to nightfall.
        #[serde(default = "default_world_time")]
        time: u64,
    },
    WorldUnload {
        world: WorldKey,
    },
    PlayerJoin {
        player: PlayerId,
        world: WorldKey,
        #[serde(default)]
        bypassed: bool,
    },
    PlayerLeave {
        player: PlayerId,
    },
    BedEnter {
        player: PlayerId,
    },
    BedLeave {
        player: PlayerId,
    },
    Stats,
}

/// Clock value at which players may start using beds.
pub const NIGHTFALL: u64 = 12_541;

fn default_world_time() -> u64 {
    NIGHTFALL
}

impl HostEvent {
    /// Parse one input line. Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Option<Result<Self, serde_json::Error>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        Some(serde_json::from_str(line))
    }
}
