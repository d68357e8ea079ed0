//! Collaborator seams the sleep core drives.
//!
//! The core never talks to a server directly. Population, clock, chat and
//! buffs are reached through these traits; [`crate::local::LocalServer`] is
//! the in-memory implementation used by the standalone binary and tests.
//!
//! All methods are synchronous and are called from the tick thread only.

use crate::error::HostError;
use crate::types::{PlayerId, PopulationSnapshot, Substitutions, WorldKey, WorldKind};

pub trait PopulationSource {
    /// Worlds currently loaded, with their dimension.
    fn loaded_worlds(&self) -> Vec<(WorldKey, WorldKind)>;

    /// Players online and located in `world`.
    fn online_players(&self, world: &WorldKey) -> Vec<PlayerId>;

    fn is_bypassed(&self, player: &PlayerId) -> bool;

    /// Dimension of `world`, `None` if it is not loaded.
    fn world_kind(&self, world: &WorldKey) -> Option<WorldKind> {
        self.loaded_worlds()
            .into_iter()
            .find(|(key, _)| key == world)
            .map(|(_, kind)| kind)
    }

    /// Online/bypassed counts for threshold calculation.
    fn snapshot(&self, world: &WorldKey) -> PopulationSnapshot {
        let players = self.online_players(world);
        let bypassed = players.iter().filter(|p| self.is_bypassed(p)).count();
        PopulationSnapshot::new(
            u32::try_from(players.len()).unwrap_or(u32::MAX),
            u32::try_from(bypassed).unwrap_or(u32::MAX),
        )
    }
}

pub trait WorldControl {
    /// Current clock value in `0..DAY_LENGTH_TICKS`, `None` if not loaded.
    fn time_of_day(&self, world: &WorldKey) -> Option<u64>;

    fn set_time_of_day(&mut self, world: &WorldKey, value: u64);

    fn set_storm(&mut self, world: &WorldKey, storming: bool);
}

pub trait Messenger {
    /// Render `key` for one player. `singular` selects the singular form of
    /// templates that pluralise.
    fn send(
        &mut self,
        player: &PlayerId,
        key: &str,
        substitutions: &Substitutions,
        singular: bool,
    ) -> Result<(), HostError>;

    /// Render `key` for every player in `world`.
    fn broadcast(
        &mut self,
        world: &WorldKey,
        key: &str,
        substitutions: &Substitutions,
        singular: bool,
    ) -> Result<(), HostError>;
}

pub trait BuffGrantor {
    /// Apply every configured buff. Returns how many were applied.
    fn grant_buffs(&mut self, player: &PlayerId) -> Result<u32, HostError>;

    /// Number of configured buffs (used in messages even when none is applied).
    fn buff_count(&self) -> u32;

    fn buffs_enabled(&self) -> bool;

    fn bypass_players_get_buffs(&self) -> bool;
}

/// Everything the evaluator needs from its server.
pub trait Host: PopulationSource + WorldControl + Messenger + BuffGrantor {}

impl<T> Host for T where T: PopulationSource + WorldControl + Messenger + BuffGrantor {}
