//! Per-world sleep sessions and the registry that owns them.

use crate::transition::{TimeTransition, TransitionKind};
use crate::types::{PlayerId, WorldKey};
use std::collections::{BTreeMap, BTreeSet, HashSet};

// ---------------------------------------------------------------------------
// SleepSession
// ---------------------------------------------------------------------------

/// Who is asleep in one world, and whether that world is mid-transition.
#[derive(Debug, Clone)]
pub struct SleepSession {
    world: WorldKey,
    sleeping: HashSet<PlayerId>,
    transition_in_progress: bool,
}

impl SleepSession {
    pub fn new(world: WorldKey) -> Self {
        Self {
            world,
            sleeping: HashSet::new(),
            transition_in_progress: false,
        }
    }

    pub fn world(&self) -> &WorldKey {
        &self.world
    }

    /// Returns `true` if the player was not already asleep.
    pub fn add_sleeper(&mut self, player: PlayerId) -> bool {
        self.sleeping.insert(player)
    }

    /// Returns `true` if the player was asleep.
    pub fn remove_sleeper(&mut self, player: &PlayerId) -> bool {
        self.sleeping.remove(player)
    }

    pub fn is_sleeping(&self, player: &PlayerId) -> bool {
        self.sleeping.contains(player)
    }

    pub fn sleeper_count(&self) -> usize {
        self.sleeping.len()
    }

    /// Sleepers that are still among `online`. Players who logged out or
    /// changed world without a bed-leave event do not count.
    pub fn present_sleepers(&self, online: &[PlayerId]) -> u32 {
        let count = online.iter().filter(|p| self.sleeping.contains(*p)).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn transition_in_progress(&self) -> bool {
        self.transition_in_progress
    }

    pub fn set_transition_in_progress(&mut self, in_progress: bool) {
        self.transition_in_progress = in_progress;
    }

    /// Start a fresh night.
    pub fn reset(&mut self) {
        self.sleeping.clear();
        self.transition_in_progress = false;
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The session and transition for one tracked world.
#[derive(Debug, Clone)]
pub struct WorldEntry {
    pub session: SleepSession,
    pub transition: TimeTransition,
}

/// Owns every tracked world's state. Worlds are kept in key order so the
/// evaluator visits them deterministically.
#[derive(Debug)]
pub struct SessionRegistry {
    worlds: BTreeMap<WorldKey, WorldEntry>,
    dirty: BTreeSet<WorldKey>,
    kind: TransitionKind,
    day_time: u64,
}

impl SessionRegistry {
    pub fn new(kind: TransitionKind, day_time: u64) -> Self {
        Self {
            worlds: BTreeMap::new(),
            dirty: BTreeSet::new(),
            kind,
            day_time,
        }
    }

    /// Track `world`. Returns `false` if it was already tracked.
    pub fn register(&mut self, world: WorldKey) -> bool {
        if self.worlds.contains_key(&world) {
            return false;
        }
        let entry = new_entry(world.clone(), self.kind, self.day_time);
        self.worlds.insert(world, entry);
        true
    }

    /// Stop tracking `world`, dropping any in-flight transition.
    pub fn unregister(&mut self, world: &WorldKey) -> Option<WorldEntry> {
        self.dirty.remove(world);
        self.worlds.remove(world)
    }

    /// Entry for `world`, created on first use.
    pub fn entry(&mut self, world: &WorldKey) -> &mut WorldEntry {
        let (kind, day_time) = (self.kind, self.day_time);
        self.worlds
            .entry(world.clone())
            .or_insert_with(|| new_entry(world.clone(), kind, day_time))
    }

    pub fn get(&self, world: &WorldKey) -> Option<&WorldEntry> {
        self.worlds.get(world)
    }

    pub fn get_mut(&mut self, world: &WorldKey) -> Option<&mut WorldEntry> {
        self.worlds.get_mut(world)
    }

    pub fn contains(&self, world: &WorldKey) -> bool {
        self.worlds.contains_key(world)
    }

    pub fn keys(&self) -> Vec<WorldKey> {
        self.worlds.keys().cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &WorldEntry> {
        self.worlds.values()
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    pub fn mark_dirty(&mut self, world: &WorldKey) {
        self.dirty.insert(world.clone());
    }

    pub fn is_dirty(&self, world: &WorldKey) -> bool {
        self.dirty.contains(world)
    }

    /// Drain the dirty set.
    pub fn take_dirty(&mut self) -> BTreeSet<WorldKey> {
        std::mem::take(&mut self.dirty)
    }
}

fn new_entry(world: WorldKey, kind: TransitionKind, day_time: u64) -> WorldEntry {
    WorldEntry {
        session: SleepSession::new(world.clone()),
        transition: TimeTransition::new(world, kind, day_time),
    }
}
