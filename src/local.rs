//! LocalServer – an in-memory host for the standalone binary and tests.
//!
//! Holds worlds (clock + storm), players (location + bypass flag), buff
//! configuration and message templates, and records every rendered message
//! in an outbox.

use crate::error::HostError;
use crate::host::{BuffGrantor, Messenger, PopulationSource, WorldControl};
use crate::types::{keys, PlayerId, Substitutions, WorldKey, WorldKind, DAY_LENGTH_TICKS};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// One potion-style effect handed out on a skipped night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffEffect {
    pub effect: String,
    pub duration_ticks: u32,
    pub amplifier: u8,
}

impl BuffEffect {
    pub fn new(effect: impl Into<String>, duration_ticks: u32, amplifier: u8) -> Self {
        Self {
            effect: effect.into(),
            duration_ticks,
            amplifier,
        }
    }
}

/// Singular and plural renderings of one message key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub singular: String,
    pub plural: String,
}

impl MessageTemplate {
    pub fn new(singular: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            singular: singular.into(),
            plural: plural.into(),
        }
    }

    /// Same text for both forms.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(text.clone(), text)
    }

    pub fn render(&self, substitutions: &Substitutions, singular: bool) -> String {
        let base = if singular { &self.singular } else { &self.plural };
        substitutions
            .iter()
            .fold(base.clone(), |text, (from, to)| text.replace(from, to))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalServerConfig {
    pub buffs: Vec<BuffEffect>,
    pub buffs_enabled: bool,
    pub bypass_players_get_buffs: bool,
    pub templates: BTreeMap<String, MessageTemplate>,
}

impl Default for LocalServerConfig {
    fn default() -> Self {
        let templates = [
            (keys::GOOD_MORNING, MessageTemplate::fixed("Good morning!")),
            (
                keys::BUFF_RECEIVED,
                MessageTemplate::new(
                    "You received <amount> buff for sleeping",
                    "You received <amount> buffs for sleeping",
                ),
            ),
            (
                keys::NO_BUFF_RECEIVED,
                MessageTemplate::new(
                    "You did not sleep and missed out on <amount> buff",
                    "You did not sleep and missed out on <amount> buffs",
                ),
            ),
            (
                keys::SLEEP_PROGRESS,
                MessageTemplate::new(
                    "<sleeping>/<needed> sleeping, <remaining> more player needed",
                    "<sleeping>/<needed> sleeping, <remaining> more players needed",
                ),
            ),
            (
                keys::ENOUGH_SLEEPING,
                MessageTemplate::fixed("Enough players are sleeping, the night will be skipped"),
            ),
        ]
        .into_iter()
        .map(|(k, t)| (k.to_string(), t))
        .collect();

        Self {
            buffs: vec![
                BuffEffect::new("regeneration", 200, 0),
                BuffEffect::new("speed", 600, 0),
            ],
            buffs_enabled: true,
            bypass_players_get_buffs: false,
            templates,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LocalWorld {
    pub kind: WorldKind,
    pub time: u64,
    pub storming: bool,
}

#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub world: WorldKey,
    pub bypassed: bool,
    pub effects: Vec<BuffEffect>,
}

/// A message rendered for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub player: PlayerId,
    pub key: String,
    pub text: String,
}

pub struct LocalServer {
    config: LocalServerConfig,
    worlds: BTreeMap<WorldKey, LocalWorld>,
    players: BTreeMap<PlayerId, LocalPlayer>,
    unreachable: HashSet<PlayerId>,
    outbox: Vec<Delivery>,
}

impl LocalServer {
    pub fn new(config: LocalServerConfig) -> Self {
        Self {
            config,
            worlds: BTreeMap::new(),
            players: BTreeMap::new(),
            unreachable: HashSet::new(),
            outbox: Vec::new(),
        }
    }

    pub fn config(&self) -> &LocalServerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LocalServerConfig {
        &mut self.config
    }

    // -----------------------------------------------------------------------
    // Worlds
    // -----------------------------------------------------------------------

    /// Load a world at `time`. Reloading keeps the existing clock.
    pub fn load_world(&mut self, world: WorldKey, kind: WorldKind, time: u64) {
        self.worlds.entry(world).or_insert(LocalWorld {
            kind,
            time: time % DAY_LENGTH_TICKS,
            storming: false,
        });
    }

    pub fn unload_world(&mut self, world: &WorldKey) -> Option<LocalWorld> {
        self.worlds.remove(world)
    }

    pub fn world(&self, world: &WorldKey) -> Option<&LocalWorld> {
        self.worlds.get(world)
    }

    /// Normal passage of time: every loaded clock moves one tick.
    pub fn advance_clocks(&mut self) {
        for w in self.worlds.values_mut() {
            w.time = (w.time + 1) % DAY_LENGTH_TICKS;
        }
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    pub fn join(&mut self, player: PlayerId, world: WorldKey, bypassed: bool) {
        info!("Player {} joined {}", player, world);
        self.unreachable.remove(&player);
        self.players.insert(
            player,
            LocalPlayer {
                world,
                bypassed,
                effects: Vec::new(),
            },
        );
    }

    pub fn leave(&mut self, player: &PlayerId) -> Option<LocalPlayer> {
        info!("Player {} left", player);
        self.unreachable.remove(player);
        self.players.remove(player)
    }

    pub fn move_player(&mut self, player: &PlayerId, world: WorldKey) -> Result<(), HostError> {
        let p = self
            .players
            .get_mut(player)
            .ok_or_else(|| HostError::PlayerUnavailable(player.clone()))?;
        p.world = world;
        Ok(())
    }

    pub fn player(&self, player: &PlayerId) -> Option<&LocalPlayer> {
        self.players.get(player)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Online players per world.
    pub fn population(&self) -> BTreeMap<WorldKey, usize> {
        let mut counts = BTreeMap::new();
        for p in self.players.values() {
            *counts.entry(p.world.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Keep the player listed as online but fail every message and buff
    /// aimed at them, as if the connection dropped mid-tick.
    pub fn mark_unreachable(&mut self, player: PlayerId) {
        self.unreachable.insert(player);
    }

    // -----------------------------------------------------------------------
    // Outbox
    // -----------------------------------------------------------------------

    pub fn outbox(&self) -> &[Delivery] {
        &self.outbox
    }

    /// Messages delivered to one player, in order.
    pub fn messages_for(&self, player: &PlayerId) -> Vec<&Delivery> {
        self.outbox.iter().filter(|d| &d.player == player).collect()
    }

    pub fn take_outbox(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.outbox)
    }

    fn reachable(&self, player: &PlayerId) -> Result<&LocalPlayer, HostError> {
        if self.unreachable.contains(player) {
            return Err(HostError::PlayerUnavailable(player.clone()));
        }
        self.players
            .get(player)
            .ok_or_else(|| HostError::PlayerUnavailable(player.clone()))
    }

    fn render(
        &self,
        key: &str,
        substitutions: &Substitutions,
        singular: bool,
    ) -> Result<String, HostError> {
        self.config
            .templates
            .get(key)
            .map(|t| t.render(substitutions, singular))
            .ok_or_else(|| HostError::MissingTemplate(key.to_string()))
    }
}

impl Default for LocalServer {
    fn default() -> Self {
        Self::new(LocalServerConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Host impls
// ---------------------------------------------------------------------------

impl PopulationSource for LocalServer {
    fn loaded_worlds(&self) -> Vec<(WorldKey, WorldKind)> {
        self.worlds
            .iter()
            .map(|(key, w)| (key.clone(), w.kind))
            .collect()
    }

    fn online_players(&self, world: &WorldKey) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|(_, p)| &p.world == world)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn is_bypassed(&self, player: &PlayerId) -> bool {
        self.players.get(player).is_some_and(|p| p.bypassed)
    }

    fn world_kind(&self, world: &WorldKey) -> Option<WorldKind> {
        self.worlds.get(world).map(|w| w.kind)
    }
}

impl WorldControl for LocalServer {
    fn time_of_day(&self, world: &WorldKey) -> Option<u64> {
        self.worlds.get(world).map(|w| w.time)
    }

    fn set_time_of_day(&mut self, world: &WorldKey, value: u64) {
        if let Some(w) = self.worlds.get_mut(world) {
            w.time = value % DAY_LENGTH_TICKS;
        }
    }

    fn set_storm(&mut self, world: &WorldKey, storming: bool) {
        if let Some(w) = self.worlds.get_mut(world) {
            w.storming = storming;
        }
    }
}

impl Messenger for LocalServer {
    fn send(
        &mut self,
        player: &PlayerId,
        key: &str,
        substitutions: &Substitutions,
        singular: bool,
    ) -> Result<(), HostError> {
        self.reachable(player)?;
        let text = self.render(key, substitutions, singular)?;
        debug!("-> {}: {}", player, text);
        self.outbox.push(Delivery {
            player: player.clone(),
            key: key.to_string(),
            text,
        });
        Ok(())
    }

    fn broadcast(
        &mut self,
        world: &WorldKey,
        key: &str,
        substitutions: &Substitutions,
        singular: bool,
    ) -> Result<(), HostError> {
        if !self.worlds.contains_key(world) {
            return Err(HostError::UnknownWorld(world.clone()));
        }
        let text = self.render(key, substitutions, singular)?;
        let recipients: Vec<PlayerId> = self
            .online_players(world)
            .into_iter()
            .filter(|p| !self.unreachable.contains(p))
            .collect();
        for player in recipients {
            self.outbox.push(Delivery {
                player,
                key: key.to_string(),
                text: text.clone(),
            });
        }
        Ok(())
    }
}

impl BuffGrantor for LocalServer {
    fn grant_buffs(&mut self, player: &PlayerId) -> Result<u32, HostError> {
        self.reachable(player)?;
        let buffs = self.config.buffs.clone();
        let count = u32::try_from(buffs.len()).unwrap_or(u32::MAX);
        if let Some(p) = self.players.get_mut(player) {
            p.effects.extend(buffs);
        }
        Ok(count)
    }

    fn buff_count(&self) -> u32 {
        u32::try_from(self.config.buffs.len()).unwrap_or(u32::MAX)
    }

    fn buffs_enabled(&self) -> bool {
        self.config.buffs_enabled && !self.config.buffs.is_empty()
    }

    fn bypass_players_get_buffs(&self) -> bool {
        self.config.bypass_players_get_buffs
    }
}
