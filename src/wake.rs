//! WakeSequencer – the terminal "good morning" actions for one world.

use crate::host::Host;
use crate::session::SleepSession;
use crate::types::{keys, PlayerId, Substitutions, WorldKey};
use log::{debug, info, warn};

/// What the wake sequence did for one world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeReport {
    pub world: WorldKey,
    /// Players that received `good_morning`.
    pub greeted: Vec<PlayerId>,
    /// Players that received buffs.
    pub buffed: Vec<PlayerId>,
    /// Per-player operations that failed and were skipped.
    pub failures: usize,
}

/// Runs once per completed transition.
#[derive(Debug, Clone, Copy)]
pub struct WakeSequencer {
    day_time: u64,
}

impl WakeSequencer {
    pub fn new(day_time: u64) -> Self {
        Self { day_time }
    }

    /// Set day, reward players, greet everyone, then reset `session`.
    ///
    /// Failures for individual players are logged and counted; the sequence
    /// always runs to the end and always resets the session.
    pub fn run<H: Host>(&self, host: &mut H, session: &mut SleepSession) -> WakeReport {
        let world = session.world().clone();
        let mut report = WakeReport {
            world: world.clone(),
            greeted: Vec::new(),
            buffed: Vec::new(),
            failures: 0,
        };

        host.set_time_of_day(&world, self.day_time);
        host.set_storm(&world, false);

        let buffs_enabled = host.buffs_enabled();
        let bypass_buffs = host.bypass_players_get_buffs();
        let buff_count = host.buff_count();

        let mut amount = Substitutions::new();
        amount.insert("<amount>".into(), buff_count.to_string());
        let singular = buff_count == 1;

        let players: Vec<(PlayerId, bool)> = host
            .online_players(&world)
            .into_iter()
            .map(|player| {
                let eligible =
                    session.is_sleeping(&player) || (bypass_buffs && host.is_bypassed(&player));
                (player, eligible)
            })
            .collect();

        for (player, _) in &players {
            match host.send(player, keys::GOOD_MORNING, &Substitutions::new(), false) {
                Ok(()) => report.greeted.push(player.clone()),
                Err(e) => {
                    warn!("World {}: good morning to {} failed: {}", world, player, e);
                    report.failures += 1;
                }
            }
        }

        if buffs_enabled {
            for (player, eligible) in &players {
                let key = if *eligible {
                    match host.grant_buffs(player) {
                        Ok(granted) => {
                            debug!("World {}: {} received {} buffs", world, player, granted);
                            report.buffed.push(player.clone());
                            keys::BUFF_RECEIVED
                        }
                        Err(e) => {
                            warn!("World {}: granting buffs to {} failed: {}", world, player, e);
                            report.failures += 1;
                            continue;
                        }
                    }
                } else {
                    keys::NO_BUFF_RECEIVED
                };

                if let Err(e) = host.send(player, key, &amount, singular) {
                    warn!("World {}: '{}' to {} failed: {}", world, key, player, e);
                    report.failures += 1;
                }
            }
        }

        session.reset();
        info!(
            "World {}: good morning ({} greeted, {} buffed, {} failures)",
            world,
            report.greeted.len(),
            report.buffed.len(),
            report.failures
        );
        report
    }
}
