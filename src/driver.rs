//! SleepAgent – drives the evaluator from a tokio tick loop.
//!
//! ## Threading
//!
//! Bed and player events arrive on an mpsc channel and are applied by the
//! same task that ticks the evaluator, so every session and transition has
//! exactly one writer. The [`LocalServer`] sits behind a mutex only so the
//! caller can inspect it while (or after) the agent runs; the lock is held
//! for one event or one tick at a time.

use crate::evaluator::{SleepEvaluator, TickReport};
use crate::local::LocalServer;
use crate::protocol::HostEvent;
use crate::types::SleepStats;
use anyhow::{ensure, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Config for SleepAgent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SleepAgentConfig {
    /// Server tick rate in Hz.
    pub tick_rate_hz: f32,
}

impl Default for SleepAgentConfig {
    fn default() -> Self {
        Self { tick_rate_hz: 20.0 }
    }
}

// ---------------------------------------------------------------------------
// SleepAgent
// ---------------------------------------------------------------------------

pub struct SleepAgent {
    config: SleepAgentConfig,
    evaluator: SleepEvaluator,
    server: Arc<Mutex<LocalServer>>,
}

impl SleepAgent {
    /// Wrap `evaluator` and register every eligible world already loaded.
    pub fn new(
        config: SleepAgentConfig,
        mut evaluator: SleepEvaluator,
        server: Arc<Mutex<LocalServer>>,
    ) -> Self {
        let registered = evaluator.register_worlds(&*server.lock());
        info!(registered, "sleep agent ready");
        Self {
            config,
            evaluator,
            server,
        }
    }

    pub fn evaluator(&self) -> &SleepEvaluator {
        &self.evaluator
    }

    pub fn stats(&self) -> SleepStats {
        self.evaluator.stats()
    }

    /// Apply one inbound event to the server and the sleep sessions.
    pub fn apply(&mut self, event: HostEvent) {
        let mut server = self.server.lock();
        match event {
            HostEvent::WorldLoad { world, kind, time } => {
                server.load_world(world.clone(), kind, time);
                self.evaluator.register_world(world, kind);
            }
            HostEvent::WorldUnload { world } => {
                self.evaluator.unregister_world(&world);
                server.unload_world(&world);
            }
            HostEvent::PlayerJoin {
                player,
                world,
                bypassed,
            } => server.join(player, world, bypassed),
            HostEvent::PlayerLeave { player } => {
                if let Some(p) = server.leave(&player) {
                    self.evaluator.bed_events().on_bed_leave(&p.world, &player);
                }
            }
            HostEvent::BedEnter { player } => {
                match server.player(&player).map(|p| p.world.clone()) {
                    Some(world) => {
                        self.evaluator
                            .bed_events()
                            .on_bed_enter(&mut *server, &world, player);
                    }
                    None => warn!(%player, "bed enter from unknown player"),
                }
            }
            HostEvent::BedLeave { player } => {
                match server.player(&player).map(|p| p.world.clone()) {
                    Some(world) => {
                        self.evaluator.bed_events().on_bed_leave(&world, &player);
                    }
                    None => warn!(%player, "bed leave from unknown player"),
                }
            }
            HostEvent::Stats => {
                let stats = self.evaluator.stats();
                info!(
                    worlds = stats.tracked_worlds,
                    sleeping = stats.sleeping_players,
                    active = stats.active_transitions,
                    ticks = stats.total_ticks,
                    nights = stats.completed_nights,
                    online = server.player_count(),
                    "sleep stats"
                );
            }
        }
    }

    /// One server tick: clocks move, then the evaluator runs.
    pub fn step(&mut self) -> TickReport {
        let mut server = self.server.lock();
        server.advance_clocks();
        let report = self.evaluator.tick(&mut *server);

        for world in &report.started {
            info!(%world, "night skip started");
        }
        for world in &report.aborted {
            info!(%world, "night skip aborted");
        }
        for wake in &report.woke {
            if wake.failures > 0 {
                warn!(failures = wake.failures, "wake sequence had failures");
            }
        }
        report
    }

    /// Tick at `tick_rate_hz` and apply events as they arrive, until the
    /// channel closes or the process receives Ctrl-C.
    pub async fn run(mut self, mut events: mpsc::Receiver<HostEvent>) -> Result<SleepStats> {
        ensure!(
            self.config.tick_rate_hz > 0.0,
            "tick rate must be positive (got {})",
            self.config.tick_rate_hz
        );

        info!(
            tick_rate_hz = self.config.tick_rate_hz,
            "sleep agent ticking"
        );

        let interval = std::time::Duration::from_secs_f32(1.0 / self.config.tick_rate_hz);
        let mut timer = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.step();
                }
                event = events.recv() => match event {
                    Some(event) => self.apply(event),
                    None => {
                        info!("event source closed, stopping");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("sleep agent shutting down (SIGINT)");
                    break;
                }
            }
        }

        Ok(self.evaluator.stats())
    }
}
