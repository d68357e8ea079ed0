//! SleepEvaluator – the periodic loop that decides when night ends.

use crate::controller::BedEventController;
use crate::error::SettingsError;
use crate::host::Host;
use crate::session::{SessionRegistry, WorldEntry};
use crate::settings::SleepSettings;
use crate::threshold::ThresholdCalculator;
use crate::transition::{TransitionKind, TransitionState};
use crate::types::{SleepStats, WorldKey, WorldKind};
use crate::wake::{WakeReport, WakeSequencer};
use log::{debug, info};

// ---------------------------------------------------------------------------
// Tick result
// ---------------------------------------------------------------------------

/// What a single [`SleepEvaluator::tick`] call changed.
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    /// Worlds whose transition started this tick.
    pub started: Vec<WorldKey>,
    /// Worlds whose gradual transition was aborted this tick.
    pub aborted: Vec<WorldKey>,
    /// One report per world that woke up this tick.
    pub woke: Vec<WakeReport>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.aborted.is_empty() && self.woke.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SleepEvaluator
// ---------------------------------------------------------------------------

pub struct SleepEvaluator {
    calculator: ThresholdCalculator,
    registry: SessionRegistry,
    sequencer: WakeSequencer,
    evaluation_interval: u64,
    progress_messages: bool,
    overworld_only: bool,
    tick_count: u64,
    completed_nights: u64,
}

impl SleepEvaluator {
    /// Build an evaluator from validated settings. Invalid settings are
    /// reported here, before any world is registered.
    pub fn new(settings: &SleepSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let calculator = ThresholdCalculator::from_settings(settings)?;
        let kind = TransitionKind::from_settings(settings);

        info!("Using required sleepers counter {}", calculator);
        info!("Using {:?} as night skip mode", kind);

        Ok(Self {
            calculator,
            registry: SessionRegistry::new(kind, settings.day_time),
            sequencer: WakeSequencer::new(settings.day_time),
            evaluation_interval: u64::from(settings.evaluation_interval_ticks.max(1)),
            progress_messages: settings.progress_messages,
            overworld_only: settings.overworld_only,
            tick_count: 0,
            completed_nights: 0,
        })
    }

    pub fn calculator(&self) -> &ThresholdCalculator {
        &self.calculator
    }

    // -----------------------------------------------------------------------
    // World lifecycle
    // -----------------------------------------------------------------------

    /// Register every eligible world the host currently has loaded.
    /// Returns how many were newly registered.
    pub fn register_worlds<H: Host>(&mut self, host: &H) -> usize {
        host.loaded_worlds()
            .into_iter()
            .filter(|(world, kind)| self.register_world(world.clone(), *kind))
            .count()
    }

    /// Track `world` if its dimension is eligible.
    pub fn register_world(&mut self, world: WorldKey, kind: WorldKind) -> bool {
        if !kind.is_tracked(self.overworld_only) {
            debug!("Skipping world {} ({:?})", world, kind);
            return false;
        }
        let added = self.registry.register(world.clone());
        if added {
            info!("Tracking sleep in world {}", world);
        }
        added
    }

    /// Forget `world`. Any running transition is dropped without waking.
    pub fn unregister_world(&mut self, world: &WorldKey) -> bool {
        let removed = self.registry.unregister(world).is_some();
        if removed {
            info!("Stopped tracking sleep in world {}", world);
        }
        removed
    }

    pub fn is_tracking(&self, world: &WorldKey) -> bool {
        self.registry.contains(world)
    }

    pub fn world(&self, world: &WorldKey) -> Option<&WorldEntry> {
        self.registry.get(world)
    }

    // -----------------------------------------------------------------------
    // Bed events
    // -----------------------------------------------------------------------

    /// Borrow the registry for bed-event handling.
    pub fn bed_events(&mut self) -> BedEventController<'_> {
        BedEventController::new(
            &mut self.registry,
            &self.calculator,
            self.progress_messages,
            self.overworld_only,
        )
    }

    // -----------------------------------------------------------------------
    // Main tick
    // -----------------------------------------------------------------------

    /// Advance by one server tick.
    ///
    /// Active transitions are checked and stepped every tick. Idle worlds are
    /// evaluated every `evaluation_interval` ticks, or on the first tick
    /// after a bed event marked them dirty.
    pub fn tick<H: Host>(&mut self, host: &mut H) -> TickReport {
        self.tick_count += 1;
        let scheduled = self.tick_count % self.evaluation_interval == 0;
        let dirty = self.registry.take_dirty();

        let mut report = TickReport {
            tick: self.tick_count,
            ..Default::default()
        };

        for world in self.registry.keys() {
            let due = scheduled || dirty.contains(&world);
            let Some(entry) = self.registry.get_mut(&world) else {
                continue;
            };
            let active = entry.transition.is_active();
            if !active && (!due || entry.session.transition_in_progress()) {
                continue;
            }

            let online = host.online_players(&world);
            let sleepers = entry.session.present_sleepers(&online);

            if active {
                let required = self.calculator.required(&host.snapshot(&world));
                if sleepers == 0 || sleepers < required {
                    entry.transition.abort();
                    entry.session.set_transition_in_progress(false);
                    report.aborted.push(world);
                    continue;
                }
                if entry.transition.advance(host) == TransitionState::Complete {
                    report.woke.push(self.sequencer.run(host, &mut entry.session));
                    entry.transition.reset();
                    self.completed_nights += 1;
                }
                continue;
            }

            let required = self.calculator.required(&host.snapshot(&world));
            debug!(
                "World {}: {} of {} required sleepers",
                world, sleepers, required
            );
            if sleepers == 0 || sleepers < required {
                continue;
            }

            entry.session.set_transition_in_progress(true);
            report.started.push(world.clone());
            if entry.transition.start(host) == TransitionState::Complete {
                report.woke.push(self.sequencer.run(host, &mut entry.session));
                entry.transition.reset();
                self.completed_nights += 1;
            }
        }

        report
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> SleepStats {
        SleepStats {
            tracked_worlds: self.registry.len(),
            sleeping_players: self
                .registry
                .entries()
                .map(|e| e.session.sleeper_count())
                .sum(),
            active_transitions: self
                .registry
                .entries()
                .filter(|e| e.transition.is_active())
                .count(),
            total_ticks: self.tick_count,
            completed_nights: self.completed_nights,
        }
    }
}
