//! Night-to-day transition strategies.
//!
//! A [`TimeTransition`] owns the "how" of skipping a night; the evaluator
//! owns the "when". Both strategies share the same `Idle → Active → Complete`
//! state machine so trigger and abort handling is identical.

use crate::host::WorldControl;
use crate::settings::{SkipMode, SleepSettings};
use crate::types::{WorldKey, DAY_LENGTH_TICKS};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Set the clock to day in the step that starts the transition.
    Instant,
    /// Ramp the clock forward linearly over `duration` steps.
    Gradual { duration: u32 },
}

impl TransitionKind {
    pub fn from_settings(settings: &SleepSettings) -> Self {
        match settings.mode {
            SkipMode::Setter => Self::Instant,
            SkipMode::Smooth => Self::Gradual {
                duration: settings.smooth_duration_ticks.max(1),
            },
        }
    }

    /// Total number of steps; zero for instant transitions.
    pub fn duration(&self) -> u32 {
        match self {
            Self::Instant => 0,
            Self::Gradual { duration } => *duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionState {
    #[default]
    Idle,
    Active,
    Complete,
}

#[derive(Debug, Clone)]
pub struct TimeTransition {
    world: WorldKey,
    kind: TransitionKind,
    state: TransitionState,
    progress: u32,
    start_time: u64,
    target_time: u64,
}

impl TimeTransition {
    pub fn new(world: WorldKey, kind: TransitionKind, target_time: u64) -> Self {
        Self {
            world,
            kind,
            state: TransitionState::Idle,
            progress: 0,
            start_time: 0,
            target_time: target_time % DAY_LENGTH_TICKS,
        }
    }

    pub fn world(&self) -> &WorldKey {
        &self.world
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn state(&self) -> TransitionState {
        self.state
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn is_active(&self) -> bool {
        self.state == TransitionState::Active
    }

    /// Begin skipping the night. Only valid from `Idle`; any other state is
    /// returned unchanged.
    pub fn start(&mut self, clock: &mut dyn WorldControl) -> TransitionState {
        if self.state != TransitionState::Idle {
            return self.state;
        }

        self.progress = 0;
        match self.kind {
            TransitionKind::Instant => {
                clock.set_time_of_day(&self.world, self.target_time);
                clock.set_storm(&self.world, false);
                self.state = TransitionState::Complete;
                info!("World {}: night skipped instantly", self.world);
            }
            TransitionKind::Gradual { duration } => {
                self.start_time = clock
                    .time_of_day(&self.world)
                    .unwrap_or(self.target_time);
                self.state = TransitionState::Active;
                info!(
                    "World {}: smooth sunrise started at {} ({} steps)",
                    self.world, self.start_time, duration
                );
            }
        }
        self.state
    }

    /// Move an active gradual transition one step forward.
    pub fn advance(&mut self, clock: &mut dyn WorldControl) -> TransitionState {
        let TransitionKind::Gradual { duration } = self.kind else {
            return self.state;
        };
        if self.state != TransitionState::Active {
            return self.state;
        }

        self.progress = (self.progress + 1).min(duration);
        let time = self.time_at(self.progress, duration);
        clock.set_time_of_day(&self.world, time);
        debug!(
            "World {}: sunrise step {}/{} -> {}",
            self.world, self.progress, duration, time
        );

        if self.progress >= duration {
            self.state = TransitionState::Complete;
        }
        self.state
    }

    /// Stop an active transition. The clock stays wherever it got to.
    /// Returns `true` if something was aborted.
    pub fn abort(&mut self) -> bool {
        if self.state != TransitionState::Active {
            return false;
        }
        info!(
            "World {}: smooth sunrise aborted at step {}",
            self.world, self.progress
        );
        self.state = TransitionState::Idle;
        self.progress = 0;
        true
    }

    /// Back to `Idle` after a completed night.
    pub fn reset(&mut self) {
        self.state = TransitionState::Idle;
        self.progress = 0;
    }

    /// Forward distance from start to target, wrapping over midnight.
    fn span(&self) -> u64 {
        (self.target_time + DAY_LENGTH_TICKS - self.start_time % DAY_LENGTH_TICKS)
            % DAY_LENGTH_TICKS
    }

    fn time_at(&self, step: u32, duration: u32) -> u64 {
        let travelled = self.span() * u64::from(step) / u64::from(duration.max(1));
        (self.start_time + travelled) % DAY_LENGTH_TICKS
    }
}
