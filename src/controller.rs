//! BedEventController – the only entry point for bed notifications.
//!
//! Bed events only update the sleeping set and flag the world for the next
//! evaluator tick. Starting a transition is left to
//! [`crate::evaluator::SleepEvaluator`] so rapid enter/leave sequences can
//! never double-trigger.
//!
//! A session is created on first bed entry only for a loaded world whose
//! dimension is tracked. Events for any other world change nothing.

use crate::host::Host;
use crate::session::SessionRegistry;
use crate::threshold::ThresholdCalculator;
use crate::types::{keys, PlayerId, Substitutions, WorldKey};
use log::{debug, warn};

/// What a bed event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BedOutcome {
    /// `false` for a duplicate enter or a leave by a non-sleeper.
    pub changed: bool,
    /// Session size after the event.
    pub sleeping: usize,
}

/// Short-lived handle over the evaluator's registry.
///
/// Obtained from [`crate::evaluator::SleepEvaluator::bed_events`]; it
/// borrows the registry for the duration of one event and no longer.
pub struct BedEventController<'a> {
    registry: &'a mut SessionRegistry,
    calculator: &'a ThresholdCalculator,
    progress_messages: bool,
    overworld_only: bool,
}

impl<'a> BedEventController<'a> {
    pub fn new(
        registry: &'a mut SessionRegistry,
        calculator: &'a ThresholdCalculator,
        progress_messages: bool,
        overworld_only: bool,
    ) -> Self {
        Self {
            registry,
            calculator,
            progress_messages,
            overworld_only,
        }
    }

    /// A player lay down. Re-entering while already asleep is a no-op.
    pub fn on_bed_enter<H: Host>(
        &mut self,
        host: &mut H,
        world: &WorldKey,
        player: PlayerId,
    ) -> BedOutcome {
        if !self.registry.contains(world) {
            let tracked = host
                .world_kind(world)
                .is_some_and(|kind| kind.is_tracked(self.overworld_only));
            if !tracked {
                debug!("World {}: ignoring bed entry by {}", world, player);
                return BedOutcome::default();
            }
        }

        let entry = self.registry.entry(world);
        let changed = entry.session.add_sleeper(player.clone());
        let sleeping = entry.session.sleeper_count();
        let in_progress = entry.session.transition_in_progress();
        self.registry.mark_dirty(world);

        debug!(
            "World {}: {} entered bed ({} sleeping)",
            world, player, sleeping
        );

        if changed && self.progress_messages && !in_progress {
            self.announce_progress(host, world);
        }

        BedOutcome { changed, sleeping }
    }

    /// A player got up (or was kicked out of bed). Unknown players and
    /// untracked worlds are ignored.
    pub fn on_bed_leave(&mut self, world: &WorldKey, player: &PlayerId) -> BedOutcome {
        let Some(entry) = self.registry.get_mut(world) else {
            return BedOutcome::default();
        };
        let changed = entry.session.remove_sleeper(player);
        let sleeping = entry.session.sleeper_count();
        self.registry.mark_dirty(world);

        if changed {
            debug!("World {}: {} left bed ({} sleeping)", world, player, sleeping);
        }

        BedOutcome { changed, sleeping }
    }

    /// Tell the world how many more sleepers are needed.
    fn announce_progress<H: Host>(&mut self, host: &mut H, world: &WorldKey) {
        let online = host.online_players(world);
        let needed = self.calculator.required(&host.snapshot(world));
        let sleeping = self
            .registry
            .get(world)
            .map(|e| e.session.present_sleepers(&online))
            .unwrap_or(0);
        let remaining = needed.saturating_sub(sleeping);

        let mut subs = Substitutions::new();
        subs.insert("<sleeping>".into(), sleeping.to_string());
        subs.insert("<needed>".into(), needed.to_string());
        subs.insert("<remaining>".into(), remaining.to_string());

        let key = if remaining == 0 {
            keys::ENOUGH_SLEEPING
        } else {
            keys::SLEEP_PROGRESS
        };

        if let Err(e) = host.broadcast(world, key, &subs, remaining == 1) {
            warn!("World {}: failed to broadcast sleep progress: {}", world, e);
        }
    }
}
