//! SleepEvaluator tests – threshold crossing, aborts and full nights

#[cfg(test)]
mod tests {
    use sleep_skip::{
        local::LocalServer,
        types::{keys, Substitutions},
        BuffGrantor, CounterMode, HostError, Messenger, PlayerId, PopulationSource, SkipMode,
        SleepEvaluator, SleepSettings, WorldControl, WorldKey, WorldKind,
    };
    use std::cell::Cell;

    const NIGHT: u64 = 13_000;

    fn world() -> WorldKey {
        WorldKey::new("world")
    }

    fn p(name: &str) -> PlayerId {
        PlayerId::new(name)
    }

    fn settings(counter: CounterMode, needed: i64, mode: SkipMode) -> SleepSettings {
        SleepSettings {
            counter,
            absolute_needed: needed,
            percentage_needed: needed,
            mode,
            smooth_duration_ticks: 5,
            evaluation_interval_ticks: 20,
            progress_messages: false,
            ..Default::default()
        }
    }

    /// A server with one overworld and the given players online in it.
    fn make_server(players: &[&str]) -> LocalServer {
        let mut server = LocalServer::default();
        server.load_world(world(), WorldKind::Overworld, NIGHT);
        for name in players {
            server.join(p(name), world(), false);
        }
        server
    }

    fn make_evaluator(settings: &SleepSettings, server: &LocalServer) -> SleepEvaluator {
        let mut evaluator = SleepEvaluator::new(settings).unwrap();
        evaluator.register_worlds(server);
        evaluator
    }

    fn keys_for(server: &LocalServer, player: &str) -> Vec<String> {
        server
            .messages_for(&p(player))
            .into_iter()
            .map(|d| d.key.clone())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Threshold crossing
    // -----------------------------------------------------------------------

    #[test]
    fn crossing_threshold_starts_exactly_once() {
        let mut server = make_server(&["a", "b", "c"]);
        let cfg = settings(CounterMode::Absolute, 2, SkipMode::Smooth);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        let report = ev.tick(&mut server);
        assert!(report.started.is_empty());

        ev.bed_events().on_bed_enter(&mut server, &world(), p("b"));
        let report = ev.tick(&mut server);
        assert_eq!(report.started, vec![world()]);

        // Re-entering bed while the sunrise runs must not start a second one.
        ev.bed_events().on_bed_enter(&mut server, &world(), p("b"));
        let mut starts = 0;
        for _ in 0..3 {
            starts += ev.tick(&mut server).started.len();
        }
        assert_eq!(starts, 0);
        assert_eq!(ev.stats().active_transitions, 1);
    }

    #[test]
    fn bed_event_is_evaluated_on_next_tick() {
        let mut server = make_server(&["a"]);
        let cfg = settings(CounterMode::Absolute, 1, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        // Tick a few times so the next scheduled evaluation is far away.
        for _ in 0..3 {
            ev.tick(&mut server);
        }
        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        let report = ev.tick(&mut server);
        assert_eq!(report.started, vec![world()]);
        assert_eq!(report.woke.len(), 1);
    }

    #[test]
    fn population_changes_wait_for_scheduled_evaluation() {
        let mut server = make_server(&["a", "b", "c"]);
        let cfg = settings(CounterMode::Percentage, 50, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        // 1 of 3 sleeping, 2 required.
        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        assert!(ev.tick(&mut server).started.is_empty());

        // "c" logs off without a bed event: now 1 of 2, 1 required.
        server.leave(&p("c"));
        for tick in 2..20 {
            assert!(ev.tick(&mut server).started.is_empty(), "tick {tick}");
        }
        let report = ev.tick(&mut server);
        assert_eq!(report.tick, 20);
        assert_eq!(report.started, vec![world()]);
    }

    #[test]
    fn sleepers_who_went_offline_do_not_count() {
        let mut server = make_server(&["a", "b"]);
        let cfg = settings(CounterMode::Absolute, 2, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        ev.bed_events().on_bed_enter(&mut server, &world(), p("b"));
        server.leave(&p("b"));

        let report = ev.tick(&mut server);
        assert!(report.started.is_empty());
    }

    #[test]
    fn unreachable_absolute_threshold_never_transitions() {
        let mut server = make_server(&["a", "b"]);
        let cfg = settings(CounterMode::Absolute, 5, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        ev.bed_events().on_bed_enter(&mut server, &world(), p("b"));
        for _ in 0..100 {
            assert!(ev.tick(&mut server).is_empty());
        }
        assert_eq!(server.time_of_day(&world()), Some(NIGHT));
    }

    #[test]
    fn nobody_sleeping_never_transitions() {
        // Everyone bypassed -> 0 required, but an empty bed skips nothing.
        let mut server = LocalServer::default();
        server.load_world(world(), WorldKind::Overworld, NIGHT);
        server.join(p("a"), world(), true);
        let cfg = settings(CounterMode::Percentage, 50, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        for _ in 0..40 {
            assert!(ev.tick(&mut server).is_empty());
        }
    }

    // -----------------------------------------------------------------------
    // Abort
    // -----------------------------------------------------------------------

    #[test]
    fn losing_a_sleeper_aborts_gradual_transition() {
        let mut server = make_server(&["a", "b"]);
        let cfg = settings(CounterMode::Absolute, 2, SkipMode::Smooth);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        ev.bed_events().on_bed_enter(&mut server, &world(), p("b"));
        assert_eq!(ev.tick(&mut server).started, vec![world()]);
        ev.tick(&mut server);
        ev.tick(&mut server);
        let reached = server.time_of_day(&world()).unwrap();
        assert_ne!(reached, NIGHT);

        ev.bed_events().on_bed_leave(&world(), &p("b"));
        let report = ev.tick(&mut server);
        assert_eq!(report.aborted, vec![world()]);
        assert!(report.woke.is_empty());

        // Clock is left where the sunrise got to.
        assert_eq!(server.time_of_day(&world()), Some(reached));

        let entry = ev.world(&world()).unwrap();
        assert!(!entry.session.transition_in_progress());
        assert!(entry.session.is_sleeping(&p("a")));
        assert!(!entry.transition.is_active());

        for _ in 0..10 {
            assert!(ev.tick(&mut server).woke.is_empty());
        }
        assert!(keys_for(&server, "a").is_empty());
        assert_eq!(ev.stats().completed_nights, 0);
    }

    #[test]
    fn aborted_night_can_restart() {
        let mut server = make_server(&["a", "b"]);
        let cfg = settings(CounterMode::Absolute, 2, SkipMode::Smooth);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        ev.bed_events().on_bed_enter(&mut server, &world(), p("b"));
        ev.tick(&mut server);
        ev.bed_events().on_bed_leave(&world(), &p("b"));
        assert_eq!(ev.tick(&mut server).aborted, vec![world()]);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("b"));
        assert_eq!(ev.tick(&mut server).started, vec![world()]);
    }

    // -----------------------------------------------------------------------
    // End-to-end nights
    // -----------------------------------------------------------------------

    #[test]
    fn single_sleeper_instant_night() {
        let mut server = make_server(&["sleeper", "awake"]);
        server.join(p("bypasser"), world(), true);
        let other = WorldKey::new("other");
        server.load_world(other.clone(), WorldKind::Overworld, NIGHT);
        server.join(p("elsewhere"), other.clone(), false);
        server.set_storm(&world(), true);

        let cfg = settings(CounterMode::Absolute, 1, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("sleeper"));
        let report = ev.tick(&mut server);
        assert_eq!(report.woke.len(), 1);

        let w = server.world(&world()).unwrap();
        assert_eq!(w.time, 0);
        assert!(!w.storming);
        // The other world keeps its night.
        assert_eq!(server.time_of_day(&other), Some(NIGHT));

        for name in ["sleeper", "awake", "bypasser"] {
            assert_eq!(keys_for(&server, name)[0], keys::GOOD_MORNING, "{name}");
        }
        assert!(keys_for(&server, "elsewhere").is_empty());

        assert_eq!(server.player(&p("sleeper")).unwrap().effects.len(), 2);
        assert!(server.player(&p("awake")).unwrap().effects.is_empty());
        assert!(server.player(&p("bypasser")).unwrap().effects.is_empty());

        let sleeper_msgs = server.messages_for(&p("sleeper"));
        assert_eq!(sleeper_msgs[1].key, keys::BUFF_RECEIVED);
        assert_eq!(sleeper_msgs[1].text, "You received 2 buffs for sleeping");
        assert_eq!(keys_for(&server, "awake")[1], keys::NO_BUFF_RECEIVED);
        assert_eq!(keys_for(&server, "bypasser")[1], keys::NO_BUFF_RECEIVED);

        let entry = ev.world(&world()).unwrap();
        assert_eq!(entry.session.sleeper_count(), 0);
        assert!(!entry.session.transition_in_progress());
        assert_eq!(ev.stats().completed_nights, 1);
    }

    #[test]
    fn bypassed_players_get_buffs_when_enabled() {
        let mut server = make_server(&["sleeper"]);
        server.join(p("bypasser"), world(), true);
        server.config_mut().bypass_players_get_buffs = true;

        let cfg = settings(CounterMode::Absolute, 1, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("sleeper"));
        let report = ev.tick(&mut server);

        assert_eq!(report.woke[0].buffed, vec![p("bypasser"), p("sleeper")]);
        assert_eq!(keys_for(&server, "bypasser")[1], keys::BUFF_RECEIVED);
    }

    #[test]
    fn half_of_four_players_needs_two() {
        let mut server = make_server(&["a", "b", "c", "d"]);
        let cfg = settings(CounterMode::Percentage, 50, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        assert!(ev.tick(&mut server).started.is_empty());

        ev.bed_events().on_bed_enter(&mut server, &world(), p("b"));
        let report = ev.tick(&mut server);
        assert_eq!(report.started, vec![world()]);
        assert_eq!(report.woke.len(), 1);
    }

    #[test]
    fn bypassed_players_lower_the_percentage_bar() {
        let mut server = make_server(&["a", "b"]);
        server.join(p("c"), world(), true);
        let cfg = settings(CounterMode::Percentage, 100, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        ev.bed_events().on_bed_enter(&mut server, &world(), p("b"));
        assert_eq!(ev.tick(&mut server).woke.len(), 1);
    }

    #[test]
    fn gradual_night_wakes_once_after_duration() {
        let mut server = make_server(&["a"]);
        let cfg = settings(CounterMode::Absolute, 1, SkipMode::Smooth);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        let report = ev.tick(&mut server);
        assert_eq!(report.started, vec![world()]);
        assert!(report.woke.is_empty());

        for step in 1..=4 {
            let report = ev.tick(&mut server);
            assert!(report.woke.is_empty(), "step {step}");
            assert!(ev.world(&world()).unwrap().transition.is_active());
        }

        let report = ev.tick(&mut server);
        assert_eq!(report.woke.len(), 1);
        assert_eq!(server.time_of_day(&world()), Some(0));

        let mut later = 0;
        for _ in 0..30 {
            later += ev.tick(&mut server).woke.len();
        }
        assert_eq!(later, 0);
        assert_eq!(ev.stats().completed_nights, 1);
        assert_eq!(
            keys_for(&server, "a")
                .iter()
                .filter(|k| *k == keys::GOOD_MORNING)
                .count(),
            1
        );
    }

    // -----------------------------------------------------------------------
    // World lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn only_overworlds_are_registered_by_default() {
        let mut server = make_server(&[]);
        server.load_world(WorldKey::new("world_nether"), WorldKind::Nether, 0);
        server.load_world(WorldKey::new("world_the_end"), WorldKind::End, 0);

        let cfg = settings(CounterMode::Absolute, 1, SkipMode::Setter);
        let ev = make_evaluator(&cfg, &server);
        assert!(ev.is_tracking(&world()));
        assert!(!ev.is_tracking(&WorldKey::new("world_nether")));
        assert_eq!(ev.stats().tracked_worlds, 1);

        let all = SleepSettings {
            overworld_only: false,
            ..cfg
        };
        let ev = make_evaluator(&all, &server);
        assert_eq!(ev.stats().tracked_worlds, 3);
    }

    #[test]
    fn bed_entry_in_untracked_dimension_is_ignored() {
        let end = WorldKey::new("world_the_end");
        let mut server = make_server(&[]);
        server.load_world(end.clone(), WorldKind::End, NIGHT);
        server.join(p("a"), end.clone(), false);

        let cfg = settings(CounterMode::Absolute, 1, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        let outcome = ev.bed_events().on_bed_enter(&mut server, &end, p("a"));
        assert!(!outcome.changed);
        assert_eq!(outcome.sleeping, 0);
        for _ in 0..40 {
            assert!(ev.tick(&mut server).is_empty());
        }
        assert!(!ev.is_tracking(&end));
        assert_eq!(server.time_of_day(&end), Some(NIGHT));
    }

    #[test]
    fn bed_entry_tracks_any_dimension_when_not_overworld_only() {
        let end = WorldKey::new("world_the_end");
        let mut server = make_server(&[]);
        server.load_world(end.clone(), WorldKind::End, NIGHT);
        server.join(p("a"), end.clone(), false);

        let cfg = SleepSettings {
            overworld_only: false,
            ..settings(CounterMode::Absolute, 1, SkipMode::Setter)
        };
        // Loaded after startup, so only the bed event can create the session.
        let mut ev = SleepEvaluator::new(&cfg).unwrap();

        assert!(ev.bed_events().on_bed_enter(&mut server, &end, p("a")).changed);
        assert!(ev.is_tracking(&end));
        assert_eq!(ev.tick(&mut server).woke.len(), 1);
        assert_eq!(server.time_of_day(&end), Some(0));
    }

    #[test]
    fn bed_events_in_unloaded_world_create_nothing() {
        let mut server = make_server(&["a"]);
        let cfg = settings(CounterMode::Absolute, 1, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);
        let gone = WorldKey::new("gone");

        assert!(!ev.bed_events().on_bed_enter(&mut server, &gone, p("a")).changed);
        assert!(!ev.bed_events().on_bed_leave(&gone, &p("a")).changed);
        assert!(!ev.is_tracking(&gone));
        assert_eq!(ev.stats().tracked_worlds, 1);
    }

    #[test]
    fn unregistering_drops_running_transition() {
        let mut server = make_server(&["a"]);
        let cfg = settings(CounterMode::Absolute, 1, SkipMode::Smooth);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        ev.tick(&mut server);
        assert_eq!(ev.stats().active_transitions, 1);

        assert!(ev.unregister_world(&world()));
        assert!(!ev.unregister_world(&world()));
        for _ in 0..10 {
            assert!(ev.tick(&mut server).is_empty());
        }
        assert_eq!(ev.stats().tracked_worlds, 0);
        assert!(keys_for(&server, "a").is_empty());
    }

    #[test]
    fn invalid_settings_are_rejected_at_startup() {
        let cfg = SleepSettings {
            counter: CounterMode::Absolute,
            absolute_needed: -3,
            ..Default::default()
        };
        assert!(SleepEvaluator::new(&cfg).is_err());
    }

    // -----------------------------------------------------------------------
    // Population queries
    // -----------------------------------------------------------------------

    /// Delegates to a `LocalServer` and counts population lookups.
    struct CountingHost {
        inner: LocalServer,
        lookups: Cell<usize>,
    }

    impl PopulationSource for CountingHost {
        fn loaded_worlds(&self) -> Vec<(WorldKey, WorldKind)> {
            self.inner.loaded_worlds()
        }
        fn online_players(&self, world: &WorldKey) -> Vec<PlayerId> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.online_players(world)
        }
        fn is_bypassed(&self, player: &PlayerId) -> bool {
            self.inner.is_bypassed(player)
        }
    }

    impl WorldControl for CountingHost {
        fn time_of_day(&self, world: &WorldKey) -> Option<u64> {
            self.inner.time_of_day(world)
        }
        fn set_time_of_day(&mut self, world: &WorldKey, value: u64) {
            self.inner.set_time_of_day(world, value)
        }
        fn set_storm(&mut self, world: &WorldKey, storming: bool) {
            self.inner.set_storm(world, storming)
        }
    }

    impl Messenger for CountingHost {
        fn send(
            &mut self,
            player: &PlayerId,
            key: &str,
            subs: &Substitutions,
            singular: bool,
        ) -> Result<(), HostError> {
            self.inner.send(player, key, subs, singular)
        }
        fn broadcast(
            &mut self,
            world: &WorldKey,
            key: &str,
            subs: &Substitutions,
            singular: bool,
        ) -> Result<(), HostError> {
            self.inner.broadcast(world, key, subs, singular)
        }
    }

    impl BuffGrantor for CountingHost {
        fn grant_buffs(&mut self, player: &PlayerId) -> Result<u32, HostError> {
            self.inner.grant_buffs(player)
        }
        fn buff_count(&self) -> u32 {
            self.inner.buff_count()
        }
        fn buffs_enabled(&self) -> bool {
            self.inner.buffs_enabled()
        }
        fn bypass_players_get_buffs(&self) -> bool {
            self.inner.bypass_players_get_buffs()
        }
    }

    #[test]
    fn idle_worlds_are_only_queried_when_due() {
        let mut host = CountingHost {
            inner: make_server(&["a", "b"]),
            lookups: Cell::new(0),
        };
        let cfg = settings(CounterMode::Absolute, 2, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &host.inner);

        for _ in 0..19 {
            ev.tick(&mut host);
        }
        assert_eq!(host.lookups.get(), 0);

        ev.tick(&mut host);
        let scheduled = host.lookups.get();
        assert!(scheduled > 0);

        ev.bed_events().on_bed_enter(&mut host, &world(), p("a"));
        ev.tick(&mut host);
        let after_bed = host.lookups.get();
        assert!(after_bed > scheduled);

        ev.tick(&mut host);
        assert_eq!(host.lookups.get(), after_bed);
    }

    #[test]
    fn stats_track_ticks_and_sleepers() {
        let mut server = make_server(&["a", "b"]);
        let cfg = settings(CounterMode::Absolute, 2, SkipMode::Setter);
        let mut ev = make_evaluator(&cfg, &server);

        ev.bed_events().on_bed_enter(&mut server, &world(), p("a"));
        ev.tick(&mut server);
        ev.tick(&mut server);

        let stats = ev.stats();
        assert_eq!(stats.total_ticks, 2);
        assert_eq!(stats.sleeping_players, 1);
        assert_eq!(stats.active_transitions, 0);
    }
}
