//! Property tests for the decision engine invariants.

use std::cell::RefCell;
use std::rc::Rc;

use pausegate_core::{
    evaluate, ActivityEnd, AppId, Config, Decision, DecisionEngine, EngineState, ExpiredQuickTaskRecord,
    MechanicalEvent, MemoryStateStore, QuickTaskQuota, QuotaPolicy, Session, SessionObserver,
    StateStore, TimerKind,
};
use proptest::prelude::*;

const APPS: &[&str] = &["com.a", "com.b", "com.c", "com.android.systemui"];

fn config() -> Config {
    let mut config = Config::default().with_monitored(["com.a", "com.b"]);
    config.quick_task.duration_ms = 60_000;
    config.quick_task.max_uses = 2;
    config
}

#[derive(Debug, Clone)]
enum Step {
    Foreground(usize),
    Expire(usize),
    Arm(usize, TimerKind, u64),
    Accept(usize),
    Decline(usize),
    Intention(usize, u64),
    Alternative(usize),
    FinishAlternative(usize),
    Cancel(usize),
    Continue(usize),
    Quit(usize),
}

fn step() -> impl Strategy<Value = Step> {
    let app = 0..APPS.len();
    let kind = prop_oneof![Just(TimerKind::QuickTask), Just(TimerKind::Intention)];
    prop_oneof![
        3 => app.clone().prop_map(Step::Foreground),
        2 => app.clone().prop_map(Step::Expire),
        1 => (app.clone(), kind, 1_000u64..120_000).prop_map(|(a, k, d)| Step::Arm(a, k, d)),
        1 => app.clone().prop_map(Step::Accept),
        1 => app.clone().prop_map(Step::Decline),
        1 => (app.clone(), 1_000u64..120_000).prop_map(|(a, d)| Step::Intention(a, d)),
        1 => app.clone().prop_map(Step::Alternative),
        1 => app.clone().prop_map(Step::FinishAlternative),
        1 => app.clone().prop_map(Step::Cancel),
        1 => app.clone().prop_map(Step::Continue),
        1 => app.prop_map(Step::Quit),
    ]
}

/// Apply one step at time `now`; returns the decision it produced.
fn run<S: StateStore>(engine: &mut DecisionEngine<S>, step: &Step, now: u64) -> Option<Decision> {
    let app = |i: usize| AppId::new(APPS[i]);
    let outcome = match step {
        Step::Foreground(i) => engine.handle(&MechanicalEvent::foreground_changed(APPS[*i], now)),
        Step::Expire(i) => engine.handle(&MechanicalEvent::timer_expired(APPS[*i], now)),
        Step::Arm(i, kind, d) => {
            engine.handle(&MechanicalEvent::timer_set(APPS[*i], now, *kind, now + d))
        }
        Step::Accept(i) => engine.accept_quick_task(&app(*i), now),
        Step::Decline(i) => engine.decline_quick_task(&app(*i)),
        Step::Intention(i, d) => engine.set_intention(&app(*i), *d, now),
        Step::Alternative(i) => engine.start_alternative_activity(&app(*i)),
        Step::FinishAlternative(i) => {
            engine.finish_alternative_activity(&app(*i), ActivityEnd::FinishedEarly)
        }
        Step::Cancel(i) => engine.cancel_intervention(&app(*i)),
        Step::Continue(i) => engine.post_choice_continue(&app(*i), now),
        Step::Quit(i) => engine.post_choice_quit(&app(*i)),
    };
    outcome.expect("memory store never fails").decision
}

#[derive(Clone, Default)]
struct Transitions(Rc<RefCell<Vec<(Session, Session)>>>);

impl SessionObserver for Transitions {
    fn on_session_changed(&mut self, from: &Session, to: &Session) {
        self.0.borrow_mut().push((from.clone(), to.clone()));
    }
}

proptest! {
    #[test]
    fn each_step_changes_the_session_at_most_once(steps in prop::collection::vec(step(), 1..40)) {
        let store = MemoryStateStore::new();
        let mut engine = DecisionEngine::new(&store, config());
        let seen = Transitions::default();
        engine.subscribe(Box::new(seen.clone()));

        let mut now = 0;
        for step in &steps {
            now += 7_000;
            let before = seen.0.borrow().len();
            run(&mut engine, step, now);
            let log = seen.0.borrow();
            prop_assert!(log.len() - before <= 1);
        }

        // The log is one continuous chain: nothing happens off the books.
        let log = seen.0.borrow();
        let mut current = Session::None;
        for (from, to) in log.iter() {
            prop_assert_eq!(from, &current);
            prop_assert_ne!(from, to);
            current = to.clone();
        }
        prop_assert_eq!(&current, engine.session());
    }

    #[test]
    fn cold_start_reaches_the_same_decision(
        history in prop::collection::vec(step(), 0..30),
        next in step(),
    ) {
        let store = MemoryStateStore::new();
        let mut warm = DecisionEngine::new(&store, config());
        let mut now = 0;
        for step in &history {
            now += 11_000;
            run(&mut warm, step, now);
        }
        now += 11_000;

        let snapshot = MemoryStateStore::new();
        if let Some(doc) = store.document() {
            snapshot.write(&doc).unwrap();
        }
        let mut cold = DecisionEngine::new(&snapshot, config());
        // The surface still on screen reports itself to the new process.
        if let (Some(kind), Some(app)) = (warm.session().kind(), warm.session().app()) {
            cold.on_ui_boot(kind, app.clone());
        }
        prop_assert_eq!(warm.session(), cold.session());

        let warm_decision = run(&mut warm, &next, now);
        let cold_decision = run(&mut cold, &next, now);
        prop_assert_eq!(warm_decision, cold_decision);
        prop_assert_eq!(warm.state(), cold.state());
        prop_assert_eq!(warm.session(), cold.session());
    }

    #[test]
    fn timers_for_one_app_leave_other_apps_alone(
        events in prop::collection::vec((any::<bool>(), 0u64..200_000, 1_000u64..100_000), 1..30),
    ) {
        let b = AppId::new("com.b");

        let mut initial = EngineState::with_quota(QuickTaskQuota::new(1));
        initial.timers.set_quick_task(b.clone(), 50_000, 0);
        initial.timers.set_intention(b.clone(), 500_000, 0);
        initial.last_meaningful_app = Some(b.clone());
        let record = ExpiredQuickTaskRecord::capture(&b, 1, Some(&b)).unwrap();
        initial.insert_expired_record(b.clone(), record.clone());

        let store = MemoryStateStore::with_document(serde_json::to_string(&initial).unwrap());
        let mut engine = DecisionEngine::new(&store, config());

        for (expire, at, duration) in events {
            let event = if expire {
                MechanicalEvent::timer_expired("com.a", at)
            } else {
                let kind = if duration % 2 == 0 { TimerKind::QuickTask } else { TimerKind::Intention };
                MechanicalEvent::timer_set("com.a", at, kind, at + duration)
            };
            engine.handle(&event).unwrap();

            let state = engine.state();
            prop_assert_eq!(state.timers.get(&b, TimerKind::QuickTask), initial.timers.get(&b, TimerKind::QuickTask));
            prop_assert_eq!(state.timers.get(&b, TimerKind::Intention), initial.timers.get(&b, TimerKind::Intention));
            prop_assert_eq!(state.expired_record(&b), Some(&record));
            prop_assert!(engine.session().is_none());
        }
    }

    #[test]
    fn captured_foreground_is_never_rewritten(
        switches in prop::collection::vec(0..APPS.len(), 1..20),
    ) {
        let store = MemoryStateStore::new();
        let mut engine = DecisionEngine::new(&store, config());
        let a = AppId::new("com.a");
        engine.handle(&MechanicalEvent::foreground_changed("com.a", 0)).unwrap();
        engine.accept_quick_task(&a, 0).unwrap();
        engine.handle(&MechanicalEvent::timer_expired("com.a", 60_000)).unwrap();
        let original = engine.state().expired_record(&a).cloned().unwrap();

        let mut now = 60_000;
        for i in switches {
            now += 1_000;
            engine.handle(&MechanicalEvent::foreground_changed(APPS[i], now)).unwrap();
            if let Some(record) = engine.state().expired_record(&a) {
                prop_assert_eq!(record, &original);
            }
        }
    }

    #[test]
    fn valid_quick_task_always_suppresses(
        intention in any::<bool>(),
        with_record in any::<bool>(),
        remaining in 0u32..3,
        now in 0u64..59_999,
    ) {
        let a = AppId::new("com.a");
        let mut state = EngineState::with_quota(QuickTaskQuota::new(remaining));
        state.timers.set_quick_task(a.clone(), 60_000, 0);
        state.last_meaningful_app = Some(a.clone());
        if intention {
            state.timers.set_intention(a.clone(), 10, 0);
        }
        if with_record {
            let record = ExpiredQuickTaskRecord::capture(&a, 0, Some(&a)).unwrap();
            state.insert_expired_record(a.clone(), record);
        }
        let decision = evaluate(&mut state, &Session::None, &a, now, &QuotaPolicy::default());
        prop_assert!(decision.is_suppress());
    }
}
