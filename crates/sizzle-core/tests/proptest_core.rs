//! Property-based tests for sizzle-core invariants.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use sizzle_core::assignment::{AssignmentManager, AssignmentSignal, TaskRequest, VisualHint};
use sizzle_core::command_queue::Command;
use sizzle_core::container::{Container, ContainerSpec};
use sizzle_core::fixed::{Seconds, secs};
use sizzle_core::geometry::Position;
use sizzle_core::hold::{HoldConfig, HoldGesture, HoldTick};
use sizzle_core::id::*;
use sizzle_core::ingredient::{Bun, Ingredient, IngredientKind, ProcessState, ProcessType};
use sizzle_core::kitchen::Kitchen;
use sizzle_core::registry::Registry;
use sizzle_core::station::{StationConfig, StationSession};
use sizzle_core::test_utils::*;
use sizzle_core::validation::check_consistency;

// ===========================================================================
// Strategies
// ===========================================================================

const ALL_KINDS: [IngredientKind; 6] = [
    IngredientKind::Bread(Bun::Bottom),
    IngredientKind::Bread(Bun::Top),
    IngredientKind::Lettuce,
    IngredientKind::Tomato,
    IngredientKind::Cheese,
    IngredientKind::Meat,
];

const ALL_PROCESSES: [ProcessType; 5] = [
    ProcessType::Wash,
    ProcessType::Cut,
    ProcessType::Cook,
    ProcessType::Assemble,
    ProcessType::Table,
];

/// Places worth touching in the standard kitchen.
const SPOTS: [(f64, f64); 16] = [
    TOMATO_BIN,
    LETTUCE_BIN,
    MEAT_BIN,
    CHEESE_BIN,
    BOTTOM_BUN_BIN,
    TOP_BUN_BIN,
    PLATE_STACK,
    (0.5, 0.5),
    (2.5, 0.5),
    (4.5, 0.5),
    (6.5, 0.5),
    (8.5, 0.5),
    (2.7, 0.6),
    PASS,
    FLOOR,
    NOWHERE,
];

#[derive(Debug, Clone)]
enum Action {
    Begin(u64, usize),
    Move(u64, usize),
    End(u64, usize),
    Wait(u8),
    Assign(u32, usize),
    Unassign(u32),
}

fn arb_action() -> impl Strategy<Value = Action> {
    let spot = 0..SPOTS.len();
    let input = 1u64..4;
    prop_oneof![
        3 => (input.clone(), spot.clone()).prop_map(|(i, s)| Action::Begin(i, s)),
        2 => (input.clone(), spot.clone()).prop_map(|(i, s)| Action::Move(i, s)),
        3 => (input, spot).prop_map(|(i, s)| Action::End(i, s)),
        3 => (1u8..16).prop_map(Action::Wait),
        1 => (1u32..4, 0..ALL_PROCESSES.len()).prop_map(|(a, p)| Action::Assign(a, p)),
        1 => (1u32..4).prop_map(Action::Unassign),
    ]
}

fn play(kitchen: &mut Kitchen, action: &Action) {
    match *action {
        Action::Begin(input, spot) => tap_down(kitchen, input, SPOTS[spot]),
        Action::Move(input, spot) => drag(kitchen, input, SPOTS[spot]),
        Action::End(input, spot) => lift(kitchen, input, SPOTS[spot]),
        Action::Wait(ticks) => run_ticks(kitchen, u64::from(ticks)),
        Action::Assign(actor, process) => kitchen.apply(Command::AssignTask(TaskRequest {
            actor: ActorId(actor),
            task: TaskId(actor),
            required: ALL_PROCESSES[process],
            target: 2,
            hint: VisualHint::default(),
        })),
        Action::Unassign(actor) => kitchen.apply(Command::UnassignTask {
            actor: ActorId(actor),
        }),
    }
}

/// Durations in whole ticks, so sums are exact.
fn arb_ticks(max: u32) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..=max, 1..40)
}

fn tick_secs(n: u32) -> Seconds {
    secs(TICK) * Seconds::from_num(n)
}

// ===========================================================================
// Kitchen-level properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn random_sessions_stay_consistent(actions in prop::collection::vec(arb_action(), 1..80)) {
        let mut kitchen = standard_kitchen();
        for action in &actions {
            play(&mut kitchen, action);
            let violations = check_consistency(&kitchen);
            prop_assert!(violations.is_empty(), "after {:?}: {:?}", action, violations);
        }
    }

    #[test]
    fn states_never_move_backwards(actions in prop::collection::vec(arb_action(), 1..80)) {
        let mut kitchen = standard_kitchen();
        let mut seen: HashMap<EntityId, ProcessState> = HashMap::new();
        for action in &actions {
            play(&mut kitchen, action);
            for (id, entity) in kitchen.entities() {
                let Some(ingredient) = entity.ingredient() else { continue };
                if let Some(before) = seen.insert(id, ingredient.state()) {
                    prop_assert!(ingredient.state() >= before, "{:?} went {:?} -> {:?}", id, before, ingredient.state());
                }
            }
        }
    }

    #[test]
    fn exclusive_ownership_holds(actions in prop::collection::vec(arb_action(), 1..80)) {
        let mut kitchen = standard_kitchen();
        for action in &actions {
            play(&mut kitchen, action);

            let mut held = HashSet::new();
            for (_, entity) in kitchen.touch().bindings() {
                prop_assert!(held.insert(entity), "{:?} bound twice", entity);
            }

            let mut occupants = HashSet::new();
            for ws in kitchen.workstations() {
                if let Some(occupant) = ws.occupant() {
                    prop_assert!(occupants.insert(occupant), "{:?} on two slots", occupant);
                }
            }

            for (_, entity) in kitchen.entities() {
                if let Some(container) = entity.container() {
                    prop_assert!(container.len() <= container.capacity);
                }
            }

            let mut slots = HashSet::new();
            for assignment in kitchen.assignments().assignments() {
                prop_assert!(slots.insert(assignment.slot));
                prop_assert_ne!(assignment.required, ProcessType::Table);
            }
        }
    }

    #[test]
    fn same_script_same_hash(actions in prop::collection::vec(arb_action(), 1..40)) {
        let mut a = standard_kitchen();
        let mut b = standard_kitchen();
        for action in &actions {
            play(&mut a, action);
            play(&mut b, action);
        }
        run_ticks(&mut a, 1);
        run_ticks(&mut b, 1);
        prop_assert_eq!(a.state_hash(), b.state_hash());
    }
}

// ===========================================================================
// Component properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn hold_fires_once_iff_dwell_reached(ticks in arb_ticks(4)) {
        let config = HoldConfig::default();
        let mut gesture = HoldGesture::new();
        gesture.start(InputId(1), Position::ORIGIN, None).unwrap();

        let mut elapsed = Seconds::ZERO;
        let mut fired_at = None;
        for n in &ticks {
            let dt = tick_secs(*n);
            elapsed += dt;
            if let HoldTick::Fired(input) = gesture.tick(dt, &config) {
                prop_assert_eq!(input, InputId(1));
                prop_assert!(fired_at.is_none(), "fired twice");
                fired_at = Some(elapsed);
            }
        }
        if elapsed >= config.duration {
            let at = fired_at.expect("dwell reached without firing");
            prop_assert!(at >= config.duration);
            prop_assert!(at - config.duration < secs(0.25));
        } else {
            prop_assert!(fired_at.is_none());
        }
    }

    #[test]
    fn drift_past_radius_never_fires(ticks in arb_ticks(4), drift in 0.26f64..5.0) {
        let config = HoldConfig::default();
        let mut gesture = HoldGesture::new();
        gesture.start(InputId(1), Position::ORIGIN, None).unwrap();
        gesture.track(InputId(1), Position::from_f64(drift, 0.0));
        for n in &ticks {
            prop_assert!(!matches!(gesture.tick(tick_secs(*n), &config), HoldTick::Fired(_)));
        }
        prop_assert!(!gesture.is_dwelling());
    }

    #[test]
    fn meat_race_outcome_depends_only_on_total_time(ticks in arb_ticks(8)) {
        let registry = Registry::standard();
        let profile = registry.profile(IngredientKind::Meat);
        let mut meat = Ingredient::new(IngredientKind::Meat, &registry);
        meat.start_process(ProcessType::Cook, profile, None).unwrap();

        let mut total = Seconds::ZERO;
        for n in &ticks {
            let dt = tick_secs(*n);
            total += dt;
            meat.tick(dt, profile);
        }
        let expected = if total >= secs(6.0) {
            ProcessState::Burned
        } else if total >= secs(3.0) {
            ProcessState::Cooked
        } else {
            ProcessState::Raw
        };
        prop_assert_eq!(meat.state(), expected);
        prop_assert_eq!(meat.is_processing(), total < secs(6.0));
    }

    #[test]
    fn plate_takes_exactly_finished_food(
        kind in 0..ALL_KINDS.len(),
        steps in prop::collection::vec((0..3usize, 1u32..20), 0..12),
    ) {
        let registry = Registry::standard();
        let kind = ALL_KINDS[kind];
        let profile = registry.profile(kind);
        let mut ingredient = Ingredient::new(kind, &registry);
        let plate = Container::new(ContainerSpec::plate());

        for (process, amount) in steps {
            let process = ALL_PROCESSES[process];
            let before = ingredient.state();
            ingredient.start_process(process, profile, None).ok();
            if ingredient.is_processing() {
                ingredient.tick(tick_secs(amount), profile);
            } else {
                for _ in 0..amount {
                    if ingredient.strike(process, profile).is_err() {
                        break;
                    }
                }
            }
            prop_assert!(ingredient.state() >= before);
            prop_assert_eq!(
                plate.can_accept(&ingredient).is_ok(),
                ingredient.state().is_finished()
            );
        }
    }

    #[test]
    fn strikes_respect_minimum_interval(
        steps in prop::collection::vec((0u32..8, any::<bool>()), 1..40),
    ) {
        let config = StationConfig::default();
        let mut session = StationSession::default();
        let (input, ingredient) = (InputId(1), EntityId::default());

        let mut now = Seconds::ZERO;
        let mut last: Option<Seconds> = None;
        for (gap, lifted) in steps {
            // A lifted finger frees the station, not the cooldown.
            if lifted {
                session.release(input);
            }
            now += tick_secs(gap);
            let expected = last.is_none_or(|t| now - t >= config.min_strike_interval);
            let accepted = session.admit(input, ingredient, now, &config).is_ok();
            prop_assert_eq!(accepted, expected);
            if accepted {
                session.record(input, ingredient, now, false);
                last = Some(now);
            }
        }
    }

    #[test]
    fn assignment_signals_once_per_request(
        requests in prop::collection::vec((1u32..5, 0..ALL_PROCESSES.len()), 1..30),
    ) {
        let mut manager = AssignmentManager::new(secs(10.0));
        manager.register_slot(SlotId(0), ProcessType::Wash);
        manager.register_slot(SlotId(1), ProcessType::Cut);
        manager.register_slot(SlotId(2), ProcessType::Cook);
        manager.register_slot(SlotId(3), ProcessType::Table);

        for (actor, process) in requests {
            let actor = ActorId(actor);
            let required = ALL_PROCESSES[process];
            let request = TaskRequest {
                actor,
                task: TaskId(1),
                required,
                target: 1,
                hint: VisualHint::default(),
            };
            let already = manager.assignment(actor).map(|a| a.required) == Some(required);
            let signals = manager.assign(request, Seconds::ZERO);
            if already {
                prop_assert!(signals.is_empty());
                continue;
            }
            let verdicts = signals
                .iter()
                .filter(|s| matches!(s, AssignmentSignal::Assigned { .. } | AssignmentSignal::Failed { .. }))
                .count();
            let parked = required == ProcessType::Assemble;
            prop_assert_eq!(verdicts, if parked { 0 } else { 1 });

            let mut actors_per_slot = HashMap::new();
            for assignment in manager.assignments() {
                prop_assert!(actors_per_slot.insert(assignment.slot, assignment.actor).is_none());
                prop_assert_eq!(manager.actor_for(assignment.slot), Some(assignment.actor));
            }
        }
    }
}
