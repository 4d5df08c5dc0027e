//! Replica agreement tests.
//!
//! Every client runs its own kitchen from the same command stream. These
//! tests replay recorded service scripts on independent replicas and
//! compare state hashes and entity diffs.

use sizzle_core::command_queue::Command;
use sizzle_core::fixed::{Ticks, secs};
use sizzle_core::geometry::Position;
use sizzle_core::id::*;
use sizzle_core::kitchen::Kitchen;
use sizzle_core::test_utils::*;
use sizzle_core::validation::{EntityDiff, diff_kitchens, validate_determinism};

fn begin(input: u64, spot: impl Spot) -> Command {
    Command::InputBegin {
        input: InputId(input),
        position: at(spot),
    }
}

fn moved(input: u64, spot: impl Spot) -> Command {
    Command::InputMove {
        input: InputId(input),
        position: at(spot),
    }
}

fn end(input: u64, spot: impl Spot) -> Command {
    Command::InputEnd {
        input: InputId(input),
        position: at(spot),
    }
}

fn center(slot: SlotId) -> Position {
    slot_center(&standard_kitchen(), slot)
}

/// Three players over two seconds: a tomato cut, a patty on the stove, a
/// lettuce washed, and a plate carried to the table.
fn service_script() -> Vec<(Ticks, Command)> {
    let mut script = vec![
        (0, begin(1, TOMATO_BIN)),
        (0, begin(2, MEAT_BIN)),
        (1, begin(3, LETTUCE_BIN)),
        (2, moved(1, center(CUTTING_BOARD))),
        (2, moved(2, center(STOVE))),
        (3, end(1, center(CUTTING_BOARD))),
        (3, end(2, center(STOVE))),
        (4, moved(3, center(SINK))),
        (5, end(3, center(SINK))),
    ];
    for i in 0..3 {
        let t = 8 + 5 * i;
        script.push((t, begin(1, center(CUTTING_BOARD))));
        script.push((t + 1, end(1, center(CUTTING_BOARD))));
        script.push((t + 2, begin(3, center(SINK))));
        script.push((t + 3, end(3, center(SINK))));
    }
    script.push((25, begin(2, PLATE_STACK)));
    script.push((27, moved(2, center(TABLE))));
    script.push((28, end(2, center(TABLE))));
    script
}

fn replay(script: &[(Ticks, Command)], ticks: Ticks) -> Kitchen {
    let mut kitchen = standard_kitchen();
    for tick in 0..ticks {
        for (_, command) in script.iter().filter(|(at, _)| *at == tick) {
            kitchen.submit(command.clone());
        }
        kitchen.step(secs(TICK));
    }
    kitchen
}

#[test]
fn service_script_is_deterministic() {
    let result = validate_determinism(&standard_config(), &service_script(), 64, secs(TICK))
        .expect("standard layout");
    assert!(result.is_deterministic, "diverged at {:?}", result.divergence_tick);
    assert_eq!(result.hash_log.len(), 64);

    // The hash actually moves as the service goes on.
    let first = result.hash_log[0].1;
    let last = result.hash_log[63].1;
    assert_ne!(first, last);
}

#[test]
fn replicas_built_apart_agree() {
    let script = service_script();
    let a = replay(&script, 64);
    let b = replay(&script, 64);
    assert_eq!(a.state_hash(), b.state_hash());
    assert!(diff_kitchens(&a, &b).is_identical);
    assert_eq!(a.entity_count(), b.entity_count());
}

#[test]
fn a_dropped_touch_is_caught() {
    let script = service_script();
    let mut lossy = script.clone();
    // Replica B never sees the last wash strike.
    let last_wash = lossy
        .iter()
        .rposition(|(_, c)| matches!(c, Command::InputBegin { input: InputId(3), .. }))
        .expect("script washes");
    lossy.remove(last_wash);

    let a = replay(&script, 64);
    let b = replay(&lossy, 64);
    assert_ne!(a.state_hash(), b.state_hash());

    let diff = diff_kitchens(&a, &b);
    assert!(!diff.is_identical);
    assert!(diff.sim_state_matches);
    assert!(diff.entity_diffs.iter().any(|d| matches!(
        d,
        EntityDiff::StateMismatch { description, .. } if description.contains("body")
    )));
}

#[test]
fn event_feed_matches_between_replicas() {
    use sizzle_core::event::EventKind;

    let script = service_script();
    let kinds = [
        EventKind::EntitySpawned,
        EventKind::StrikeAccepted,
        EventKind::ProcessCompleted,
        EventKind::SlotOccupied,
    ];
    let mut a = standard_kitchen();
    let mut b = standard_kitchen();
    let feed_a = record_all(&mut a, &kinds);
    let feed_b = record_all(&mut b, &kinds);
    for tick in 0..64 {
        for (_, command) in script.iter().filter(|(at, _)| *at == tick) {
            a.submit(command.clone());
            b.submit(command.clone());
        }
        a.step(secs(TICK));
        b.step(secs(TICK));
    }
    assert!(!feed_a.borrow().is_empty());
    assert_eq!(*feed_a.borrow(), *feed_b.borrow());
}
