//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::cell::RefCell;
use std::rc::Rc;

use crate::command_queue::Command;
use crate::config::{KitchenConfig, SlotConfig};
use crate::container::ContainerSpec;
use crate::entity::DispenserItem;
use crate::event::{Event, EventKind};
use crate::fixed::{Fixed64, Seconds, secs};
use crate::geometry::{Bounds, Position};
use crate::id::*;
use crate::ingredient::{Bun, IngredientKind, ProcessType};
use crate::kitchen::Kitchen;

// ===========================================================================
// Fixed-point helpers
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn pos(x: f64, y: f64) -> Position {
    Position::from_f64(x, y)
}

/// Step length used by the tick helpers. A power of two, so clocks add up
/// exactly.
pub const TICK: f64 = 0.0625;

// ===========================================================================
// Standard layout
// ===========================================================================

pub const SINK: SlotId = SlotId(0);
pub const CUTTING_BOARD: SlotId = SlotId(1);
pub const STOVE: SlotId = SlotId(2);
pub const ASSEMBLY: SlotId = SlotId(3);
pub const TABLE: SlotId = SlotId(4);

pub const TOMATO_BIN: (f64, f64) = (0.5, 4.5);
pub const LETTUCE_BIN: (f64, f64) = (2.5, 4.5);
pub const MEAT_BIN: (f64, f64) = (4.5, 4.5);
pub const CHEESE_BIN: (f64, f64) = (6.5, 4.5);
pub const BOTTOM_BUN_BIN: (f64, f64) = (8.5, 4.5);
pub const TOP_BUN_BIN: (f64, f64) = (10.5, 4.5);
pub const PLATE_STACK: (f64, f64) = (12.5, 4.5);

/// Centre of the delivery zone.
pub const PASS: (f64, f64) = (15.0, 1.0);
/// Open floor, clear of every fixture.
pub const FLOOR: (f64, f64) = (5.0, 10.0);
/// Far outside the kitchen.
pub const NOWHERE: (f64, f64) = (40.0, 40.0);

fn cell(x: f64, y: f64) -> Bounds {
    Bounds::from_f64(x, y, x + 1.0, y + 1.0)
}

/// A row of five workstations (sink, cutting board, stove with a pan,
/// assembly board with a burger stack, table), a row of dispensers above
/// them, and a delivery pass to the right.
pub fn standard_config() -> KitchenConfig {
    KitchenConfig::default()
        .with_slot(SlotConfig::new(ProcessType::Wash, cell(0.0, 0.0)))
        .with_slot(SlotConfig::new(ProcessType::Cut, cell(2.0, 0.0)))
        .with_slot(
            SlotConfig::new(ProcessType::Cook, cell(4.0, 0.0)).with_attached(ContainerSpec::pan()),
        )
        .with_slot(
            SlotConfig::new(ProcessType::Assemble, cell(6.0, 0.0))
                .with_attached(ContainerSpec::burger()),
        )
        .with_slot(SlotConfig::new(ProcessType::Table, cell(8.0, 0.0)))
        .with_dispenser(cell(0.0, 4.0), DispenserItem::Ingredient(IngredientKind::Tomato))
        .with_dispenser(cell(2.0, 4.0), DispenserItem::Ingredient(IngredientKind::Lettuce))
        .with_dispenser(cell(4.0, 4.0), DispenserItem::Ingredient(IngredientKind::Meat))
        .with_dispenser(cell(6.0, 4.0), DispenserItem::Ingredient(IngredientKind::Cheese))
        .with_dispenser(
            cell(8.0, 4.0),
            DispenserItem::Ingredient(IngredientKind::Bread(Bun::Bottom)),
        )
        .with_dispenser(
            cell(10.0, 4.0),
            DispenserItem::Ingredient(IngredientKind::Bread(Bun::Top)),
        )
        .with_dispenser(cell(12.0, 4.0), DispenserItem::Container(ContainerSpec::plate()))
        .with_delivery_zone(Bounds::from_f64(14.0, 0.0, 16.0, 2.0))
}

/// `rows` copies of the standard layout stacked [`ROW_PITCH`] apart. Row
/// `r` owns slots `5r..5r + 5`.
pub fn wide_config(rows: usize) -> KitchenConfig {
    let mut config = KitchenConfig::default();
    let template = standard_config();
    for row in 0..rows {
        let dy = fixed(ROW_PITCH * row as f64);
        let shift = |b: Bounds| Bounds::new(b.min.raised(dy), b.max.raised(dy));
        for slot in &template.slots {
            let mut slot = slot.clone();
            slot.bounds = shift(slot.bounds);
            config.slots.push(slot);
        }
        for dispenser in &template.dispensers {
            config = config.with_dispenser(shift(dispenser.bounds), dispenser.item);
        }
        for zone in &template.delivery_zones {
            config = config.with_delivery_zone(shift(zone.bounds));
        }
    }
    config
}

pub const ROW_PITCH: f64 = 20.0;

/// `spot` moved into layout row `row`.
pub fn in_row(spot: (f64, f64), row: usize) -> (f64, f64) {
    (spot.0, spot.1 + ROW_PITCH * row as f64)
}

/// One burst of line-cook work on row `row`: a patty onto the stove, a
/// tomato onto the board and a strike on it. Uses inputs
/// `10 * row + 1..=10 * row + 3`; leaves no touch open.
pub fn rush_row(kitchen: &mut Kitchen, row: usize) {
    let base = 10 * row as u64;
    let stove = in_row((4.5, 0.5), row);
    let board = in_row((2.5, 0.5), row);

    tap_down(kitchen, base + 1, in_row(MEAT_BIN, row));
    drag(kitchen, base + 1, stove);
    lift(kitchen, base + 1, stove);

    tap_down(kitchen, base + 2, in_row(TOMATO_BIN, row));
    drag(kitchen, base + 2, board);
    lift(kitchen, base + 2, board);

    tap(kitchen, base + 3, board);
}

pub fn standard_kitchen() -> Kitchen {
    match Kitchen::new(standard_config()) {
        Ok(kitchen) => kitchen,
        Err(e) => panic!("standard layout must be valid: {e}"),
    }
}

pub fn slot_center(kitchen: &Kitchen, slot: SlotId) -> Position {
    match kitchen.workstation(slot) {
        Some(ws) => ws.anchor(),
        None => panic!("no workstation {slot:?}"),
    }
}

/// The pan bolted to the stove.
pub fn stove_pan(kitchen: &Kitchen) -> EntityId {
    kitchen
        .workstation(STOVE)
        .and_then(|ws| ws.occupant())
        .expect("stove has an attached pan")
}

/// The burger stack bolted to the assembly board.
pub fn burger_board(kitchen: &Kitchen) -> EntityId {
    kitchen
        .workstation(ASSEMBLY)
        .and_then(|ws| ws.occupant())
        .expect("assembly board has an attached burger stack")
}

// ===========================================================================
// Input helpers
// ===========================================================================

/// Anything a test may touch at.
pub trait Spot {
    fn position(self) -> Position;
}

impl Spot for Position {
    fn position(self) -> Position {
        self
    }
}

impl Spot for (f64, f64) {
    fn position(self) -> Position {
        pos(self.0, self.1)
    }
}

pub fn at(spot: impl Spot) -> Position {
    spot.position()
}

pub fn tap_down(kitchen: &mut Kitchen, input: u64, spot: impl Spot) {
    kitchen.apply(Command::InputBegin {
        input: InputId(input),
        position: spot.position(),
    });
}

pub fn drag(kitchen: &mut Kitchen, input: u64, spot: impl Spot) {
    kitchen.apply(Command::InputMove {
        input: InputId(input),
        position: spot.position(),
    });
}

pub fn lift(kitchen: &mut Kitchen, input: u64, spot: impl Spot) {
    kitchen.apply(Command::InputEnd {
        input: InputId(input),
        position: spot.position(),
    });
}

/// Press and release in place: a strike on a station, nothing else.
pub fn tap(kitchen: &mut Kitchen, input: u64, spot: impl Spot) {
    let p = spot.position();
    tap_down(kitchen, input, p);
    lift(kitchen, input, p);
}

/// Tap a station, then wait out its strike cooldown so the next tap counts.
pub fn chop(kitchen: &mut Kitchen, input: u64, spot: impl Spot) {
    tap(kitchen, input, spot);
    let cooldown = kitchen.station_config().min_strike_interval;
    run_for(kitchen, cooldown);
}

/// Press and keep still until the hold fires.
pub fn hold_pick(kitchen: &mut Kitchen, input: u64, spot: impl Spot) {
    tap_down(kitchen, input, spot);
    let dwell = kitchen.hold_config().duration;
    run_for(kitchen, dwell + secs(TICK));
}

/// Carry whatever `input` holds to `spot` and let go.
pub fn drop_at(kitchen: &mut Kitchen, input: u64, spot: impl Spot) {
    let p = spot.position();
    drag(kitchen, input, p);
    lift(kitchen, input, p);
    run_ticks(kitchen, 1);
}

// ===========================================================================
// Tick helpers
// ===========================================================================

pub fn run_ticks(kitchen: &mut Kitchen, n: u64) {
    for _ in 0..n {
        kitchen.step(secs(TICK));
    }
}

/// Step in [`TICK`] increments until at least `duration` has passed.
pub fn run_for(kitchen: &mut Kitchen, duration: Seconds) {
    let tick = secs(TICK);
    let mut elapsed = Seconds::ZERO;
    while elapsed < duration {
        kitchen.step(tick);
        elapsed += tick;
    }
}

// ===========================================================================
// Event recorders
// ===========================================================================

pub type Recorded = Rc<RefCell<Vec<Event>>>;

/// Collect every delivered event of `kind`.
pub fn record_events(kitchen: &mut Kitchen, kind: EventKind) -> Recorded {
    let sink: Recorded = Rc::new(RefCell::new(Vec::new()));
    let writer = sink.clone();
    kitchen.on_passive(
        kind,
        Box::new(move |event| writer.borrow_mut().push(event.clone())),
    );
    sink
}

/// Collect every delivered event of the listed kinds, in delivery order per
/// kind.
pub fn record_all(kitchen: &mut Kitchen, kinds: &[EventKind]) -> Recorded {
    let sink: Recorded = Rc::new(RefCell::new(Vec::new()));
    for kind in kinds {
        let writer = sink.clone();
        kitchen.on_passive(
            *kind,
            Box::new(move |event| writer.borrow_mut().push(event.clone())),
        );
    }
    sink
}
