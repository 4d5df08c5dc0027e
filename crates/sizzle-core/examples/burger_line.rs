//! Burger line example: one cook, one burger, start to finish.
//!
//! Builds a small kitchen (stove with a pan, assembly board, dispensers and
//! a delivery pass), then plays the touches a player would make: a patty
//! onto the stove, buns onto the board, the cooked patty onto the bun, and
//! the finished burger to the pass. Events are printed as they arrive.
//!
//! Run with: `cargo run -p sizzle-core --example burger_line`

use sizzle_core::command_queue::Command;
use sizzle_core::config::{KitchenConfig, SlotConfig};
use sizzle_core::container::ContainerSpec;
use sizzle_core::entity::DispenserItem;
use sizzle_core::event::{Event, EventKind};
use sizzle_core::fixed::{Seconds, secs};
use sizzle_core::geometry::{Bounds, Position};
use sizzle_core::id::*;
use sizzle_core::ingredient::{Bun, IngredientKind, ProcessType};
use sizzle_core::kitchen::Kitchen;

const DT: f64 = 1.0 / 16.0;

fn touch(kitchen: &mut Kitchen, from: Position, to: Position) {
    let input = InputId(1);
    kitchen.apply(Command::InputBegin {
        input,
        position: from,
    });
    kitchen.apply(Command::InputMove {
        input,
        position: to,
    });
    kitchen.apply(Command::InputEnd {
        input,
        position: to,
    });
    kitchen.step(secs(DT));
}

/// Press and keep still until the hold fires, then carry to `to`.
fn hold_and_carry(kitchen: &mut Kitchen, from: Position, to: Position) {
    let input = InputId(1);
    kitchen.apply(Command::InputBegin {
        input,
        position: from,
    });
    let dwell = kitchen.hold_config().duration;
    wait(kitchen, dwell + secs(DT));
    kitchen.apply(Command::InputMove {
        input,
        position: to,
    });
    kitchen.apply(Command::InputEnd {
        input,
        position: to,
    });
    kitchen.step(secs(DT));
}

fn wait(kitchen: &mut Kitchen, duration: Seconds) {
    let mut elapsed = Seconds::ZERO;
    while elapsed < duration {
        kitchen.step(secs(DT));
        elapsed += secs(DT);
    }
}

fn main() {
    let config = KitchenConfig::default()
        .with_slot(
            SlotConfig::new(ProcessType::Cook, Bounds::from_f64(0.0, 0.0, 1.0, 1.0))
                .with_attached(ContainerSpec::pan()),
        )
        .with_slot(
            SlotConfig::new(ProcessType::Assemble, Bounds::from_f64(2.0, 0.0, 3.0, 1.0))
                .with_attached(ContainerSpec::burger()),
        )
        .with_dispenser(
            Bounds::from_f64(0.0, 4.0, 1.0, 5.0),
            DispenserItem::Ingredient(IngredientKind::Meat),
        )
        .with_dispenser(
            Bounds::from_f64(2.0, 4.0, 3.0, 5.0),
            DispenserItem::Ingredient(IngredientKind::Bread(Bun::Bottom)),
        )
        .with_dispenser(
            Bounds::from_f64(4.0, 4.0, 5.0, 5.0),
            DispenserItem::Ingredient(IngredientKind::Bread(Bun::Top)),
        )
        .with_delivery_zone(Bounds::from_f64(8.0, 0.0, 10.0, 2.0));

    let mut kitchen = match Kitchen::new(config) {
        Ok(kitchen) => kitchen,
        Err(e) => {
            eprintln!("bad layout: {e}");
            return;
        }
    };

    for kind in [
        EventKind::ProcessCompleted,
        EventKind::ProcessCancelled,
        EventKind::InvalidPlacement,
        EventKind::DeliveryResult,
    ] {
        kitchen.on_passive(
            kind,
            Box::new(|event: &Event| println!("  [tick {:>3}] {:?}", event.tick(), event)),
        );
    }

    let stove = Position::from_f64(0.5, 0.5);
    let board = Position::from_f64(2.5, 0.5);

    println!("Patty onto the stove...");
    touch(&mut kitchen, Position::from_f64(0.5, 4.5), stove);
    wait(&mut kitchen, secs(3.5));

    println!("Bottom bun onto the board...");
    touch(&mut kitchen, Position::from_f64(2.5, 4.5), board);

    println!("Patty off the stove, onto the bun...");
    hold_and_carry(&mut kitchen, stove, board);

    println!("Top bun...");
    touch(&mut kitchen, Position::from_f64(4.5, 4.5), board);

    if let Some(burger) = kitchen
        .workstation(SlotId(1))
        .and_then(|ws| ws.occupant())
        .and_then(|id| kitchen.container_snapshot(id))
    {
        println!(
            "Burger: {} layers, complete: {}",
            burger.contents.len(),
            burger.is_complete
        );
    }
    println!(
        "Tick {}, clock {:.2}s, state hash {:#018x}",
        kitchen.tick(),
        kitchen.clock().to_num::<f64>(),
        kitchen.state_hash()
    );
}
