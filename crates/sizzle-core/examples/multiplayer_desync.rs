//! Multiplayer desync detection: determinism verification.
//!
//! Feeds two kitchens the same command stream and compares their state
//! hashes after every step. Then lets one replica miss a single touch and
//! shows where the hashes split.
//!
//! Run with: `cargo run -p sizzle-core --example multiplayer_desync`

use sizzle_core::command_queue::Command;
use sizzle_core::config::{KitchenConfig, SlotConfig};
use sizzle_core::entity::DispenserItem;
use sizzle_core::fixed::secs;
use sizzle_core::geometry::{Bounds, Position};
use sizzle_core::id::*;
use sizzle_core::ingredient::{IngredientKind, ProcessType};
use sizzle_core::kitchen::Kitchen;
use sizzle_core::validation::{diff_kitchens, validate_determinism};

fn layout() -> KitchenConfig {
    KitchenConfig::default()
        .with_slot(SlotConfig::new(
            ProcessType::Cut,
            Bounds::from_f64(0.0, 0.0, 1.0, 1.0),
        ))
        .with_dispenser(
            Bounds::from_f64(0.0, 4.0, 1.0, 5.0),
            DispenserItem::Ingredient(IngredientKind::Tomato),
        )
}

/// Take a tomato, put it on the board, strike it three times.
fn script() -> Vec<(u64, Command)> {
    let bin = Position::from_f64(0.5, 4.5);
    let board = Position::from_f64(0.5, 0.5);
    let input = InputId(1);
    let mut script = vec![
        (0, Command::InputBegin { input, position: bin }),
        (2, Command::InputMove { input, position: board }),
        (3, Command::InputEnd { input, position: board }),
    ];
    for i in 0..3 {
        let tick = 6 + 4 * i;
        script.push((tick, Command::InputBegin { input, position: board }));
        script.push((tick + 1, Command::InputEnd { input, position: board }));
    }
    script
}

fn main() {
    let dt = secs(1.0 / 16.0);

    match validate_determinism(&layout(), &script(), 30, dt) {
        Ok(result) => {
            println!("deterministic: {}", result.is_deterministic);
            if let Some((tick, a, _)) = result.hash_log.last() {
                println!("final hash at tick {tick}: {a:#018x}");
            }
        }
        Err(e) => {
            eprintln!("bad layout: {e}");
            return;
        }
    }

    // Replica B drops the last strike.
    let (Ok(mut a), Ok(mut b)) = (Kitchen::new(layout()), Kitchen::new(layout())) else {
        return;
    };
    let script = script();
    let skipped = script.len() - 2;
    for tick in 0..30 {
        for (i, (at, command)) in script.iter().enumerate() {
            if *at != tick {
                continue;
            }
            a.submit(command.clone());
            if i != skipped {
                b.submit(command.clone());
            }
        }
        a.step(dt);
        b.step(dt);
        if a.state_hash() != b.state_hash() {
            println!("desync detected at tick {tick}");
            let diff = diff_kitchens(&a, &b);
            for entity in diff.entity_diffs {
                println!("  {entity:?}");
            }
            break;
        }
    }
}
