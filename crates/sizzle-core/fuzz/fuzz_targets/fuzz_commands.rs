#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sizzle_core::assignment::{TaskRequest, VisualHint};
use sizzle_core::command_queue::Command;
use sizzle_core::id::*;
use sizzle_core::ingredient::ProcessType;
use sizzle_core::test_utils::*;
use sizzle_core::validation::check_consistency;

/// A structured touch or task operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Begin { input: u8, x: u8, y: u8 },
    Move { input: u8, x: u8, y: u8 },
    End { input: u8, x: u8, y: u8 },
    Assign { actor: u8, process: u8, target: u8 },
    Unassign { actor: u8 },
    Step { ticks: u8 },
}

/// Top-level fuzz input: a sequence of operations.
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

/// Map a byte pair onto the standard layout in quarter-unit steps.
fn spot(x: u8, y: u8) -> (f64, f64) {
    (f64::from(x % 72) / 4.0, f64::from(y % 48) / 4.0)
}

fuzz_target!(|input: FuzzInput| {
    let mut kitchen = standard_kitchen();

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(300);

    for op in &input.ops[..max_ops] {
        match *op {
            FuzzOp::Begin { input, x, y } => tap_down(&mut kitchen, u64::from(input % 4), spot(x, y)),
            FuzzOp::Move { input, x, y } => drag(&mut kitchen, u64::from(input % 4), spot(x, y)),
            FuzzOp::End { input, x, y } => lift(&mut kitchen, u64::from(input % 4), spot(x, y)),
            FuzzOp::Assign {
                actor,
                process,
                target,
            } => {
                let required = [
                    ProcessType::Wash,
                    ProcessType::Cut,
                    ProcessType::Cook,
                    ProcessType::Assemble,
                    ProcessType::Table,
                ][usize::from(process % 5)];
                kitchen.submit(Command::AssignTask(TaskRequest {
                    actor: ActorId(u32::from(actor % 4)),
                    task: TaskId(u32::from(actor)),
                    required,
                    target: u32::from(target % 4),
                    hint: VisualHint::default(),
                }));
            }
            FuzzOp::Unassign { actor } => kitchen.submit(Command::UnassignTask {
                actor: ActorId(u32::from(actor % 4)),
            }),
            FuzzOp::Step { ticks } => run_ticks(&mut kitchen, u64::from(ticks % 32)),
        }

        let violations = check_consistency(&kitchen);
        assert!(violations.is_empty(), "{op:?}: {violations:?}");
    }
});
