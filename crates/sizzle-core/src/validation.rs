//! Consistency and determinism checks.
//!
//! [`check_consistency`] walks a kitchen and reports every broken structural
//! invariant: slot and container back-references, container capacities,
//! touch bindings, assignment pairing, and ingredient states. A healthy
//! kitchen reports nothing after any sequence of commands.
//!
//! [`diff_kitchens`] and [`validate_determinism`] compare replicas fed the
//! same command stream.

use crate::command_queue::Command;
use crate::config::{KitchenConfig, LayoutError};
use crate::entity::Location;
use crate::fixed::{Seconds, Ticks};
use crate::id::{ActorId, EntityId, InputId, SlotId};
use crate::ingredient::ProcessState;
use crate::kitchen::Kitchen;

// ---------------------------------------------------------------------------
// Structural invariants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("slot {slot:?} names occupant {entity:?}, which does not exist")]
    MissingOccupant { slot: SlotId, entity: EntityId },
    #[error("slot {slot:?} holds {entity:?}, but the entity is at {location:?}")]
    OccupantElsewhere {
        slot: SlotId,
        entity: EntityId,
        location: Location,
    },
    #[error("{entity:?} claims slot {slot:?}, which does not hold it")]
    StraySlotClaim { entity: EntityId, slot: SlotId },
    #[error("container {container:?} holds {len} items, capacity {capacity}")]
    OverCapacity {
        container: EntityId,
        len: usize,
        capacity: usize,
    },
    #[error("container {container:?} lists {member:?}, which is not inside it")]
    MemberElsewhere { container: EntityId, member: EntityId },
    #[error("{entity:?} claims container {container:?}, which does not list it")]
    StrayContainerClaim { entity: EntityId, container: EntityId },
    #[error("{input:?} is bound to {entity:?}, which is not held by it")]
    BindingMismatch { input: InputId, entity: EntityId },
    #[error("{entity:?} is held by {input:?} without a touch binding")]
    UnboundHold { entity: EntityId, input: InputId },
    #[error("actor {actor:?} and slot {slot:?} are not paired both ways")]
    AssignmentMismatch { actor: ActorId, slot: SlotId },
    #[error("{entity:?} is {state:?}, unreachable for its kind")]
    UnreachableState { entity: EntityId, state: ProcessState },
}

/// Every invariant violation in `kitchen`. Empty when consistent.
pub fn check_consistency(kitchen: &Kitchen) -> Vec<Violation> {
    let mut violations = Vec::new();

    for workstation in kitchen.workstations() {
        let Some(occupant) = workstation.occupant() else {
            continue;
        };
        match kitchen.entity(occupant) {
            None => violations.push(Violation::MissingOccupant {
                slot: workstation.id,
                entity: occupant,
            }),
            Some(entity) if entity.location != Location::Slot(workstation.id) => {
                violations.push(Violation::OccupantElsewhere {
                    slot: workstation.id,
                    entity: occupant,
                    location: entity.location,
                })
            }
            Some(_) => {}
        }
    }

    for (id, entity) in kitchen.entities() {
        match entity.location {
            Location::Slot(slot) => {
                if kitchen.workstation(slot).and_then(|ws| ws.occupant()) != Some(id) {
                    violations.push(Violation::StraySlotClaim { entity: id, slot });
                }
            }
            Location::Container(host) => {
                if !kitchen.container(host).is_some_and(|c| c.contains(id)) {
                    violations.push(Violation::StrayContainerClaim {
                        entity: id,
                        container: host,
                    });
                }
            }
            Location::Held(input) => {
                if kitchen.touch().holder(id) != Some(input) {
                    violations.push(Violation::UnboundHold { entity: id, input });
                }
            }
            Location::Free => {}
        }

        if let Some(container) = entity.container() {
            if container.len() > container.capacity {
                violations.push(Violation::OverCapacity {
                    container: id,
                    len: container.len(),
                    capacity: container.capacity,
                });
            }
            for member in container.contents() {
                let inside = kitchen
                    .entity(*member)
                    .is_some_and(|m| m.location == Location::Container(id));
                if !inside {
                    violations.push(Violation::MemberElsewhere {
                        container: id,
                        member: *member,
                    });
                }
            }
        }

        if let Some(ingredient) = entity.ingredient() {
            let reachable = kitchen.registry().profile(ingredient.kind()).reachable();
            if !reachable.contains(&ingredient.state()) {
                violations.push(Violation::UnreachableState {
                    entity: id,
                    state: ingredient.state(),
                });
            }
        }
    }

    for (input, entity) in kitchen.touch().bindings() {
        let held = kitchen
            .entity(entity)
            .is_some_and(|e| e.location == Location::Held(input));
        if !held {
            violations.push(Violation::BindingMismatch { input, entity });
        }
    }
    for (entity, input) in kitchen.touch().reverse_bindings() {
        if kitchen.touch().held_by(input) != Some(entity) {
            violations.push(Violation::BindingMismatch { input, entity });
        }
    }

    for assignment in kitchen.assignments().assignments() {
        let paired = kitchen.assignments().actor_for(assignment.slot) == Some(assignment.actor)
            && kitchen
                .workstation(assignment.slot)
                .is_some_and(|ws| ws.assigned_actor == Some(assignment.actor));
        if !paired {
            violations.push(Violation::AssignmentMismatch {
                actor: assignment.actor,
                slot: assignment.slot,
            });
        }
    }

    violations
}

// ---------------------------------------------------------------------------
// State diff
// ---------------------------------------------------------------------------

/// Difference between two kitchens at the entity level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDiff {
    OnlyInA(EntityId),
    OnlyInB(EntityId),
    StateMismatch {
        entity: EntityId,
        description: String,
    },
}

#[derive(Debug, Clone)]
pub struct KitchenDiff {
    pub is_identical: bool,
    pub sim_state_matches: bool,
    pub slots_match: bool,
    pub entity_diffs: Vec<EntityDiff>,
}

/// Compare two kitchens entity by entity.
pub fn diff_kitchens(a: &Kitchen, b: &Kitchen) -> KitchenDiff {
    let sim_state_matches = a.sim_state == b.sim_state;
    let slots_match = a.workstations() == b.workstations();

    let mut entity_diffs = Vec::new();
    for (id, ea) in a.entities() {
        let Some(eb) = b.entity(id) else {
            entity_diffs.push(EntityDiff::OnlyInA(id));
            continue;
        };
        let mut mismatches = Vec::new();
        if ea.body != eb.body {
            mismatches.push("body");
        }
        if ea.location != eb.location {
            mismatches.push("location");
        }
        if ea.position != eb.position {
            mismatches.push("position");
        }
        if ea.hold != eb.hold {
            mismatches.push("hold");
        }
        if !mismatches.is_empty() {
            entity_diffs.push(EntityDiff::StateMismatch {
                entity: id,
                description: mismatches.join(", "),
            });
        }
    }
    for (id, _) in b.entities() {
        if a.entity(id).is_none() {
            entity_diffs.push(EntityDiff::OnlyInB(id));
        }
    }

    KitchenDiff {
        is_identical: sim_state_matches && slots_match && entity_diffs.is_empty(),
        sim_state_matches,
        slots_match,
        entity_diffs,
    }
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

/// Result of a determinism validation run.
#[derive(Debug)]
pub struct DeterminismResult {
    pub is_deterministic: bool,
    /// Tick at which divergence was first detected (if any).
    pub divergence_tick: Option<Ticks>,
    /// Hash log: (tick, hash_run1, hash_run2) for each tick.
    pub hash_log: Vec<(Ticks, u64, u64)>,
}

/// Run two kitchens built from `config` side by side for `ticks` steps of
/// `dt`, submitting each scripted command before the step of its tick, and
/// compare state hashes after every step.
pub fn validate_determinism(
    config: &KitchenConfig,
    script: &[(Ticks, Command)],
    ticks: Ticks,
    dt: Seconds,
) -> Result<DeterminismResult, LayoutError> {
    let mut kitchen_a = Kitchen::new(config.clone())?;
    let mut kitchen_b = Kitchen::new(config.clone())?;

    let mut hash_log = Vec::new();
    let mut divergence_tick = None;

    for tick in 0..ticks {
        for (_, command) in script.iter().filter(|(at, _)| *at == tick) {
            kitchen_a.submit(command.clone());
            kitchen_b.submit(command.clone());
        }
        kitchen_a.step(dt);
        kitchen_b.step(dt);

        let hash_a = kitchen_a.state_hash();
        let hash_b = kitchen_b.state_hash();
        hash_log.push((tick, hash_a, hash_b));

        if hash_a != hash_b && divergence_tick.is_none() {
            divergence_tick = Some(tick);
        }
    }

    Ok(DeterminismResult {
        is_deterministic: divergence_tick.is_none(),
        divergence_tick,
        hash_log,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::secs;
    use crate::id::InputId;
    use crate::ingredient::IngredientKind;
    use crate::test_utils::*;

    fn busy_kitchen() -> Kitchen {
        let mut kitchen = standard_kitchen();
        let tomato = kitchen.spawn_ingredient(IngredientKind::Tomato, at(FLOOR));
        kitchen.place(tomato, CUTTING_BOARD).expect("placed");
        let meat = kitchen.spawn_ingredient(IngredientKind::Meat, at(FLOOR));
        kitchen.place(meat, STOVE).expect("placed");
        tap_down(&mut kitchen, 1, MEAT_BIN);
        run_for(&mut kitchen, secs(1.0));
        kitchen
    }

    #[test]
    fn fresh_kitchen_is_consistent() {
        assert!(check_consistency(&standard_kitchen()).is_empty());
    }

    #[test]
    fn busy_kitchen_is_consistent() {
        let kitchen = busy_kitchen();
        assert_eq!(kitchen.touch().active_count(), 1);
        assert_eq!(check_consistency(&kitchen), Vec::new());
    }

    #[test]
    fn identical_runs_do_not_diff() {
        let a = busy_kitchen();
        let b = busy_kitchen();
        let diff = diff_kitchens(&a, &b);
        assert!(diff.is_identical);
        assert!(diff.entity_diffs.is_empty());
    }

    #[test]
    fn diff_detects_extra_entity_and_clock() {
        let a = busy_kitchen();
        let mut b = busy_kitchen();
        let extra = b.spawn_ingredient(IngredientKind::Cheese, at(FLOOR));
        b.step(secs(TICK));

        let diff = diff_kitchens(&a, &b);
        assert!(!diff.is_identical);
        assert!(!diff.sim_state_matches);
        assert!(diff.entity_diffs.contains(&EntityDiff::OnlyInB(extra)));
    }

    #[test]
    fn diff_detects_moved_entity() {
        let a = busy_kitchen();
        let mut b = busy_kitchen();
        drag(&mut b, 1, (3.0, 3.0));
        let diff = diff_kitchens(&a, &b);
        assert!(diff.entity_diffs.iter().any(|d| matches!(
            d,
            EntityDiff::StateMismatch { description, .. } if description.contains("position")
        )));
    }

    #[test]
    fn scripted_runs_are_deterministic() {
        let script = vec![
            (
                0,
                Command::InputBegin {
                    input: InputId(1),
                    position: at(TOMATO_BIN),
                },
            ),
            (
                3,
                Command::InputEnd {
                    input: InputId(1),
                    position: slot_center(&standard_kitchen(), CUTTING_BOARD),
                },
            ),
            (
                5,
                Command::InputBegin {
                    input: InputId(2),
                    position: slot_center(&standard_kitchen(), CUTTING_BOARD),
                },
            ),
        ];
        let result =
            validate_determinism(&standard_config(), &script, 20, secs(TICK)).expect("layout");
        assert!(result.is_deterministic);
        assert_eq!(result.hash_log.len(), 20);
        assert_eq!(result.divergence_tick, None);
    }
}
