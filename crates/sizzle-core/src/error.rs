//! Refusals raised by core operations.
//!
//! A [`Rejection`] never aborts the simulation. Module-level operations
//! return it, and the kitchen turns it into a feedback event and leaves
//! state unchanged.

use crate::id::{EntityId, InputId, SlotId};
use crate::ingredient::{IngredientKind, ProcessState, ProcessType};

/// Broad category of a [`Rejection`], for feedback collaborators that only
/// care about which kind of cue to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionClass {
    /// The action broke a placement or processing rule.
    RejectedOperation,
    /// An input or entity was already bound elsewhere.
    BindingConflict,
    /// A drop found nowhere valid to land.
    PickFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("workstation {0:?} is occupied")]
    SlotOccupied(SlotId),
    #[error("{process:?} is not allowed in state {state:?}")]
    ProcessNotAllowed {
        process: ProcessType,
        state: ProcessState,
    },
    #[error("ingredient is already processing")]
    AlreadyProcessing,
    #[error("entity is held by input {0:?}")]
    EntityHeld(InputId),
    #[error("running operation cannot be cancelled")]
    NotCancellable,
    #[error("container is full (capacity {capacity})")]
    ContainerFull { capacity: usize },
    #[error("container refuses {kind:?} in state {state:?}")]
    NotAccepted {
        kind: IngredientKind,
        state: ProcessState,
    },
    #[error("burger stack must start with a bottom bun")]
    NeedsBottomBun,
    #[error("burger stack has no room left except for the top bun")]
    NeedsTopBun,
    #[error("burger stack is already complete")]
    StackComplete,
    #[error("entity is not in this container")]
    NotAMember,
    #[error("containers cannot be placed on {0:?} workstations")]
    ContainerNotAllowed(ProcessType),
    #[error("only ingredients can go into a container")]
    NotAnIngredient,
    #[error("entity {0:?} is not a container")]
    NotAContainer(EntityId),
    #[error("entity is already placed")]
    AlreadyPlaced,
    #[error("workstation is bound to input {0:?}")]
    StrikeBound(InputId),
    #[error("strikes are disabled for the current ingredient")]
    StrikesDisabled,
    #[error("strike arrived before the minimum interval elapsed")]
    StrikeCooldown,
    #[error("{0:?} is not a strike-driven process for this ingredient")]
    NotStrikeDriven(ProcessType),
    #[error("hold gesture already dwelling")]
    HoldActive,
    #[error("input lies outside the workstation bounds")]
    OutsideSlot,
    #[error("nothing valid under the drop position")]
    NoTarget,
    #[error("input {0:?} already holds an entity")]
    InputBusy(InputId),
    #[error("input {0:?} has no active touch session")]
    NoSession(InputId),
    #[error("action {action:?} does not match workstation type {expected:?}")]
    WrongAction {
        expected: ProcessType,
        action: ProcessType,
    },
    #[error("no task is bound to workstation {0:?}")]
    NoTask(SlotId),
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    #[error("unknown workstation {0:?}")]
    UnknownSlot(SlotId),
}

impl Rejection {
    pub fn class(&self) -> RejectionClass {
        match self {
            Rejection::EntityHeld(_)
            | Rejection::InputBusy(_)
            | Rejection::StrikeBound(_)
            | Rejection::HoldActive => RejectionClass::BindingConflict,
            Rejection::NoTarget => RejectionClass::PickFailed,
            _ => RejectionClass::RejectedOperation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_conflicts_are_classified() {
        assert_eq!(
            Rejection::InputBusy(InputId(1)).class(),
            RejectionClass::BindingConflict
        );
        assert_eq!(
            Rejection::EntityHeld(InputId(2)).class(),
            RejectionClass::BindingConflict
        );
    }

    #[test]
    fn rule_violations_are_rejected_operations() {
        assert_eq!(
            Rejection::SlotOccupied(SlotId(0)).class(),
            RejectionClass::RejectedOperation
        );
        assert_eq!(
            Rejection::ContainerFull { capacity: 3 }.class(),
            RejectionClass::RejectedOperation
        );
        assert_eq!(Rejection::NoTarget.class(), RejectionClass::PickFailed);
    }

    #[test]
    fn messages_are_readable() {
        let r = Rejection::ProcessNotAllowed {
            process: ProcessType::Cut,
            state: ProcessState::Raw,
        };
        assert_eq!(r.to_string(), "Cut is not allowed in state Raw");
    }
}
