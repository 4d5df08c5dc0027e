//! Read-only snapshots of kitchen state.
//!
//! Owned copies for feedback collaborators (rendering, audio, UI); nothing
//! here borrows from the kitchen's internal storage.

use crate::container::ContainerKind;
use crate::entity::Location;
use crate::fixed::{Fixed64, Seconds};
use crate::geometry::Position;
use crate::id::{ActorId, EntityId, InputId, SlotId};
use crate::ingredient::{IngredientKind, ProcessSet, ProcessState, ProcessType};

// ---------------------------------------------------------------------------
// Ingredient snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientSnapshot {
    pub id: EntityId,
    pub kind: IngredientKind,
    pub state: ProcessState,
    pub allowed_processes: ProcessSet,
    pub is_processing: bool,
    /// Process of the running timed operation, if any.
    pub active_process: Option<ProcessType>,
    pub current_timer: Seconds,
    /// `current_timer / processing_time`, clamped to `[0, 1]`.
    pub progress: Fixed64,
    pub current_strikes: u32,
    pub location: Location,
    pub position: Position,
    /// Input currently dragging or dwelling on this ingredient.
    pub held_by: Option<InputId>,
}

// ---------------------------------------------------------------------------
// Container snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub id: EntityId,
    pub kind: ContainerKind,
    pub capacity: usize,
    /// Stacking order, bottom first.
    pub contents: Vec<EntityId>,
    pub is_complete: bool,
    pub location: Location,
    pub position: Position,
}

// ---------------------------------------------------------------------------
// Slot snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub id: SlotId,
    pub process: ProcessType,
    pub occupant: Option<EntityId>,
    pub has_attached_container: bool,
    pub assigned_actor: Option<ActorId>,
    /// Input the station's strike session is bound to.
    pub strike_input: Option<InputId>,
}
