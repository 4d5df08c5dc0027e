//! Containers: plates, pans, burger stacks, trays.
//!
//! A container is itself a movable entity that can occupy a workstation; it
//! holds an ordered list of ingredient entities. Insertion order is stacking
//! order, and the n-th member sits `n * stack_offset` above the container's
//! anchor.

use crate::error::Rejection;
use crate::fixed::Fixed64;
use crate::id::EntityId;
use crate::ingredient::{Bun, Ingredient, IngredientKind, ProcessType};
use serde::{Deserialize, Serialize};

/// What a container is for. Each kind has its own acceptance rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Takes only finished (Cut or Cooked) ingredients.
    Plate,
    /// Takes whatever can be cooked.
    Pan,
    /// Burger assembly: bottom bun first, ready fillings, top bun last.
    Burger,
    /// Takes anything.
    Tray,
}

impl ContainerKind {
    pub fn from_name(name: &str) -> Option<ContainerKind> {
        match name {
            "plate" => Some(ContainerKind::Plate),
            "pan" => Some(ContainerKind::Pan),
            "burger" => Some(ContainerKind::Burger),
            "tray" => Some(ContainerKind::Tray),
            _ => None,
        }
    }
}

/// Construction parameters for a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub kind: ContainerKind,
    pub capacity: usize,
    pub stack_offset: Fixed64,
}

impl ContainerSpec {
    pub fn plate() -> Self {
        Self {
            kind: ContainerKind::Plate,
            capacity: 4,
            stack_offset: Fixed64::from_num(0.05),
        }
    }

    pub fn pan() -> Self {
        Self {
            kind: ContainerKind::Pan,
            capacity: 2,
            stack_offset: Fixed64::from_num(0.02),
        }
    }

    pub fn burger() -> Self {
        Self {
            kind: ContainerKind::Burger,
            capacity: 6,
            stack_offset: Fixed64::from_num(0.1),
        }
    }

    pub fn tray() -> Self {
        Self {
            kind: ContainerKind::Tray,
            capacity: 8,
            stack_offset: Fixed64::from_num(0.05),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub kind: ContainerKind,
    pub capacity: usize,
    pub stack_offset: Fixed64,
    contents: Vec<EntityId>,
    /// Burger only: a top bun has been placed.
    complete: bool,
    /// Burger only: the stack has been completed at least once.
    completed_once: bool,
}

impl Container {
    pub fn new(spec: ContainerSpec) -> Self {
        Self {
            kind: spec.kind,
            capacity: spec.capacity,
            stack_offset: spec.stack_offset,
            contents: Vec::with_capacity(spec.capacity),
            complete: false,
            completed_once: false,
        }
    }

    pub fn contents(&self) -> &[EntityId] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.contents.len() >= self.capacity
    }

    /// Burger stacks are complete once the top bun is on.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True once the stack has ever been completed, even if the top bun was
    /// taken off again since.
    pub fn has_been_completed(&self) -> bool {
        self.completed_once
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.contents.contains(&id)
    }

    /// The most recently stacked member.
    pub fn top(&self) -> Option<EntityId> {
        self.contents.last().copied()
    }

    /// Stacking offset for the member at `index`.
    pub fn offset_for(&self, index: usize) -> Fixed64 {
        self.stack_offset.saturating_mul(Fixed64::from_num(index as u32))
    }

    /// Whether `ingredient` may be added right now.
    pub fn can_accept(&self, ingredient: &Ingredient) -> Result<(), Rejection> {
        if self.is_full() {
            return Err(Rejection::ContainerFull {
                capacity: self.capacity,
            });
        }
        let refused = Rejection::NotAccepted {
            kind: ingredient.kind(),
            state: ingredient.state(),
        };
        match self.kind {
            ContainerKind::Tray => Ok(()),
            ContainerKind::Plate => {
                if ingredient.state().is_finished() {
                    Ok(())
                } else {
                    Err(refused)
                }
            }
            ContainerKind::Pan => {
                if ingredient.can_process(ProcessType::Cook) {
                    Ok(())
                } else {
                    Err(refused)
                }
            }
            ContainerKind::Burger => self.burger_accepts(ingredient, refused),
        }
    }

    fn burger_accepts(&self, ingredient: &Ingredient, refused: Rejection) -> Result<(), Rejection> {
        if self.complete {
            return Err(Rejection::StackComplete);
        }
        let kind = ingredient.kind();
        if self.contents.is_empty() {
            return if kind == IngredientKind::Bread(Bun::Bottom) {
                Ok(())
            } else {
                Err(Rejection::NeedsBottomBun)
            };
        }
        match kind {
            IngredientKind::Bread(Bun::Top) => Ok(()),
            IngredientKind::Bread(Bun::Bottom) => Err(refused),
            _ => {
                // The last free place is reserved for the top bun.
                if self.contents.len() + 1 >= self.capacity {
                    return Err(Rejection::NeedsTopBun);
                }
                if ingredient.is_burger_ready() {
                    Ok(())
                } else {
                    Err(refused)
                }
            }
        }
    }

    /// Append `id` on top of the stack. Returns its stack index. Leaves the
    /// container untouched on rejection.
    pub fn add(&mut self, id: EntityId, ingredient: &Ingredient) -> Result<usize, Rejection> {
        self.can_accept(ingredient)?;
        if self.contains(id) {
            return Err(Rejection::NotAccepted {
                kind: ingredient.kind(),
                state: ingredient.state(),
            });
        }
        self.contents.push(id);
        if self.kind == ContainerKind::Burger
            && ingredient.kind() == IngredientKind::Bread(Bun::Top)
        {
            self.complete = true;
            self.completed_once = true;
        }
        Ok(self.contents.len() - 1)
    }

    /// Detach a member. Fails if `id` is not in this container.
    pub fn remove(&mut self, id: EntityId) -> Result<(), Rejection> {
        let index = self
            .contents
            .iter()
            .position(|c| *c == id)
            .ok_or(Rejection::NotAMember)?;
        self.contents.remove(index);
        // Taking anything off a finished burger reopens it; only the top bun
        // can be taken off first because picks come off the top.
        self.complete = false;
        Ok(())
    }

    /// Detach and return the top member.
    pub fn pop(&mut self) -> Option<EntityId> {
        let id = self.contents.pop()?;
        self.complete = false;
        Some(id)
    }
}
