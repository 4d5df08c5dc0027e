//! Workstations, dispensers and delivery zones: the static fixtures of a
//! kitchen, allocated once and addressed by dense ids.

use crate::container::{Container, ContainerKind};
use crate::entity::DispenserItem;
use crate::error::Rejection;
use crate::geometry::{Bounds, Position};
use crate::id::{ActorId, DispenserId, EntityId, SlotId, ZoneId};
use crate::ingredient::{Ingredient, ProcessType};

/// The thing asking to be placed.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    Ingredient(&'a Ingredient),
    Container(&'a Container),
}

/// How an accepted candidate lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The candidate becomes the slot's occupant.
    Occupy,
    /// The candidate goes into the container occupying the slot; the
    /// slot's own occupant does not change.
    IntoContainer(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workstation {
    pub id: SlotId,
    pub process: ProcessType,
    pub bounds: Bounds,
    occupant: Option<EntityId>,
    /// The occupant is a permanently attached container (a fixed pan).
    attached: bool,
    pub assigned_actor: Option<ActorId>,
}

impl Workstation {
    pub fn new(id: SlotId, process: ProcessType, bounds: Bounds) -> Self {
        Self {
            id,
            process,
            bounds,
            occupant: None,
            attached: false,
            assigned_actor: None,
        }
    }

    pub fn occupant(&self) -> Option<EntityId> {
        self.occupant
    }

    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn has_attached_container(&self) -> bool {
        self.attached
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.bounds.contains(position)
    }

    /// Where occupants sit.
    pub fn anchor(&self) -> Position {
        self.bounds.center()
    }

    /// Slots of these types take containers.
    pub fn takes_containers(&self) -> bool {
        matches!(
            self.process,
            ProcessType::Cook | ProcessType::Assemble | ProcessType::Table
        )
    }

    /// Decide whether `entity` may be placed here. `host` is the container
    /// currently occupying the slot, if the occupant is one. Pure: the
    /// kitchen applies the result.
    pub fn admit(
        &self,
        entity: EntityId,
        candidate: Candidate<'_>,
        host: Option<&Container>,
    ) -> Result<Admission, Rejection> {
        if self.occupant == Some(entity) {
            return Ok(Admission::Occupy);
        }
        if let (Some(occupant), Some(host)) = (self.occupant, host) {
            return match candidate {
                Candidate::Ingredient(ingredient) => {
                    host.can_accept(ingredient)?;
                    Ok(Admission::IntoContainer(occupant))
                }
                Candidate::Container(_) => Err(Rejection::SlotOccupied(self.id)),
            };
        }
        if self.occupant.is_some() {
            return Err(Rejection::SlotOccupied(self.id));
        }
        match candidate {
            Candidate::Container(_) if self.takes_containers() => Ok(Admission::Occupy),
            Candidate::Container(_) => Err(Rejection::ContainerNotAllowed(self.process)),
            Candidate::Ingredient(_) if self.process == ProcessType::Table => Ok(Admission::Occupy),
            Candidate::Ingredient(ingredient) => {
                if ingredient.is_processing() {
                    return Err(Rejection::AlreadyProcessing);
                }
                if ingredient.can_process(self.process) {
                    Ok(Admission::Occupy)
                } else {
                    Err(Rejection::ProcessNotAllowed {
                        process: self.process,
                        state: ingredient.state(),
                    })
                }
            }
        }
    }

    pub(crate) fn occupy(&mut self, entity: EntityId) -> Result<(), Rejection> {
        match self.occupant {
            Some(current) if current != entity => Err(Rejection::SlotOccupied(self.id)),
            _ => {
                self.occupant = Some(entity);
                Ok(())
            }
        }
    }

    /// Install a permanent container, replacing any occupant. It can never
    /// be vacated.
    pub(crate) fn attach(&mut self, container: EntityId) {
        self.occupant = Some(container);
        self.attached = true;
    }

    /// Clear the occupant. An attached container stays; release empties it
    /// one item at a time instead, which the kitchen does.
    pub(crate) fn vacate(&mut self) -> Option<EntityId> {
        if self.attached {
            return None;
        }
        self.occupant.take()
    }
}

/// Spawns a fresh item on every touch. Unlimited stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispenser {
    pub id: DispenserId,
    pub bounds: Bounds,
    pub item: DispenserItem,
}

/// Where finished food is handed in for scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryZone {
    pub id: ZoneId,
    pub bounds: Bounds,
}

impl DeliveryZone {
    /// Scoring verdict for one delivered ingredient. `host` is the container
    /// it arrived in, if any; buns only score as part of a finished burger.
    pub fn accepts(ingredient: &Ingredient, host: Option<&Container>) -> bool {
        if ingredient.state().is_finished() {
            return true;
        }
        ingredient.kind().is_bun()
            && host.is_some_and(|c| c.kind == ContainerKind::Burger && c.is_complete())
    }
}
