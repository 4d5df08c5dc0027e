//! Movable entities: ingredients and containers share one arena.

use serde::{Deserialize, Serialize};

use crate::container::{Container, ContainerSpec};
use crate::geometry::Position;
use crate::hold::HoldGesture;
use crate::id::{DispenserId, EntityId, InputId, SlotId};
use crate::ingredient::{Ingredient, IngredientKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Ingredient(Ingredient),
    Container(Container),
}

/// Where an entity is. The slot and container variants are the
/// back-references mirrored by the slot occupant and container contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Location {
    #[default]
    Free,
    Slot(SlotId),
    Container(EntityId),
    Held(InputId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Put in the world at construction or by the host.
    Placed,
    /// Spawned by a dispenser; cheap to throw away.
    Dispenser(DispenserId),
}

/// What a dispenser hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispenserItem {
    Ingredient(IngredientKind),
    Container(ContainerSpec),
}

/// Last place an entity rested, for returning it after a failed drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Home {
    pub location: Location,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub body: Body,
    pub location: Location,
    pub position: Position,
    pub origin: Origin,
    pub home: Home,
    pub hold: HoldGesture,
}

impl Entity {
    pub fn new(body: Body, position: Position, origin: Origin) -> Self {
        Self {
            body,
            location: Location::Free,
            position,
            origin,
            home: Home {
                location: Location::Free,
                position,
            },
            hold: HoldGesture::new(),
        }
    }

    pub fn ingredient(&self) -> Option<&Ingredient> {
        match &self.body {
            Body::Ingredient(i) => Some(i),
            Body::Container(_) => None,
        }
    }

    pub fn ingredient_mut(&mut self) -> Option<&mut Ingredient> {
        match &mut self.body {
            Body::Ingredient(i) => Some(i),
            Body::Container(_) => None,
        }
    }

    pub fn container(&self) -> Option<&Container> {
        match &self.body {
            Body::Container(c) => Some(c),
            Body::Ingredient(_) => None,
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut Container> {
        match &mut self.body {
            Body::Container(c) => Some(c),
            Body::Ingredient(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.body, Body::Container(_))
    }

    /// Remember the current resting place.
    pub(crate) fn settle(&mut self, location: Location, position: Position) {
        self.location = location;
        self.position = position;
        self.home = Home { location, position };
    }

    pub fn slot(&self) -> Option<SlotId> {
        match self.location {
            Location::Slot(slot) => Some(slot),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn settle_updates_home() {
        let reg = Registry::standard();
        let mut e = Entity::new(
            Body::Ingredient(Ingredient::new(IngredientKind::Tomato, &reg)),
            Position::ORIGIN,
            Origin::Placed,
        );
        let at = Position::from_f64(2.0, 1.0);
        e.settle(Location::Slot(SlotId(3)), at);
        assert_eq!(e.slot(), Some(SlotId(3)));
        assert_eq!(e.home.position, at);
        e.location = Location::Held(InputId(1));
        assert_eq!(e.slot(), None);
        assert_eq!(e.home.location, Location::Slot(SlotId(3)));
    }

    #[test]
    fn body_accessors() {
        let e = Entity::new(
            Body::Container(Container::new(ContainerSpec::plate())),
            Position::ORIGIN,
            Origin::Dispenser(DispenserId(0)),
        );
        assert!(e.is_container());
        assert!(e.ingredient().is_none());
        assert_eq!(e.container().map(|c| c.capacity), Some(4));
    }
}
