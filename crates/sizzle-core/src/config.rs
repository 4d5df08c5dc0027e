//! Kitchen layout and tuning parameters.
//!
//! Everything here is static for the lifetime of a [`Kitchen`]: the
//! workstations, dispensers and delivery zones, the gesture and station
//! timings, and any overrides of the stock ingredient profiles. Ids are
//! dense and positional: the n-th slot in `slots` is `SlotId(n)`.
//!
//! [`Kitchen`]: crate::kitchen::Kitchen

use serde::{Deserialize, Serialize};

use crate::container::ContainerSpec;
use crate::entity::DispenserItem;
use crate::fixed::{Fixed64, Seconds, secs};
use crate::geometry::Bounds;
use crate::hold::HoldConfig;
use crate::ingredient::{IngredientKind, ProcessType};
use crate::registry::{KindProfile, Registry, RegistryBuilder, RegistryError};
use crate::station::StationConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub process: ProcessType,
    pub bounds: Bounds,
    /// A container bolted to this slot (a fixed pan or burger board).
    #[serde(default)]
    pub attached: Option<ContainerSpec>,
}

impl SlotConfig {
    pub fn new(process: ProcessType, bounds: Bounds) -> Self {
        Self {
            process,
            bounds,
            attached: None,
        }
    }

    pub fn with_attached(mut self, spec: ContainerSpec) -> Self {
        self.attached = Some(spec);
        self
    }

    /// Check this slot as the `index`-th of a layout.
    pub fn check(&self, index: usize) -> Result<(), LayoutError> {
        if self.bounds.is_empty() {
            return Err(LayoutError::EmptySlot { index });
        }
        if let Some(spec) = self.attached {
            if !matches!(self.process, ProcessType::Cook | ProcessType::Assemble) {
                return Err(LayoutError::AttachedNotAllowed {
                    index,
                    process: self.process,
                });
            }
            if spec.capacity == 0 {
                return Err(LayoutError::ZeroCapacity);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenserConfig {
    pub bounds: Bounds,
    pub item: DispenserItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryZoneConfig {
    pub bounds: Bounds,
}

/// Replaces the stock profile of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileOverride {
    pub kind: IngredientKind,
    pub profile: KindProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitchenConfig {
    pub hold: HoldConfig,
    pub station: StationConfig,
    /// How long a task request may wait for a workstation type to exist.
    pub request_timeout: Seconds,
    /// Ring buffer capacity per event kind.
    pub event_capacity: usize,
    /// Reach of a direct pick on a loose ingredient.
    pub pick_radius: Fixed64,
    pub slots: Vec<SlotConfig>,
    pub dispensers: Vec<DispenserConfig>,
    pub delivery_zones: Vec<DeliveryZoneConfig>,
    pub profiles: Vec<ProfileOverride>,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            hold: HoldConfig::default(),
            station: StationConfig::default(),
            request_timeout: secs(10.0),
            event_capacity: 1024,
            pick_radius: Fixed64::from_num(0.5),
            slots: Vec::new(),
            dispensers: Vec::new(),
            delivery_zones: Vec::new(),
            profiles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("slot {index} has empty bounds")]
    EmptySlot { index: usize },
    #[error("dispenser {index} has empty bounds")]
    EmptyDispenser { index: usize },
    #[error("delivery zone {index} has empty bounds")]
    EmptyZone { index: usize },
    #[error("slot {index}: containers cannot be attached to {process:?} slots")]
    AttachedNotAllowed { index: usize, process: ProcessType },
    #[error("container capacity must be at least one")]
    ZeroCapacity,
    #[error("hold duration must be positive")]
    NonPositiveHold,
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
    #[error("profile override for {0:?} given twice")]
    DuplicateOverride(IngredientKind),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl KitchenConfig {
    pub fn with_slot(mut self, slot: SlotConfig) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn with_dispenser(mut self, bounds: Bounds, item: DispenserItem) -> Self {
        self.dispensers.push(DispenserConfig { bounds, item });
        self
    }

    pub fn with_delivery_zone(mut self, bounds: Bounds) -> Self {
        self.delivery_zones.push(DeliveryZoneConfig { bounds });
        self
    }

    /// Check the layout and parameters, including the profile overrides.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.hold.duration <= Seconds::ZERO {
            return Err(LayoutError::NonPositiveHold);
        }
        for (field, value) in [
            ("hold.radius", self.hold.radius),
            ("station.min_strike_interval", self.station.min_strike_interval),
            ("request_timeout", self.request_timeout),
            ("pick_radius", self.pick_radius),
        ] {
            if value < Fixed64::ZERO {
                return Err(LayoutError::Negative { field });
            }
        }
        for (index, slot) in self.slots.iter().enumerate() {
            slot.check(index)?;
        }
        for (index, dispenser) in self.dispensers.iter().enumerate() {
            if dispenser.bounds.is_empty() {
                return Err(LayoutError::EmptyDispenser { index });
            }
            if let DispenserItem::Container(spec) = dispenser.item
                && spec.capacity == 0
            {
                return Err(LayoutError::ZeroCapacity);
            }
        }
        for (index, zone) in self.delivery_zones.iter().enumerate() {
            if zone.bounds.is_empty() {
                return Err(LayoutError::EmptyZone { index });
            }
        }
        self.registry().map(|_| ())
    }

    /// The stock registry with this config's overrides applied.
    pub fn registry(&self) -> Result<Registry, LayoutError> {
        let mut builder = RegistryBuilder::with_defaults();
        for (i, o) in self.profiles.iter().enumerate() {
            if self.profiles[..i].iter().any(|p| p.kind == o.kind) {
                return Err(LayoutError::DuplicateOverride(o.kind));
            }
            builder.register(o.kind, o.profile.clone());
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingredient::ProcessState;
    use crate::registry::ProcessMode;

    fn board() -> Bounds {
        Bounds::from_f64(0.0, 0.0, 1.0, 1.0)
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(KitchenConfig::default().validate(), Ok(()));
    }

    #[test]
    fn empty_bounds_are_rejected() {
        let config = KitchenConfig::default()
            .with_slot(SlotConfig::new(ProcessType::Cut, board()))
            .with_slot(SlotConfig::new(
                ProcessType::Cut,
                Bounds::from_f64(1.0, 1.0, 0.0, 0.0),
            ));
        assert_eq!(config.validate(), Err(LayoutError::EmptySlot { index: 1 }));
    }

    #[test]
    fn attached_containers_only_on_cook_and_assemble() {
        let config = KitchenConfig::default()
            .with_slot(SlotConfig::new(ProcessType::Wash, board()).with_attached(ContainerSpec::pan()));
        assert_eq!(
            config.validate(),
            Err(LayoutError::AttachedNotAllowed {
                index: 0,
                process: ProcessType::Wash,
            })
        );
        let ok = KitchenConfig::default()
            .with_slot(SlotConfig::new(ProcessType::Cook, board()).with_attached(ContainerSpec::pan()));
        assert_eq!(ok.validate(), Ok(()));
    }

    #[test]
    fn bad_profile_override_surfaces_registry_error() {
        let mut config = KitchenConfig::default();
        config.profiles.push(ProfileOverride {
            kind: IngredientKind::Tomato,
            profile: KindProfile::new().with(
                ProcessState::Cut,
                ProcessType::Cut,
                ProcessState::Raw,
                ProcessMode::Strikes { needed: 1 },
            ),
        });
        assert!(matches!(config.validate(), Err(LayoutError::Registry(_))));
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let config = KitchenConfig {
            request_timeout: secs(-1.0),
            ..KitchenConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(LayoutError::Negative {
                field: "request_timeout"
            })
        );
    }
}
