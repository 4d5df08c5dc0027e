//! Data-driven kitchen layouts from JSON.
//!
//! Feature-gated behind `data-loader`. Level files use plain floats for
//! seconds and coordinates and names for kinds and processes; everything is
//! converted to fixed-point and resolved once here, then validated.

use crate::config::{
    DeliveryZoneConfig, DispenserConfig, KitchenConfig, LayoutError, ProfileOverride, SlotConfig,
};
use crate::container::{ContainerKind, ContainerSpec};
use crate::entity::DispenserItem;
use crate::fixed::{Fixed64, secs};
use crate::geometry::Bounds;
use crate::hold::HoldConfig;
use crate::ingredient::{IngredientKind, ProcessState, ProcessType};
use crate::registry::{KindProfile, ProcessMode};
use crate::station::StationConfig;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("unknown ingredient: {0}")]
    UnknownIngredient(String),
    #[error("unknown process: {0}")]
    UnknownProcess(String),
    #[error("unknown state: {0}")]
    UnknownState(String),
    #[error("unknown container kind: {0}")]
    UnknownContainer(String),
    #[error("dispenser {index} must name exactly one of ingredient or container")]
    AmbiguousDispenser { index: usize },
    #[error("transition {from} -{process}-> of {kind} needs strikes, duration, or done_at and burn_at")]
    BadTransitionMode {
        kind: String,
        from: String,
        process: String,
    },
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level kitchen file. Every field is optional; missing parameters
/// take the stock defaults.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct KitchenData {
    pub hold: Option<HoldData>,
    pub station: Option<StationData>,
    pub request_timeout: Option<f64>,
    pub event_capacity: Option<usize>,
    pub pick_radius: Option<f64>,
    pub slots: Vec<SlotData>,
    pub dispensers: Vec<DispenserData>,
    pub delivery_zones: Vec<ZoneData>,
    pub profiles: Vec<ProfileData>,
}

#[derive(Debug, serde::Deserialize)]
pub struct HoldData {
    pub duration: f64,
    pub radius: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct StationData {
    pub min_strike_interval: f64,
}

/// `[x0, y0, x1, y1]`
pub type BoundsData = [f64; 4];

#[derive(Debug, serde::Deserialize)]
pub struct SlotData {
    pub process: String,
    pub bounds: BoundsData,
    #[serde(default)]
    pub attached: Option<ContainerData>,
}

#[derive(Debug, serde::Deserialize)]
pub struct ContainerData {
    pub kind: String,
    /// Defaults to the kind's stock capacity.
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default)]
    pub stack_offset: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
pub struct DispenserData {
    pub bounds: BoundsData,
    #[serde(default)]
    pub ingredient: Option<String>,
    #[serde(default)]
    pub container: Option<ContainerData>,
}

#[derive(Debug, serde::Deserialize)]
pub struct ZoneData {
    pub bounds: BoundsData,
}

#[derive(Debug, serde::Deserialize)]
pub struct ProfileData {
    pub kind: String,
    #[serde(default)]
    pub transitions: Vec<TransitionData>,
}

/// One transition row. The mode is picked by which fields are present.
#[derive(Debug, serde::Deserialize)]
pub struct TransitionData {
    pub from: String,
    pub process: String,
    pub to: String,
    #[serde(default)]
    pub strikes: Option<u32>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub done_at: Option<f64>,
    #[serde(default)]
    pub burn_at: Option<f64>,
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load and validate a kitchen layout from a JSON string.
pub fn load_config_json(json: &str) -> Result<KitchenConfig, DataLoadError> {
    let data: KitchenData = serde_json::from_str(json)?;
    build_config(data)
}

/// Load and validate a kitchen layout from JSON bytes.
pub fn load_config_json_bytes(bytes: &[u8]) -> Result<KitchenConfig, DataLoadError> {
    let data: KitchenData = serde_json::from_slice(bytes)?;
    build_config(data)
}

fn bounds(b: BoundsData) -> Bounds {
    Bounds::from_f64(b[0], b[1], b[2], b[3])
}

fn process(name: &str) -> Result<ProcessType, DataLoadError> {
    ProcessType::from_name(name).ok_or_else(|| DataLoadError::UnknownProcess(name.to_string()))
}

fn ingredient(name: &str) -> Result<IngredientKind, DataLoadError> {
    IngredientKind::from_name(name).ok_or_else(|| DataLoadError::UnknownIngredient(name.to_string()))
}

fn state(name: &str) -> Result<ProcessState, DataLoadError> {
    match name {
        "raw" => Ok(ProcessState::Raw),
        "washed" => Ok(ProcessState::Washed),
        "cut" => Ok(ProcessState::Cut),
        "cooked" => Ok(ProcessState::Cooked),
        "burned" => Ok(ProcessState::Burned),
        _ => Err(DataLoadError::UnknownState(name.to_string())),
    }
}

fn container(data: &ContainerData) -> Result<ContainerSpec, DataLoadError> {
    let kind = ContainerKind::from_name(&data.kind)
        .ok_or_else(|| DataLoadError::UnknownContainer(data.kind.clone()))?;
    let mut spec = match kind {
        ContainerKind::Plate => ContainerSpec::plate(),
        ContainerKind::Pan => ContainerSpec::pan(),
        ContainerKind::Burger => ContainerSpec::burger(),
        ContainerKind::Tray => ContainerSpec::tray(),
    };
    if let Some(capacity) = data.capacity {
        spec.capacity = capacity;
    }
    if let Some(offset) = data.stack_offset {
        spec.stack_offset = Fixed64::from_num(offset);
    }
    Ok(spec)
}

fn mode(kind: &str, row: &TransitionData) -> Result<ProcessMode, DataLoadError> {
    match (row.strikes, row.duration, row.done_at, row.burn_at) {
        (Some(needed), None, None, None) => Ok(ProcessMode::Strikes { needed }),
        (None, Some(duration), None, None) => Ok(ProcessMode::Timed {
            duration: secs(duration),
        }),
        (None, None, Some(done_at), Some(burn_at)) => Ok(ProcessMode::DonenessRace {
            done_at: secs(done_at),
            burn_at: secs(burn_at),
        }),
        _ => Err(DataLoadError::BadTransitionMode {
            kind: kind.to_string(),
            from: row.from.clone(),
            process: row.process.clone(),
        }),
    }
}

fn build_config(data: KitchenData) -> Result<KitchenConfig, DataLoadError> {
    let mut config = KitchenConfig::default();

    if let Some(hold) = data.hold {
        config.hold = HoldConfig {
            duration: secs(hold.duration),
            radius: Fixed64::from_num(hold.radius),
        };
    }
    if let Some(station) = data.station {
        config.station = StationConfig {
            min_strike_interval: secs(station.min_strike_interval),
        };
    }
    if let Some(timeout) = data.request_timeout {
        config.request_timeout = secs(timeout);
    }
    if let Some(capacity) = data.event_capacity {
        config.event_capacity = capacity;
    }
    if let Some(radius) = data.pick_radius {
        config.pick_radius = Fixed64::from_num(radius);
    }

    for slot in &data.slots {
        config.slots.push(SlotConfig {
            process: process(&slot.process)?,
            bounds: bounds(slot.bounds),
            attached: slot.attached.as_ref().map(container).transpose()?,
        });
    }

    for (index, dispenser) in data.dispensers.iter().enumerate() {
        let item = match (&dispenser.ingredient, &dispenser.container) {
            (Some(name), None) => DispenserItem::Ingredient(ingredient(name)?),
            (None, Some(spec)) => DispenserItem::Container(container(spec)?),
            _ => return Err(DataLoadError::AmbiguousDispenser { index }),
        };
        config.dispensers.push(DispenserConfig {
            bounds: bounds(dispenser.bounds),
            item,
        });
    }

    for zone in &data.delivery_zones {
        config.delivery_zones.push(DeliveryZoneConfig {
            bounds: bounds(zone.bounds),
        });
    }

    for profile in &data.profiles {
        let kind = ingredient(&profile.kind)?;
        let mut table = KindProfile::new();
        for row in &profile.transitions {
            table = table.with(
                state(&row.from)?,
                process(&row.process)?,
                state(&row.to)?,
                mode(&profile.kind, row)?,
            );
        }
        config.profiles.push(ProfileOverride {
            kind,
            profile: table,
        });
    }

    config.validate()?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
