//! Strike sessions for slicing and washing stations.
//!
//! Each Cut or Wash workstation has one [`StationSession`], stored in a
//! vector parallel to the workstations. The session serializes strikes
//! against one input and one ingredient at a time.

use crate::error::Rejection;
use crate::fixed::{Seconds, secs};
use crate::id::{EntityId, InputId};
use crate::ingredient::ProcessType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Minimum time between two accepted strikes on one station.
    pub min_strike_interval: Seconds,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            min_strike_interval: secs(0.2),
        }
    }
}

/// Which interaction detector a workstation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detector {
    Slice,
    Wash,
}

impl Detector {
    /// The detector for a workstation type, if that type is strike-driven.
    pub fn for_process(process: ProcessType) -> Option<Detector> {
        match process {
            ProcessType::Cut => Some(Detector::Slice),
            ProcessType::Wash => Some(Detector::Wash),
            _ => None,
        }
    }

    pub fn process(self) -> ProcessType {
        match self {
            Detector::Slice => ProcessType::Cut,
            Detector::Wash => ProcessType::Wash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationSession {
    pub is_active: bool,
    pub can_strike: bool,
    pub last_strike_time: Option<Seconds>,
    pub bound_input: Option<InputId>,
    pub current_ingredient: Option<EntityId>,
}

impl Default for StationSession {
    fn default() -> Self {
        Self {
            is_active: false,
            can_strike: true,
            last_strike_time: None,
            bound_input: None,
            current_ingredient: None,
        }
    }
}

impl StationSession {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check whether a strike by `input` on `ingredient` at `now` may go
    /// ahead. A different ingredient than the session's resets the session
    /// first; nothing else is mutated.
    pub fn admit(
        &mut self,
        input: InputId,
        ingredient: EntityId,
        now: Seconds,
        config: &StationConfig,
    ) -> Result<(), Rejection> {
        if self
            .current_ingredient
            .is_some_and(|current| current != ingredient)
        {
            self.reset();
        }
        if let Some(bound) = self.bound_input
            && bound != input
        {
            return Err(Rejection::StrikeBound(bound));
        }
        if !self.can_strike {
            return Err(Rejection::StrikesDisabled);
        }
        if let Some(last) = self.last_strike_time
            && now.saturating_sub(last) < config.min_strike_interval
        {
            return Err(Rejection::StrikeCooldown);
        }
        Ok(())
    }

    /// Record an accepted strike. Once the ingredient's strike process has
    /// completed, further strikes are disabled until the session resets.
    pub fn record(&mut self, input: InputId, ingredient: EntityId, now: Seconds, completed: bool) {
        self.is_active = true;
        self.bound_input = Some(input);
        self.current_ingredient = Some(ingredient);
        self.last_strike_time = Some(now);
        if completed {
            self.can_strike = false;
        }
    }

    /// Releasing the bound input always frees the station for any input.
    /// The strike cooldown belongs to the station and survives the release,
    /// so a tap-tap inside the interval still counts once. Returns true if
    /// the session was bound to `input`.
    pub fn release(&mut self, input: InputId) -> bool {
        if self.bound_input == Some(input) {
            self.bound_input = None;
            self.is_active = false;
            true
        } else {
            false
        }
    }

    /// Reset if the session was tracking `ingredient` (it left the station).
    pub fn forget(&mut self, ingredient: EntityId) {
        if self.current_ingredient == Some(ingredient) {
            self.reset();
        }
    }
}
