//! Press-and-hold gesture detection.
//!
//! A hold only turns into a pick after the input has dwelt near its anchor
//! for `duration`. Quick taps on a slot never reach that point and stay
//! available to the station detectors.

use crate::error::Rejection;
use crate::fixed::{Fixed64, Seconds, secs};
use crate::geometry::{Bounds, Position};
use crate::id::InputId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldConfig {
    /// Dwell needed before the pick fires.
    pub duration: Seconds,
    /// Maximum drift from the anchor, in world units.
    pub radius: Fixed64,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            duration: secs(0.5),
            radius: Fixed64::from_num(0.25),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HoldPhase {
    #[default]
    Idle,
    Dwelling {
        input: InputId,
        anchor: Position,
        position: Position,
        elapsed: Seconds,
    },
}

/// Result of advancing a gesture by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldTick {
    Idle,
    Dwelling { elapsed: Seconds },
    /// The input drifted out of the radius; the gesture is back to idle.
    Cancelled(InputId),
    /// Dwell satisfied. One-shot; the gesture is back to idle.
    Fired(InputId),
}

/// Per-entity hold detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldGesture {
    phase: HoldPhase,
}

impl HoldGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn is_dwelling(&self) -> bool {
        matches!(self.phase, HoldPhase::Dwelling { .. })
    }

    /// The input driving the current dwell.
    pub fn input(&self) -> Option<InputId> {
        match self.phase {
            HoldPhase::Idle => None,
            HoldPhase::Dwelling { input, .. } => Some(input),
        }
    }

    /// Start dwelling. `slot_bounds` is the area of the workstation the
    /// entity sits in, if any; a press outside it is refused.
    pub fn start(
        &mut self,
        input: InputId,
        position: Position,
        slot_bounds: Option<Bounds>,
    ) -> Result<(), Rejection> {
        if self.is_dwelling() {
            return Err(Rejection::HoldActive);
        }
        if let Some(bounds) = slot_bounds
            && !bounds.contains(&position)
        {
            return Err(Rejection::OutsideSlot);
        }
        self.phase = HoldPhase::Dwelling {
            input,
            anchor: position,
            position,
            elapsed: Seconds::ZERO,
        };
        Ok(())
    }

    /// Record the latest position of `input`. Ignored for other inputs.
    pub fn track(&mut self, input: InputId, to: Position) {
        if let HoldPhase::Dwelling {
            input: owner,
            position,
            ..
        } = &mut self.phase
            && *owner == input
        {
            *position = to;
        }
    }

    /// Cancel from any phase. Returns the input that was dwelling.
    pub fn stop(&mut self) -> Option<InputId> {
        let input = self.input();
        self.phase = HoldPhase::Idle;
        input
    }

    /// Advance the dwell. The radius check runs before the dwell time is
    /// accumulated, so drifting away on the final tick never fires.
    pub fn tick(&mut self, dt: Seconds, config: &HoldConfig) -> HoldTick {
        let HoldPhase::Dwelling {
            input,
            anchor,
            position,
            elapsed,
        } = &mut self.phase
        else {
            return HoldTick::Idle;
        };
        let input = *input;
        if !position.within(anchor, config.radius) {
            self.phase = HoldPhase::Idle;
            return HoldTick::Cancelled(input);
        }
        *elapsed = elapsed.saturating_add(dt);
        if *elapsed >= config.duration {
            self.phase = HoldPhase::Idle;
            return HoldTick::Fired(input);
        }
        HoldTick::Dwelling { elapsed: *elapsed }
    }
}
