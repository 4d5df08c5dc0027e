//! Simulation clock and desync hashing.

use crate::fixed::{Fixed64, Seconds, Ticks};

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Clock state advanced by the kitchen once per step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Steps executed so far.
    pub tick: Ticks,
    /// Simulation time elapsed, the sum of every clamped `dt`.
    pub clock: Seconds,
    /// While paused, `step` does nothing.
    pub paused: bool,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished step of `dt`.
    pub(crate) fn advance(&mut self, dt: Seconds) {
        self.tick += 1;
        self.clock = self.clock.saturating_add(dt);
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// FNV-1a (64-bit) over the decision-relevant state. Two kitchens fed the
/// same layout and the same commands produce the same hash every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::secs;

    #[test]
    fn sim_state_starts_at_zero() {
        let state = SimState::new();
        assert_eq!(state.tick, 0);
        assert_eq!(state.clock, Seconds::ZERO);
        assert!(!state.paused);
    }

    #[test]
    fn advance_accumulates_clock() {
        let mut state = SimState::new();
        state.advance(secs(0.25));
        state.advance(secs(0.5));
        assert_eq!(state.tick, 2);
        assert_eq!(state.clock, secs(0.75));
    }

    #[test]
    fn state_hash_deterministic() {
        let mut h1 = StateHash::new();
        h1.write_u64(42);
        h1.write_fixed64(secs(1.5));

        let mut h2 = StateHash::new();
        h2.write_u64(42);
        h2.write_fixed64(secs(1.5));

        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        h1.write_u8(2);

        let mut h2 = StateHash::new();
        h2.write_u8(2);
        h2.write_u32(1);

        assert_ne!(h1.finish(), h2.finish());
    }
}
