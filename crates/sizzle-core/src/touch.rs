//! Touch arbitration: which input holds which entity.
//!
//! The arbiter is the only owner of the input/entity binding. Both
//! directions are stored, and they change together through [`TouchArbiter::bind`]
//! and [`TouchArbiter::unbind`], so an entity is held by at most one input
//! and an input holds at most one entity.

use std::collections::BTreeMap;

use slotmap::SecondaryMap;

use crate::error::Rejection;
use crate::fixed::Seconds;
use crate::geometry::Position;
use crate::id::{DispenserId, EntityId, InputId, SlotId};

/// What happened to an entity whose drop found nowhere to land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickOutcome {
    /// Put back where it was picked from.
    Returned,
    /// Destroyed; it came from a dispenser and can be re-spawned.
    Discarded,
}

/// The first candidate under an input-begin, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Dispenser(DispenserId),
    /// An ingredient lying outside any workstation.
    Loose(EntityId),
    /// Whatever a workstation holds, routed through the hold gesture.
    Docked { slot: SlotId, entity: EntityId },
    /// A container lying outside any workstation.
    LooseContainer(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchSession {
    pub input: InputId,
    pub held: Option<EntityId>,
    pub start_position: Position,
    pub start_time: Seconds,
    pub position: Position,
}

#[derive(Debug, Default)]
pub struct TouchArbiter {
    sessions: BTreeMap<InputId, TouchSession>,
    holders: SecondaryMap<EntityId, InputId>,
}

impl TouchArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `input`. A begin for an input that already holds
    /// something is a binding conflict and changes nothing.
    pub fn begin(&mut self, input: InputId, position: Position, now: Seconds) -> Result<(), Rejection> {
        if let Some(session) = self.sessions.get(&input)
            && session.held.is_some()
        {
            return Err(Rejection::InputBusy(input));
        }
        self.sessions.insert(
            input,
            TouchSession {
                input,
                held: None,
                start_position: position,
                start_time: now,
                position,
            },
        );
        Ok(())
    }

    /// Update the tracked position. Returns the held entity, if any.
    pub fn move_to(&mut self, input: InputId, position: Position) -> Result<Option<EntityId>, Rejection> {
        let session = self
            .sessions
            .get_mut(&input)
            .ok_or(Rejection::NoSession(input))?;
        session.position = position;
        Ok(session.held)
    }

    /// Close the session for `input`, clearing its binding unconditionally.
    pub fn end(&mut self, input: InputId) -> Option<TouchSession> {
        let session = self.sessions.remove(&input)?;
        if let Some(entity) = session.held {
            self.holders.remove(entity);
        }
        Some(session)
    }

    /// Bind `entity` to `input`. Rejected without change if the entity is
    /// held by another input or the input already holds something.
    pub fn bind(&mut self, input: InputId, entity: EntityId) -> Result<(), Rejection> {
        if let Some(holder) = self.holders.get(entity) {
            return Err(Rejection::EntityHeld(*holder));
        }
        let session = self
            .sessions
            .get_mut(&input)
            .ok_or(Rejection::NoSession(input))?;
        if session.held.is_some() {
            return Err(Rejection::InputBusy(input));
        }
        session.held = Some(entity);
        self.holders.insert(entity, input);
        Ok(())
    }

    /// Drop the binding of `input`, keeping its session open.
    pub fn unbind(&mut self, input: InputId) -> Option<EntityId> {
        let entity = self.sessions.get_mut(&input)?.held.take()?;
        self.holders.remove(entity);
        Some(entity)
    }

    /// Drop any binding to `entity` (it is being destroyed).
    pub fn forget(&mut self, entity: EntityId) {
        if let Some(input) = self.holders.remove(entity)
            && let Some(session) = self.sessions.get_mut(&input)
        {
            session.held = None;
        }
    }

    pub fn holder(&self, entity: EntityId) -> Option<InputId> {
        self.holders.get(entity).copied()
    }

    pub fn held_by(&self, input: InputId) -> Option<EntityId> {
        self.sessions.get(&input).and_then(|s| s.held)
    }

    pub fn session(&self, input: InputId) -> Option<&TouchSession> {
        self.sessions.get(&input)
    }

    /// Open sessions in input id order.
    pub fn sessions(&self) -> impl Iterator<Item = &TouchSession> {
        self.sessions.values()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Every `(input, entity)` binding, in input order.
    pub fn bindings(&self) -> impl Iterator<Item = (InputId, EntityId)> + '_ {
        self.sessions
            .values()
            .filter_map(|s| s.held.map(|e| (s.input, e)))
    }

    pub(crate) fn reverse_bindings(&self) -> impl Iterator<Item = (EntityId, InputId)> + '_ {
        self.holders.iter().map(|(e, i)| (e, *i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    const A: InputId = InputId(1);
    const B: InputId = InputId(2);

    fn entities(n: usize) -> Vec<EntityId> {
        let mut sm = SlotMap::<EntityId, ()>::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    fn open(arb: &mut TouchArbiter, input: InputId) {
        arb.begin(input, Position::ORIGIN, Seconds::ZERO).unwrap();
    }

    #[test]
    fn second_input_cannot_take_a_held_entity() {
        let e = entities(1)[0];
        let mut arb = TouchArbiter::new();
        open(&mut arb, A);
        open(&mut arb, B);
        arb.bind(A, e).unwrap();
        assert_eq!(arb.bind(B, e), Err(Rejection::EntityHeld(A)));
        assert_eq!(arb.holder(e), Some(A));
        assert_eq!(arb.held_by(A), Some(e));
        assert_eq!(arb.held_by(B), None);
    }

    #[test]
    fn input_holds_at_most_one_entity() {
        let e = entities(2);
        let mut arb = TouchArbiter::new();
        open(&mut arb, A);
        arb.bind(A, e[0]).unwrap();
        assert_eq!(arb.bind(A, e[1]), Err(Rejection::InputBusy(A)));
        assert_eq!(arb.holder(e[1]), None);
    }

    #[test]
    fn bind_requires_a_session() {
        let e = entities(1)[0];
        let mut arb = TouchArbiter::new();
        assert_eq!(arb.bind(A, e), Err(Rejection::NoSession(A)));
    }

    #[test]
    fn end_clears_binding_unconditionally() {
        let e = entities(1)[0];
        let mut arb = TouchArbiter::new();
        open(&mut arb, A);
        arb.bind(A, e).unwrap();
        let session = arb.end(A).unwrap();
        assert_eq!(session.held, Some(e));
        assert_eq!(arb.holder(e), None);
        assert_eq!(arb.active_count(), 0);
        assert!(arb.end(A).is_none());
    }

    #[test]
    fn begin_while_holding_is_a_conflict() {
        let e = entities(1)[0];
        let mut arb = TouchArbiter::new();
        open(&mut arb, A);
        arb.bind(A, e).unwrap();
        assert_eq!(
            arb.begin(A, Position::from_f64(3.0, 3.0), Seconds::ZERO),
            Err(Rejection::InputBusy(A))
        );
        assert_eq!(arb.session(A).unwrap().start_position, Position::ORIGIN);
    }

    #[test]
    fn move_tracks_position_and_reports_held() {
        let e = entities(1)[0];
        let mut arb = TouchArbiter::new();
        open(&mut arb, A);
        assert_eq!(arb.move_to(A, Position::from_f64(1.0, 0.0)), Ok(None));
        arb.bind(A, e).unwrap();
        assert_eq!(arb.move_to(A, Position::from_f64(2.0, 0.0)), Ok(Some(e)));
        assert_eq!(
            arb.session(A).unwrap().position,
            Position::from_f64(2.0, 0.0)
        );
        assert_eq!(
            arb.move_to(B, Position::ORIGIN),
            Err(Rejection::NoSession(B))
        );
    }

    #[test]
    fn forget_and_unbind_keep_both_maps_in_step() {
        let e = entities(2);
        let mut arb = TouchArbiter::new();
        open(&mut arb, A);
        open(&mut arb, B);
        arb.bind(A, e[0]).unwrap();
        arb.bind(B, e[1]).unwrap();
        arb.forget(e[0]);
        assert_eq!(arb.held_by(A), None);
        assert_eq!(arb.unbind(B), Some(e[1]));
        assert_eq!(arb.holder(e[1]), None);
        assert_eq!(arb.bindings().count(), 0);
        assert_eq!(arb.reverse_bindings().count(), 0);
    }
}
