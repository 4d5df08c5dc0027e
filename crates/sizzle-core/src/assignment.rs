//! Binding remote actors to workstations and tracking their task progress.
//!
//! The manager keeps the actor/slot mapping one-to-one. It never touches
//! workstations itself; every change is reported as an [`AssignmentSignal`]
//! which the kitchen mirrors onto the slot and turns into events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::fixed::{Seconds, secs};
use crate::id::{ActorId, SlotId, TaskId};
use crate::ingredient::ProcessType;

/// Opaque cue forwarded to the feedback layer when a slot is assigned
/// (a colour, an icon index).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualHint(pub u32);

/// An inbound task message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub actor: ActorId,
    pub task: TaskId,
    pub required: ProcessType,
    /// Completed actions needed to finish the task. Zero counts as one.
    pub target: u32,
    pub hint: VisualHint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskAssignment {
    pub actor: ActorId,
    pub task: TaskId,
    pub slot: SlotId,
    pub required: ProcessType,
    pub progress: u32,
    pub target: u32,
    pub hint: VisualHint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignFailure {
    /// Workstations of the type exist but all are taken.
    Unavailable,
    /// No workstation of the type showed up before the request expired.
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSignal {
    Assigned {
        actor: ActorId,
        task: TaskId,
        slot: SlotId,
        hint: VisualHint,
    },
    Failed {
        actor: ActorId,
        task: TaskId,
        reason: AssignFailure,
    },
    Progress {
        actor: ActorId,
        task: TaskId,
        current: u32,
        target: u32,
    },
    Complete {
        actor: ActorId,
        task: TaskId,
        slot: SlotId,
    },
    Released {
        actor: ActorId,
        slot: SlotId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    request: TaskRequest,
    deadline: Seconds,
}

#[derive(Debug, Clone)]
pub struct AssignmentManager {
    /// Workstations in registration order.
    slots: Vec<(SlotId, ProcessType)>,
    by_actor: BTreeMap<ActorId, TaskAssignment>,
    by_slot: BTreeMap<SlotId, ActorId>,
    pending: Vec<Pending>,
    request_timeout: Seconds,
}

impl Default for AssignmentManager {
    fn default() -> Self {
        Self::new(secs(10.0))
    }
}

impl AssignmentManager {
    pub fn new(request_timeout: Seconds) -> Self {
        Self {
            slots: Vec::new(),
            by_actor: BTreeMap::new(),
            by_slot: BTreeMap::new(),
            pending: Vec::new(),
            request_timeout,
        }
    }

    /// Make a workstation eligible for assignment. Table slots are recorded
    /// but never handed out.
    pub fn register_slot(&mut self, slot: SlotId, process: ProcessType) {
        if !self.slots.iter().any(|(s, _)| *s == slot) {
            self.slots.push((slot, process));
        }
    }

    fn slot_type(&self, slot: SlotId) -> Option<ProcessType> {
        self.slots
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, p)| *p)
    }

    fn has_type(&self, required: ProcessType) -> bool {
        self.slots.iter().any(|(_, p)| *p == required)
    }

    /// Handle an inbound assignment. Re-sending the request an actor is
    /// already serving changes nothing and signals nothing.
    pub fn assign(&mut self, request: TaskRequest, now: Seconds) -> Vec<AssignmentSignal> {
        let mut signals = Vec::new();
        if let Some(current) = self.by_actor.get(&request.actor) {
            if current.required == request.required {
                return signals;
            }
            signals.extend(self.unassign(request.actor));
        }
        self.pending.retain(|p| p.request.actor != request.actor);

        if request.required != ProcessType::Table && !self.has_type(request.required) {
            log::debug!(
                "no {:?} workstation yet for actor {:?}; parking request",
                request.required,
                request.actor
            );
            self.pending.push(Pending {
                request,
                deadline: now.saturating_add(self.request_timeout),
            });
            return signals;
        }
        signals.push(self.try_bind(request));
        signals
    }

    fn try_bind(&mut self, request: TaskRequest) -> AssignmentSignal {
        let free = self.slots.iter().find(|(slot, process)| {
            *process == request.required
                && *process != ProcessType::Table
                && !self.by_slot.contains_key(slot)
        });
        let Some(&(slot, _)) = free else {
            log::warn!(
                "no free {:?} workstation for actor {:?}",
                request.required,
                request.actor
            );
            return AssignmentSignal::Failed {
                actor: request.actor,
                task: request.task,
                reason: AssignFailure::Unavailable,
            };
        };
        let assignment = TaskAssignment {
            actor: request.actor,
            task: request.task,
            slot,
            required: request.required,
            progress: 0,
            target: request.target.max(1),
            hint: request.hint,
        };
        self.by_actor.insert(request.actor, assignment);
        self.by_slot.insert(slot, request.actor);
        log::info!(
            "actor {:?} assigned to {:?} for task {:?}",
            request.actor,
            slot,
            request.task
        );
        AssignmentSignal::Assigned {
            actor: request.actor,
            task: request.task,
            slot,
            hint: request.hint,
        }
    }

    /// Release whatever the actor holds, and drop any parked request.
    pub fn unassign(&mut self, actor: ActorId) -> Option<AssignmentSignal> {
        self.pending.retain(|p| p.request.actor != actor);
        let assignment = self.by_actor.remove(&actor)?;
        self.by_slot.remove(&assignment.slot);
        log::info!("actor {:?} released {:?}", actor, assignment.slot);
        Some(AssignmentSignal::Released {
            actor,
            slot: assignment.slot,
        })
    }

    /// Credit one completed `action` on `slot` to the actor bound there.
    pub fn update_progress(
        &mut self,
        slot: SlotId,
        action: ProcessType,
    ) -> Result<Vec<AssignmentSignal>, Rejection> {
        let expected = self.slot_type(slot).ok_or(Rejection::UnknownSlot(slot))?;
        if expected != action {
            return Err(Rejection::WrongAction { expected, action });
        }
        let actor = *self.by_slot.get(&slot).ok_or(Rejection::NoTask(slot))?;
        let assignment = self
            .by_actor
            .get_mut(&actor)
            .ok_or(Rejection::NoTask(slot))?;
        assignment.progress = assignment.progress.saturating_add(1);
        let (task, current, target) = (assignment.task, assignment.progress, assignment.target);

        let mut signals = vec![AssignmentSignal::Progress {
            actor,
            task,
            current,
            target,
        }];
        if current >= target {
            self.by_actor.remove(&actor);
            self.by_slot.remove(&slot);
            log::info!("actor {:?} completed task {:?}", actor, task);
            signals.push(AssignmentSignal::Complete { actor, task, slot });
        }
        Ok(signals)
    }

    /// Retry parked requests and abandon the expired ones.
    pub fn tick(&mut self, now: Seconds) -> Vec<AssignmentSignal> {
        let mut signals = Vec::new();
        let parked = std::mem::take(&mut self.pending);
        for pending in parked {
            let request = pending.request;
            if self.has_type(request.required) {
                signals.push(self.try_bind(request));
            } else if now >= pending.deadline {
                log::error!(
                    "task {:?} for actor {:?} abandoned: no {:?} workstation became available",
                    request.task,
                    request.actor,
                    request.required
                );
                signals.push(AssignmentSignal::Failed {
                    actor: request.actor,
                    task: request.task,
                    reason: AssignFailure::TimedOut,
                });
            } else {
                self.pending.push(pending);
            }
        }
        signals
    }

    pub fn assignment(&self, actor: ActorId) -> Option<&TaskAssignment> {
        self.by_actor.get(&actor)
    }

    pub fn actor_for(&self, slot: SlotId) -> Option<ActorId> {
        self.by_slot.get(&slot).copied()
    }

    pub fn assignments(&self) -> impl Iterator<Item = &TaskAssignment> {
        self.by_actor.values()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn request_timeout(&self) -> Seconds {
        self.request_timeout
    }
}
