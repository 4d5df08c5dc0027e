//! Typed event system with pre-allocated ring buffers.
//!
//! Events are emitted while a step resolves input, gestures, processes and
//! assignments, and delivered in batch during the post-tick phase. Each event
//! kind has its own [`EventBuffer`] with a configurable capacity.
//!
//! # Subscriber Types
//!
//! - **Passive listeners**: read-only, for visual and audio feedback or the
//!   remote messaging layer.
//! - **Reactive handlers**: return [`Command`]s to enqueue for the next tick.
//!
//! Every registration returns a [`SubscriptionId`]. A subscription may be
//! scoped to an entity; destroying the entity drops the subscription.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::assignment::{AssignFailure, VisualHint};
use crate::command_queue::Command;
use crate::error::Rejection;
use crate::fixed::{Fixed64, Ticks};
use crate::id::*;
use crate::ingredient::{IngredientKind, ProcessState, ProcessType};
use crate::touch::PickOutcome;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A kitchen event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Workstations --
    SlotOccupied {
        slot: SlotId,
        entity: EntityId,
        tick: Ticks,
    },
    SlotVacated {
        slot: SlotId,
        entity: EntityId,
        tick: Ticks,
    },
    /// A drop was refused by a workstation or container.
    InvalidPlacement {
        slot: Option<SlotId>,
        entity: EntityId,
        reason: Rejection,
        tick: Ticks,
    },
    /// Any other refused action.
    OperationRejected {
        entity: Option<EntityId>,
        reason: Rejection,
        tick: Ticks,
    },

    // -- Processing --
    ProcessStarted {
        entity: EntityId,
        process: ProcessType,
        tick: Ticks,
    },
    ProcessProgress {
        entity: EntityId,
        process: ProcessType,
        progress: Fixed64,
        tick: Ticks,
    },
    ProcessCompleted {
        entity: EntityId,
        process: ProcessType,
        from: ProcessState,
        to: ProcessState,
        tick: Ticks,
    },
    ProcessCancelled {
        entity: EntityId,
        process: ProcessType,
        kept: ProcessState,
        tick: Ticks,
    },
    StrikeAccepted {
        slot: SlotId,
        entity: EntityId,
        input: InputId,
        count: u32,
        needed: u32,
        tick: Ticks,
    },

    // -- Manipulation --
    EntitySpawned {
        entity: EntityId,
        dispenser: DispenserId,
        tick: Ticks,
    },
    EntityPicked {
        entity: EntityId,
        input: InputId,
        tick: Ticks,
    },
    EntityDropped {
        entity: EntityId,
        slot: SlotId,
        tick: Ticks,
    },
    PickFailed {
        entity: EntityId,
        input: InputId,
        outcome: PickOutcome,
        tick: Ticks,
    },

    // -- Tasks --
    TaskAssigned {
        actor: ActorId,
        task: TaskId,
        slot: SlotId,
        hint: VisualHint,
        tick: Ticks,
    },
    AssignmentFailed {
        actor: ActorId,
        task: TaskId,
        reason: AssignFailure,
        tick: Ticks,
    },
    TaskProgress {
        actor: ActorId,
        task: TaskId,
        current: u32,
        target: u32,
        tick: Ticks,
    },
    TaskComplete {
        actor: ActorId,
        task: TaskId,
        slot: SlotId,
        tick: Ticks,
    },

    // -- Scoring --
    DeliveryResult {
        zone: ZoneId,
        kind: IngredientKind,
        state: ProcessState,
        accepted: bool,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for subscription and suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SlotOccupied,
    SlotVacated,
    InvalidPlacement,
    OperationRejected,
    ProcessStarted,
    ProcessProgress,
    ProcessCompleted,
    ProcessCancelled,
    StrikeAccepted,
    EntitySpawned,
    EntityPicked,
    EntityDropped,
    PickFailed,
    TaskAssigned,
    AssignmentFailed,
    TaskProgress,
    TaskComplete,
    DeliveryResult,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 18;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SlotOccupied { .. } => EventKind::SlotOccupied,
            Event::SlotVacated { .. } => EventKind::SlotVacated,
            Event::InvalidPlacement { .. } => EventKind::InvalidPlacement,
            Event::OperationRejected { .. } => EventKind::OperationRejected,
            Event::ProcessStarted { .. } => EventKind::ProcessStarted,
            Event::ProcessProgress { .. } => EventKind::ProcessProgress,
            Event::ProcessCompleted { .. } => EventKind::ProcessCompleted,
            Event::ProcessCancelled { .. } => EventKind::ProcessCancelled,
            Event::StrikeAccepted { .. } => EventKind::StrikeAccepted,
            Event::EntitySpawned { .. } => EventKind::EntitySpawned,
            Event::EntityPicked { .. } => EventKind::EntityPicked,
            Event::EntityDropped { .. } => EventKind::EntityDropped,
            Event::PickFailed { .. } => EventKind::PickFailed,
            Event::TaskAssigned { .. } => EventKind::TaskAssigned,
            Event::AssignmentFailed { .. } => EventKind::AssignmentFailed,
            Event::TaskProgress { .. } => EventKind::TaskProgress,
            Event::TaskComplete { .. } => EventKind::TaskComplete,
            Event::DeliveryResult { .. } => EventKind::DeliveryResult,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            Event::SlotOccupied { tick, .. }
            | Event::SlotVacated { tick, .. }
            | Event::InvalidPlacement { tick, .. }
            | Event::OperationRejected { tick, .. }
            | Event::ProcessStarted { tick, .. }
            | Event::ProcessProgress { tick, .. }
            | Event::ProcessCompleted { tick, .. }
            | Event::ProcessCancelled { tick, .. }
            | Event::StrikeAccepted { tick, .. }
            | Event::EntitySpawned { tick, .. }
            | Event::EntityPicked { tick, .. }
            | Event::EntityDropped { tick, .. }
            | Event::PickFailed { tick, .. }
            | Event::TaskAssigned { tick, .. }
            | Event::AssignmentFailed { tick, .. }
            | Event::TaskProgress { tick, .. }
            | Event::TaskComplete { tick, .. }
            | Event::DeliveryResult { tick, .. } => *tick,
        }
    }

    /// The entity the event is about, if any.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Event::SlotOccupied { entity, .. }
            | Event::SlotVacated { entity, .. }
            | Event::InvalidPlacement { entity, .. }
            | Event::ProcessStarted { entity, .. }
            | Event::ProcessProgress { entity, .. }
            | Event::ProcessCompleted { entity, .. }
            | Event::ProcessCancelled { entity, .. }
            | Event::StrikeAccepted { entity, .. }
            | Event::EntitySpawned { entity, .. }
            | Event::EntityPicked { entity, .. }
            | Event::EntityDropped { entity, .. }
            | Event::PickFailed { entity, .. } => Some(*entity),
            Event::OperationRejected { entity, .. } => *entity,
            Event::TaskAssigned { .. }
            | Event::AssignmentFailed { .. }
            | Event::TaskProgress { .. }
            | Event::TaskComplete { .. }
            | Event::DeliveryResult { .. } => None,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        // Once full, head points at the oldest entry.
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        let cap = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % cap].as_ref())
    }

    /// Clear stored events. `total_written` is a lifetime counter and stays.
    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Returns commands to enqueue for the next tick.
pub type ReactiveHandler = Box<dyn FnMut(&Event) -> Vec<Command>>;

enum Subscriber {
    Passive(PassiveListener),
    Reactive(ReactiveHandler),
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscriber::Passive(_) => write!(f, "Passive(<fn>)"),
            Subscriber::Reactive(_) => write!(f, "Reactive(<fn>)"),
        }
    }
}

/// Priority level for event subscribers. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

struct SubscriberEntry {
    id: SubscriptionId,
    subscriber: Subscriber,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    /// Dropped together with this entity.
    scope: Option<EntityId>,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("id", &self.id)
            .field("subscriber", &self.subscriber)
            .field("priority", &self.priority)
            .field("filtered", &self.filter.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}

/// Registration options for [`EventBus::subscribe`].
pub struct Subscription {
    pub kind: EventKind,
    pub priority: SubscriberPriority,
    pub filter: Option<EventFilter>,
    pub scope: Option<EntityId>,
}

impl Subscription {
    pub fn to(kind: EventKind) -> Self {
        Self {
            kind,
            priority: SubscriberPriority::Normal,
            filter: None,
            scope: None,
        }
    }

    pub fn priority(mut self, priority: SubscriberPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn filter(mut self, filter: impl Fn(&Event) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Only events about `entity`, and drop the subscription when the
    /// entity is destroyed.
    pub fn scoped_to(mut self, entity: EntityId) -> Self {
        self.scope = Some(entity);
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer per event kind, subscriber lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],
    /// Commands collected from reactive handlers during delivery. Drained by
    /// the kitchen and queued for the next tick.
    pending_commands: Vec<Command>,
    default_capacity: usize,
    /// Also the registration order used for stable sorting.
    next_subscription: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("pending_commands", &self.pending_commands)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: std::array::from_fn(|_| Vec::new()),
            pending_commands: Vec::new(),
            default_capacity,
            next_subscription: 0,
        }
    }

    /// Suppressed kinds are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    fn register(&mut self, options: Subscription, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers[options.kind.index()].push(SubscriberEntry {
            id,
            subscriber,
            priority: options.priority,
            filter: options.filter,
            scope: options.scope,
        });
        id
    }

    /// Passive listener with Normal priority and no filter.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) -> SubscriptionId {
        self.register(Subscription::to(kind), Subscriber::Passive(listener))
    }

    /// Reactive handler with Normal priority and no filter.
    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) -> SubscriptionId {
        self.register(Subscription::to(kind), Subscriber::Reactive(handler))
    }

    pub fn subscribe(&mut self, options: Subscription, listener: PassiveListener) -> SubscriptionId {
        self.register(options, Subscriber::Passive(listener))
    }

    pub fn subscribe_reactive(
        &mut self,
        options: Subscription,
        handler: ReactiveHandler,
    ) -> SubscriptionId {
        self.register(options, Subscriber::Reactive(handler))
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for list in &mut self.subscribers {
            if let Some(pos) = list.iter().position(|e| e.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Drop every subscription scoped to `entity`. Returns how many went.
    pub fn drop_scope(&mut self, entity: EntityId) -> usize {
        let mut dropped = 0;
        for list in &mut self.subscribers {
            let before = list.len();
            list.retain(|e| e.scope != Some(entity));
            dropped += before - list.len();
        }
        dropped
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers[kind.index()].len()
    }

    /// Deliver all buffered events, kind by kind. Subscribers run in
    /// `(priority, registration order)`; filters and entity scopes are
    /// checked per event; buffers are cleared afterwards.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] {
                continue;
            }
            let Some(buffer) = self.buffers[idx].as_ref() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }

            let events: Vec<Event> = buffer.iter().cloned().collect();

            self.subscribers[idx].sort_by_key(|entry| (entry.priority as u8, entry.id));

            for entry in &mut self.subscribers[idx] {
                for event in &events {
                    if let Some(scope) = entry.scope
                        && event.entity() != Some(scope)
                    {
                        continue;
                    }
                    if let Some(ref filter) = entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    match &mut entry.subscriber {
                        Subscriber::Passive(listener) => listener(event),
                        Subscriber::Reactive(handler) => {
                            let commands = handler(event);
                            self.pending_commands.extend(commands);
                        }
                    }
                }
            }

            if let Some(buffer) = self.buffers[idx].as_mut() {
                buffer.clear();
            }
        }
    }

    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending_commands)
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    /// Clear all buffers. Subscribers and suppression settings stay.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
        self.pending_commands.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
