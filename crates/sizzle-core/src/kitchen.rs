//! The kitchen: owner of every entity, fixture and session, and the tick
//! pipeline that resolves them.
//!
//! All mutation funnels through [`Kitchen::apply`] (input and task
//! commands) and [`Kitchen::step`] (time). Each module below the kitchen
//! makes a pure decision; the kitchen applies it and turns refusals into
//! feedback events.

use slotmap::{Key, SlotMap};

use crate::assignment::{AssignmentManager, AssignmentSignal};
use crate::command_queue::{Command, CommandQueue};
use crate::config::{KitchenConfig, LayoutError, SlotConfig};
use crate::container::{Container, ContainerKind, ContainerSpec};
use crate::entity::{Body, DispenserItem, Entity, Location, Origin};
use crate::error::Rejection;
use crate::event::{
    Event, EventBus, EventKind, PassiveListener, ReactiveHandler, Subscription,
};
use crate::fixed::{Fixed64, Seconds, Ticks, progress_ratio};
use crate::geometry::Position;
use crate::hold::{HoldConfig, HoldTick};
use crate::id::*;
use crate::ingredient::{Ingredient, IngredientKind, ProcessState, ProcessType};
use crate::process::Activity;
use crate::query::{ContainerSnapshot, IngredientSnapshot, SlotSnapshot};
use crate::registry::Registry;
use crate::sim::{SimState, StateHash};
use crate::station::{Detector, StationConfig, StationSession};
use crate::touch::{HitTarget, PickOutcome, TouchArbiter};
use crate::workstation::{Admission, Candidate, DeliveryZone, Dispenser, Workstation};

// ---------------------------------------------------------------------------
// Kitchen
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Kitchen {
    registry: Registry,
    hold: HoldConfig,
    station: StationConfig,
    pick_radius: Fixed64,

    entities: SlotMap<EntityId, Entity>,
    workstations: Vec<Workstation>,
    /// Strike sessions, parallel to `workstations`.
    sessions: Vec<StationSession>,
    dispensers: Vec<Dispenser>,
    zones: Vec<DeliveryZone>,

    touch: TouchArbiter,
    assignments: AssignmentManager,
    commands: CommandQueue,
    event_bus: EventBus,

    pub sim_state: SimState,
    last_state_hash: u64,
}

impl Kitchen {
    /// Build a kitchen from a validated layout.
    pub fn new(config: KitchenConfig) -> Result<Self, LayoutError> {
        config.validate()?;
        let registry = config.registry()?;
        let dispensers = config
            .dispensers
            .iter()
            .enumerate()
            .map(|(i, d)| Dispenser {
                id: DispenserId(i as u32),
                bounds: d.bounds,
                item: d.item,
            })
            .collect();
        let zones = config
            .delivery_zones
            .iter()
            .enumerate()
            .map(|(i, z)| DeliveryZone {
                id: ZoneId(i as u32),
                bounds: z.bounds,
            })
            .collect();

        let mut kitchen = Self {
            registry,
            hold: config.hold,
            station: config.station,
            pick_radius: config.pick_radius,
            entities: SlotMap::with_key(),
            workstations: Vec::with_capacity(config.slots.len()),
            sessions: Vec::with_capacity(config.slots.len()),
            dispensers,
            zones,
            touch: TouchArbiter::new(),
            assignments: AssignmentManager::new(config.request_timeout),
            commands: CommandQueue::new(),
            event_bus: EventBus::new(config.event_capacity),
            sim_state: SimState::new(),
            last_state_hash: 0,
        };
        for slot in config.slots {
            kitchen.add_workstation(slot)?;
        }
        kitchen.last_state_hash = kitchen.compute_state_hash();
        Ok(kitchen)
    }

    /// Register a workstation. Ids stay dense: the new slot gets the next
    /// index. Pending task requests for its type bind on the next tick.
    pub fn add_workstation(&mut self, slot: SlotConfig) -> Result<SlotId, LayoutError> {
        let index = self.workstations.len();
        slot.check(index)?;
        let id = SlotId(index as u32);
        let mut workstation = Workstation::new(id, slot.process, slot.bounds);
        if let Some(spec) = slot.attached {
            let anchor = workstation.anchor();
            let container = self.entities.insert(Entity::new(
                Body::Container(Container::new(spec)),
                anchor,
                Origin::Placed,
            ));
            self.entities[container].settle(Location::Slot(id), anchor);
            workstation.attach(container);
        }
        self.workstations.push(workstation);
        self.sessions.push(StationSession::default());
        self.assignments.register_slot(id, slot.process);
        log::debug!("workstation {:?} registered for {:?}", id, slot.process);
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Host API
    // -----------------------------------------------------------------------

    /// Put a loose ingredient in the world.
    pub fn spawn_ingredient(&mut self, kind: IngredientKind, position: Position) -> EntityId {
        let ingredient = Ingredient::new(kind, &self.registry);
        self.entities.insert(Entity::new(
            Body::Ingredient(ingredient),
            position,
            Origin::Placed,
        ))
    }

    /// Put an empty loose container in the world.
    pub fn spawn_container(&mut self, spec: ContainerSpec, position: Position) -> EntityId {
        self.entities.insert(Entity::new(
            Body::Container(Container::new(spec)),
            position,
            Origin::Placed,
        ))
    }

    /// Place a loose entity on a slot, with the same admission rules and
    /// auto-start as a drop. A refusal also emits `InvalidPlacement`.
    pub fn place(&mut self, entity: EntityId, slot: SlotId) -> Result<(), Rejection> {
        let location = self
            .entities
            .get(entity)
            .ok_or(Rejection::UnknownEntity(entity))?
            .location;
        let result = match location {
            Location::Free => self.try_place(entity, slot),
            Location::Held(input) => Err(Rejection::EntityHeld(input)),
            Location::Slot(_) | Location::Container(_) => Err(Rejection::AlreadyPlaced),
        };
        if let Err(reason) = result {
            self.emit(Event::InvalidPlacement {
                slot: Some(slot),
                entity,
                reason,
                tick: self.sim_state.tick,
            });
            log::warn!("placement of {:?} on {:?} refused: {}", entity, slot, reason);
        }
        result
    }

    /// Destroy an entity and everything in it.
    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        if !self.entities.contains_key(entity) {
            return false;
        }
        self.destroy(entity);
        true
    }

    /// Queue a command for the next step.
    pub fn submit(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Execute a command now. Phase 1 of [`step`](Self::step) runs queued
    /// commands through here.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::InputBegin { input, position } => self.input_begin(input, position),
            Command::InputMove { input, position } => self.input_move(input, position),
            Command::InputEnd { input, position } => self.input_end(input, position),
            Command::AssignTask(request) => {
                let signals = self.assignments.assign(request, self.sim_state.clock);
                self.apply_signals(signals);
            }
            Command::UnassignTask { actor } => {
                if let Some(signal) = self.assignments.unassign(actor) {
                    self.apply_signals(vec![signal]);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Advance the kitchen by `dt`. Negative deltas count as zero; while
    /// paused, nothing happens.
    pub fn step(&mut self, dt: Seconds) {
        if self.sim_state.paused {
            return;
        }
        let dt = dt.max(Seconds::ZERO);

        self.phase_input();
        self.phase_gestures(dt);
        self.phase_process(dt);
        self.phase_assignment(dt);
        self.phase_post_tick();
        self.phase_bookkeeping(dt);
    }

    fn phase_input(&mut self) {
        let commands = self.commands.drain(self.sim_state.tick);
        for command in commands {
            self.apply(command);
        }
    }

    fn phase_gestures(&mut self, dt: Seconds) {
        let mut fired = Vec::new();
        for (id, entity) in &mut self.entities {
            match entity.hold.tick(dt, &self.hold) {
                HoldTick::Fired(input) => fired.push((id, input)),
                HoldTick::Cancelled(input) => {
                    log::debug!("hold on {:?} by {:?} drifted away", id, input)
                }
                HoldTick::Idle | HoldTick::Dwelling { .. } => {}
            }
        }
        for (entity, input) in fired {
            // The input may have lifted or grabbed something else since.
            if self.touch.session(input).is_none() || self.touch.held_by(input).is_some() {
                continue;
            }
            if let Err(reason) = self.pick(entity, input) {
                self.reject(Some(entity), reason);
            }
        }
    }

    fn phase_process(&mut self, dt: Seconds) {
        let tick = self.sim_state.tick;
        let mut credits = Vec::new();
        for (id, entity) in &mut self.entities {
            let Some(ingredient) = entity.ingredient_mut() else {
                continue;
            };
            if !ingredient.is_processing() {
                continue;
            }
            let profile = self.registry.profile(ingredient.kind());
            let outcome = ingredient.tick(dt, profile);
            if let Some((process, progress)) = outcome.progress {
                self.event_bus.emit(Event::ProcessProgress {
                    entity: id,
                    process,
                    progress,
                    tick,
                });
            }
            for done in outcome.completed {
                self.event_bus.emit(Event::ProcessCompleted {
                    entity: id,
                    process: done.process,
                    from: done.from,
                    to: done.to,
                    tick,
                });
                log::debug!("{:?} reached {:?}", id, done.to);
                if done.to != ProcessState::Burned {
                    credits.push((id, done.process));
                }
            }
        }
        for (entity, process) in credits {
            if let Some(slot) = self.station_of(entity) {
                self.credit(slot, process);
            }
        }
    }

    fn phase_assignment(&mut self, dt: Seconds) {
        let signals = self.assignments.tick(self.sim_state.clock + dt);
        self.apply_signals(signals);
    }

    fn phase_post_tick(&mut self) {
        self.event_bus.deliver();
        let reactions = self.event_bus.drain_commands();
        self.commands.push_batch(reactions);
    }

    fn phase_bookkeeping(&mut self, dt: Seconds) {
        self.sim_state.advance(dt);
        self.last_state_hash = self.compute_state_hash();
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    fn input_begin(&mut self, input: InputId, position: Position) {
        if let Err(reason) = self.touch.begin(input, position, self.sim_state.clock) {
            self.reject(None, reason);
            return;
        }
        match self.resolve_hit(&position) {
            None => {}
            Some(HitTarget::Dispenser(dispenser)) => self.dispense(dispenser, input, position),
            Some(HitTarget::Loose(entity)) | Some(HitTarget::LooseContainer(entity)) => {
                if let Err(reason) = self.pick(entity, input) {
                    self.reject(Some(entity), reason);
                }
            }
            Some(HitTarget::Docked { slot, entity }) => {
                self.offer_strike(slot, entity, input);
                self.start_hold(slot, entity, input, position);
            }
        }
    }

    fn input_move(&mut self, input: InputId, position: Position) {
        match self.touch.move_to(input, position) {
            Ok(Some(entity)) => self.move_stack(entity, position),
            Ok(None) => {}
            Err(reason) => {
                self.reject(None, reason);
                return;
            }
        }
        for entity in self.entities.values_mut() {
            entity.hold.track(input, position);
        }
    }

    fn input_end(&mut self, input: InputId, position: Position) {
        for entity in self.entities.values_mut() {
            if entity.hold.input() == Some(input) {
                entity.hold.stop();
            }
        }
        for session in &mut self.sessions {
            session.release(input);
        }
        let Some(session) = self.touch.end(input) else {
            self.reject(None, Rejection::NoSession(input));
            return;
        };
        if let Some(entity) = session.held {
            self.resolve_drop(entity, input, position);
        }
    }

    /// What a touch at `position` lands on. Dispensers win, then loose
    /// ingredients, then slot occupants, then loose containers.
    fn resolve_hit(&self, position: &Position) -> Option<HitTarget> {
        if let Some(dispenser) = self.dispensers.iter().find(|d| d.bounds.contains(position)) {
            return Some(HitTarget::Dispenser(dispenser.id));
        }
        if let Some(entity) = self.nearest_loose(position, false) {
            return Some(HitTarget::Loose(entity));
        }
        for workstation in &self.workstations {
            if !workstation.contains(position) {
                continue;
            }
            let Some(occupant) = workstation.occupant() else {
                continue;
            };
            let target = if workstation.has_attached_container() {
                self.entities
                    .get(occupant)
                    .and_then(Entity::container)
                    .and_then(Container::top)
            } else {
                Some(occupant)
            };
            if let Some(entity) = target {
                return Some(HitTarget::Docked {
                    slot: workstation.id,
                    entity,
                });
            }
        }
        self.nearest_loose(position, true)
            .map(HitTarget::LooseContainer)
    }

    /// Nearest free-standing (or already held) entity within pick reach.
    /// Held entities are included so a second input sees the conflict.
    fn nearest_loose(&self, position: &Position, containers: bool) -> Option<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| {
                e.is_container() == containers
                    && matches!(e.location, Location::Free | Location::Held(_))
                    && e.position.within(position, self.pick_radius)
            })
            .min_by_key(|(_, e)| e.position.distance_squared(position))
            .map(|(id, _)| id)
    }

    fn dispense(&mut self, dispenser: DispenserId, input: InputId, position: Position) {
        let Some(item) = self.dispensers.get(dispenser.index()).map(|d| d.item) else {
            return;
        };
        let body = match item {
            DispenserItem::Ingredient(kind) => {
                Body::Ingredient(Ingredient::new(kind, &self.registry))
            }
            DispenserItem::Container(spec) => Body::Container(Container::new(spec)),
        };
        let entity = self
            .entities
            .insert(Entity::new(body, position, Origin::Dispenser(dispenser)));
        self.emit(Event::EntitySpawned {
            entity,
            dispenser,
            tick: self.sim_state.tick,
        });
        if let Err(reason) = self.pick(entity, input) {
            self.destroy(entity);
            self.reject(None, reason);
        }
    }

    fn offer_strike(&mut self, slot: SlotId, entity: EntityId, input: InputId) {
        let Some(detector) = self
            .workstations
            .get(slot.index())
            .and_then(|ws| Detector::for_process(ws.process))
        else {
            return;
        };
        let process = detector.process();
        let Some(ingredient) = self.entities.get(entity).and_then(Entity::ingredient) else {
            return;
        };
        let strike_driven = self
            .registry
            .profile(ingredient.kind())
            .transition(ingredient.state(), process)
            .is_some_and(|t| !t.mode.is_timer_driven());
        if !strike_driven {
            return;
        }

        let now = self.sim_state.clock;
        let Some(session) = self.sessions.get_mut(slot.index()) else {
            return;
        };
        if let Err(reason) = session.admit(input, entity, now, &self.station) {
            log::debug!("strike on {:?} refused: {}", entity, reason);
            self.reject(Some(entity), reason);
            return;
        }

        let Some(ingredient) = self.entities.get_mut(entity).and_then(Entity::ingredient_mut)
        else {
            return;
        };
        let profile = self.registry.profile(ingredient.kind());
        match ingredient.strike(process, profile) {
            Ok(outcome) => {
                if let Some(session) = self.sessions.get_mut(slot.index()) {
                    session.record(input, entity, now, outcome.completed.is_some());
                }
                let tick = self.sim_state.tick;
                self.event_bus.emit(Event::StrikeAccepted {
                    slot,
                    entity,
                    input,
                    count: outcome.count,
                    needed: outcome.needed,
                    tick,
                });
                log::debug!(
                    "{:?} strike {}/{} on {:?}",
                    detector,
                    outcome.count,
                    outcome.needed,
                    entity
                );
                if let Some(done) = outcome.completed {
                    self.event_bus.emit(Event::ProcessCompleted {
                        entity,
                        process: done.process,
                        from: done.from,
                        to: done.to,
                        tick,
                    });
                    self.credit(slot, done.process);
                }
            }
            Err(reason) => self.reject(Some(entity), reason),
        }
    }

    fn start_hold(&mut self, slot: SlotId, entity: EntityId, input: InputId, position: Position) {
        let bounds = self.workstations.get(slot.index()).map(|ws| ws.bounds);
        let Some(target) = self.entities.get_mut(entity) else {
            return;
        };
        if let Err(reason) = target.hold.start(input, position, bounds) {
            self.reject(Some(entity), reason);
        }
    }

    // -----------------------------------------------------------------------
    // Pick and drop
    // -----------------------------------------------------------------------

    /// Bind `entity` to `input`, detaching it from wherever it rests. A
    /// running doneness race on it (or inside it) is cancelled.
    fn pick(&mut self, entity: EntityId, input: InputId) -> Result<(), Rejection> {
        let target = self
            .entities
            .get(entity)
            .ok_or(Rejection::UnknownEntity(entity))?;
        if let Location::Held(holder) = target.location {
            return Err(Rejection::EntityHeld(holder));
        }
        let stack = self.stack_of(entity);
        for id in &stack {
            if let Some(ingredient) = self.entities.get(*id).and_then(Entity::ingredient)
                && !ingredient.can_pick()
            {
                return Err(Rejection::AlreadyProcessing);
            }
        }
        self.touch.bind(input, entity)?;

        let tick = self.sim_state.tick;
        for id in stack {
            let Some(ingredient) = self.entities.get_mut(id).and_then(Entity::ingredient_mut)
            else {
                continue;
            };
            if !matches!(ingredient.activity(), Activity::Race { .. }) {
                continue;
            }
            if let Ok(kept) = ingredient.cancel() {
                self.event_bus.emit(Event::ProcessCancelled {
                    entity: id,
                    process: ProcessType::Cook,
                    kept,
                    tick,
                });
                log::debug!("cook on {:?} cancelled, kept {:?}", id, kept);
            }
        }

        self.detach(entity);
        if let Some(target) = self.entities.get_mut(entity) {
            target.location = Location::Held(input);
            target.hold.stop();
        }
        self.emit(Event::EntityPicked {
            entity,
            input,
            tick,
        });
        log::debug!("{:?} picked {:?}", input, entity);
        Ok(())
    }

    fn resolve_drop(&mut self, entity: EntityId, input: InputId, position: Position) {
        self.move_stack(entity, position);
        if let Some(target) = self.entities.get_mut(entity) {
            target.location = Location::Free;
        }

        if let Some(zone) = self
            .zones
            .iter()
            .find(|z| z.bounds.contains(&position))
            .map(|z| z.id)
        {
            self.deliver(zone, entity);
            return;
        }

        let slot = self
            .workstations
            .iter()
            .find(|ws| ws.contains(&position))
            .map(|ws| ws.id);
        let result = match slot {
            Some(slot) => self.try_place(entity, slot),
            None => match self.loose_container_under(entity, &position) {
                Some(host) => self.add_to_container(host, entity).map(|_| ()),
                None => Err(Rejection::NoTarget),
            },
        };
        if let Err(reason) = result {
            self.emit(Event::InvalidPlacement {
                slot,
                entity,
                reason,
                tick: self.sim_state.tick,
            });
            log::warn!("drop of {:?} refused: {}", entity, reason);
            self.pick_failed(entity, input);
        }
    }

    /// A free container near a dropped ingredient.
    fn loose_container_under(&self, entity: EntityId, position: &Position) -> Option<EntityId> {
        if self.entities.get(entity).is_none_or(Entity::is_container) {
            return None;
        }
        self.nearest_loose(position, true)
            .filter(|host| self.entities.get(*host).is_some_and(|e| e.location == Location::Free))
    }

    fn try_place(&mut self, entity: EntityId, slot: SlotId) -> Result<(), Rejection> {
        let workstation = self
            .workstations
            .get(slot.index())
            .ok_or(Rejection::UnknownSlot(slot))?;
        let candidate = match &self
            .entities
            .get(entity)
            .ok_or(Rejection::UnknownEntity(entity))?
            .body
        {
            Body::Ingredient(i) => Candidate::Ingredient(i),
            Body::Container(c) => Candidate::Container(c),
        };
        let host = workstation
            .occupant()
            .filter(|occupant| *occupant != entity)
            .and_then(|occupant| self.entities.get(occupant))
            .and_then(Entity::container);
        let admission = workstation.admit(entity, candidate, host)?;
        let anchor = workstation.anchor();
        let tick = self.sim_state.tick;

        match admission {
            Admission::Occupy => {
                if let Some(workstation) = self.workstations.get_mut(slot.index()) {
                    workstation.occupy(entity)?;
                }
                self.settle_stack(entity, Location::Slot(slot), anchor);
                self.emit(Event::SlotOccupied { slot, entity, tick });
                self.emit(Event::EntityDropped { entity, slot, tick });
                for id in self.stack_of(entity) {
                    self.autostart(id, slot);
                }
            }
            Admission::IntoContainer(host) => {
                let completed_burger = self.add_to_container(host, entity)?;
                self.emit(Event::EntityDropped { entity, slot, tick });
                self.autostart(entity, slot);
                if completed_burger
                    && self
                        .workstations
                        .get(slot.index())
                        .is_some_and(|ws| ws.process == ProcessType::Assemble)
                {
                    self.credit(slot, ProcessType::Assemble);
                }
            }
        }
        log::debug!("{:?} placed on {:?}", entity, slot);
        Ok(())
    }

    /// Push an ingredient onto a container and seat it at its stack height.
    /// Returns true if this completed a burger for the first time.
    fn add_to_container(&mut self, host: EntityId, entity: EntityId) -> Result<bool, Rejection> {
        let ingredient = self
            .entities
            .get(entity)
            .ok_or(Rejection::UnknownEntity(entity))?
            .ingredient()
            .ok_or(Rejection::NotAnIngredient)?
            .clone();
        let host_entity = self
            .entities
            .get_mut(host)
            .ok_or(Rejection::UnknownEntity(host))?;
        let base = host_entity.position;
        let container = host_entity
            .container_mut()
            .ok_or(Rejection::NotAContainer(host))?;
        let completed_before = container.has_been_completed();
        let index = container.add(entity, &ingredient)?;
        let offset = container.offset_for(index);
        let first_completion = container.kind == ContainerKind::Burger
            && container.is_complete()
            && !completed_before;
        if let Some(member) = self.entities.get_mut(entity) {
            member.settle(Location::Container(host), base.raised(offset));
        }
        Ok(first_completion)
    }

    /// Start the slot's process on a freshly placed ingredient if its mode
    /// runs on a timer. Strike-mode processes wait for the detector.
    fn autostart(&mut self, entity: EntityId, slot: SlotId) {
        let Some(process) = self.workstations.get(slot.index()).map(|ws| ws.process) else {
            return;
        };
        if !matches!(
            process,
            ProcessType::Wash | ProcessType::Cut | ProcessType::Cook
        ) {
            return;
        }
        let holder = self.touch.holder(entity);
        let Some(ingredient) = self.entities.get_mut(entity).and_then(Entity::ingredient_mut)
        else {
            return;
        };
        let profile = self.registry.profile(ingredient.kind());
        let timer_driven = profile
            .transition(ingredient.state(), process)
            .is_some_and(|t| t.mode.is_timer_driven());
        if !timer_driven {
            return;
        }
        let tick = self.sim_state.tick;
        match ingredient.start_process(process, profile, holder) {
            Ok(start) => {
                self.event_bus.emit(Event::ProcessStarted {
                    entity,
                    process,
                    tick,
                });
                log::debug!("{:?} started {:?}: {:?}", entity, process, start);
            }
            Err(reason) => self.event_bus.emit(Event::OperationRejected {
                entity: Some(entity),
                reason,
                tick,
            }),
        }
    }

    /// Undo a failed drop. Anything that was resting on a slot or in a
    /// container goes back there; dispenser spawns are thrown away.
    fn pick_failed(&mut self, entity: EntityId, input: InputId) {
        let Some(target) = self.entities.get(entity) else {
            return;
        };
        let came_from_station = matches!(
            target.home.location,
            Location::Slot(_) | Location::Container(_)
        );
        let outcome = match target.origin {
            Origin::Dispenser(_) if !came_from_station => PickOutcome::Discarded,
            _ => PickOutcome::Returned,
        };
        match outcome {
            PickOutcome::Discarded => {
                self.destroy(entity);
                log::warn!("{:?} discarded after failed drop", entity);
            }
            PickOutcome::Returned => self.return_home(entity),
        }
        self.emit(Event::PickFailed {
            entity,
            input,
            outcome,
            tick: self.sim_state.tick,
        });
    }

    fn return_home(&mut self, entity: EntityId) {
        let Some(home) = self.entities.get(entity).map(|e| e.home) else {
            return;
        };
        let restored = match home.location {
            Location::Slot(slot) => self.restore_to_slot(entity, slot),
            Location::Container(host) => {
                let restored = self.add_to_container(host, entity).is_ok();
                if restored
                    && let Some(slot) = self.entities.get(host).and_then(Entity::slot)
                {
                    self.autostart(entity, slot);
                }
                restored
            }
            Location::Free | Location::Held(_) => false,
        };
        if !restored {
            self.settle_stack(entity, Location::Free, home.position);
        }
    }

    fn restore_to_slot(&mut self, entity: EntityId, slot: SlotId) -> bool {
        let Some(workstation) = self.workstations.get_mut(slot.index()) else {
            return false;
        };
        if workstation.occupy(entity).is_err() {
            return false;
        }
        let anchor = workstation.anchor();
        self.settle_stack(entity, Location::Slot(slot), anchor);
        self.emit(Event::SlotOccupied {
            slot,
            entity,
            tick: self.sim_state.tick,
        });
        for id in self.stack_of(entity) {
            self.autostart(id, slot);
        }
        true
    }

    fn deliver(&mut self, zone: ZoneId, entity: EntityId) {
        let mut results = Vec::new();
        if let Some(target) = self.entities.get(entity) {
            match &target.body {
                Body::Ingredient(i) => {
                    results.push((i.kind(), i.state(), DeliveryZone::accepts(i, None)))
                }
                Body::Container(c) => {
                    for member in c.contents() {
                        if let Some(i) = self.entities.get(*member).and_then(Entity::ingredient) {
                            results.push((i.kind(), i.state(), DeliveryZone::accepts(i, Some(c))));
                        }
                    }
                }
            }
        }
        let tick = self.sim_state.tick;
        for (kind, state, accepted) in results {
            self.event_bus.emit(Event::DeliveryResult {
                zone,
                kind,
                state,
                accepted,
                tick,
            });
            log::debug!("delivered {:?} {:?} at {:?}: {}", state, kind, zone, accepted);
        }
        self.destroy(entity);
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// The entity followed by its contents, bottom first.
    fn stack_of(&self, entity: EntityId) -> Vec<EntityId> {
        let mut stack = vec![entity];
        if let Some(container) = self.entities.get(entity).and_then(Entity::container) {
            stack.extend_from_slice(container.contents());
        }
        stack
    }

    fn stack_offsets(&self, entity: EntityId) -> Vec<(EntityId, Fixed64)> {
        self.entities
            .get(entity)
            .and_then(Entity::container)
            .map(|c| {
                c.contents()
                    .iter()
                    .enumerate()
                    .map(|(i, member)| (*member, c.offset_for(i)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rest an entity (and its contents) at `position`.
    fn settle_stack(&mut self, entity: EntityId, location: Location, position: Position) {
        let offsets = self.stack_offsets(entity);
        if let Some(target) = self.entities.get_mut(entity) {
            target.settle(location, position);
        }
        for (member, offset) in offsets {
            if let Some(m) = self.entities.get_mut(member) {
                m.settle(Location::Container(entity), position.raised(offset));
            }
        }
    }

    /// Drag an entity (and its contents) to `position` without resting it.
    fn move_stack(&mut self, entity: EntityId, position: Position) {
        let offsets = self.stack_offsets(entity);
        if let Some(target) = self.entities.get_mut(entity) {
            target.position = position;
        }
        for (member, offset) in offsets {
            if let Some(m) = self.entities.get_mut(member) {
                m.position = position.raised(offset);
            }
        }
    }

    /// Break the entity's slot or container back-reference, leaving it
    /// free.
    fn detach(&mut self, entity: EntityId) {
        let Some(location) = self.entities.get(entity).map(|e| e.location) else {
            return;
        };
        match location {
            Location::Slot(slot) => {
                if let Some(workstation) = self.workstations.get_mut(slot.index())
                    && workstation.occupant() == Some(entity)
                {
                    workstation.vacate();
                }
                if let Some(session) = self.sessions.get_mut(slot.index()) {
                    session.forget(entity);
                }
                self.emit(Event::SlotVacated {
                    slot,
                    entity,
                    tick: self.sim_state.tick,
                });
            }
            Location::Container(host) => {
                if let Some(container) = self.entities.get_mut(host).and_then(Entity::container_mut)
                    && container.remove(entity).is_err()
                {
                    log::warn!("{:?} was not a member of {:?}", entity, host);
                }
                if let Some(slot) = self.entities.get(host).and_then(Entity::slot)
                    && let Some(session) = self.sessions.get_mut(slot.index())
                {
                    session.forget(entity);
                }
            }
            Location::Free | Location::Held(_) => {}
        }
        if let Some(target) = self.entities.get_mut(entity) {
            target.location = Location::Free;
        }
    }

    fn destroy(&mut self, entity: EntityId) {
        let contents = self
            .entities
            .get(entity)
            .and_then(Entity::container)
            .map(|c| c.contents().to_vec())
            .unwrap_or_default();
        for member in contents {
            self.destroy(member);
        }
        self.detach(entity);
        self.touch.forget(entity);
        self.event_bus.drop_scope(entity);
        for session in &mut self.sessions {
            session.forget(entity);
        }
        self.entities.remove(entity);
        log::debug!("{:?} destroyed", entity);
    }

    /// The slot an ingredient is being processed on, directly or through
    /// the container it sits in.
    fn station_of(&self, entity: EntityId) -> Option<SlotId> {
        let target = self.entities.get(entity)?;
        match target.location {
            Location::Slot(slot) => Some(slot),
            Location::Container(host) => self.entities.get(host).and_then(Entity::slot),
            Location::Free | Location::Held(_) => None,
        }
    }

    // -----------------------------------------------------------------------
    // Assignments
    // -----------------------------------------------------------------------

    fn credit(&mut self, slot: SlotId, action: ProcessType) {
        match self.assignments.update_progress(slot, action) {
            Ok(signals) => self.apply_signals(signals),
            Err(Rejection::NoTask(_)) => {}
            Err(reason) => log::debug!("no credit on {:?}: {}", slot, reason),
        }
    }

    fn apply_signals(&mut self, signals: Vec<AssignmentSignal>) {
        let tick = self.sim_state.tick;
        for signal in signals {
            match signal {
                AssignmentSignal::Assigned {
                    actor,
                    task,
                    slot,
                    hint,
                } => {
                    if let Some(workstation) = self.workstations.get_mut(slot.index()) {
                        workstation.assigned_actor = Some(actor);
                    }
                    self.event_bus.emit(Event::TaskAssigned {
                        actor,
                        task,
                        slot,
                        hint,
                        tick,
                    });
                }
                AssignmentSignal::Failed {
                    actor,
                    task,
                    reason,
                } => self.event_bus.emit(Event::AssignmentFailed {
                    actor,
                    task,
                    reason,
                    tick,
                }),
                AssignmentSignal::Progress {
                    actor,
                    task,
                    current,
                    target,
                } => self.event_bus.emit(Event::TaskProgress {
                    actor,
                    task,
                    current,
                    target,
                    tick,
                }),
                AssignmentSignal::Complete { actor, task, slot } => {
                    if let Some(workstation) = self.workstations.get_mut(slot.index())
                        && workstation.assigned_actor == Some(actor)
                    {
                        workstation.assigned_actor = None;
                    }
                    self.event_bus.emit(Event::TaskComplete {
                        actor,
                        task,
                        slot,
                        tick,
                    });
                }
                AssignmentSignal::Released { actor, slot } => {
                    if let Some(workstation) = self.workstations.get_mut(slot.index())
                        && workstation.assigned_actor == Some(actor)
                    {
                        workstation.assigned_actor = None;
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    fn emit(&mut self, event: Event) {
        self.event_bus.emit(event);
    }

    fn reject(&mut self, entity: Option<EntityId>, reason: Rejection) {
        log::debug!("rejected ({:?}): {}", entity, reason);
        self.event_bus.emit(Event::OperationRejected {
            entity,
            reason,
            tick: self.sim_state.tick,
        });
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) -> SubscriptionId {
        self.event_bus.on_passive(kind, listener)
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) -> SubscriptionId {
        self.event_bus.on_reactive(kind, handler)
    }

    pub fn subscribe(&mut self, options: Subscription, listener: PassiveListener) -> SubscriptionId {
        self.event_bus.subscribe(options, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.event_bus.unsubscribe(id)
    }

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn ingredient(&self, id: EntityId) -> Option<&Ingredient> {
        self.entities.get(id).and_then(Entity::ingredient)
    }

    pub fn container(&self, id: EntityId) -> Option<&Container> {
        self.entities.get(id).and_then(Entity::container)
    }

    pub fn workstation(&self, id: SlotId) -> Option<&Workstation> {
        self.workstations.get(id.index())
    }

    pub fn workstations(&self) -> &[Workstation] {
        &self.workstations
    }

    pub fn session(&self, slot: SlotId) -> Option<&StationSession> {
        self.sessions.get(slot.index())
    }

    pub fn dispensers(&self) -> &[Dispenser] {
        &self.dispensers
    }

    pub fn delivery_zones(&self) -> &[DeliveryZone] {
        &self.zones
    }

    pub fn touch(&self) -> &TouchArbiter {
        &self.touch
    }

    pub fn assignments(&self) -> &AssignmentManager {
        &self.assignments
    }

    pub fn hold_config(&self) -> &HoldConfig {
        &self.hold
    }

    pub fn station_config(&self) -> &StationConfig {
        &self.station
    }

    pub fn ingredient_snapshot(&self, id: EntityId) -> Option<IngredientSnapshot> {
        let entity = self.entities.get(id)?;
        let ingredient = entity.ingredient()?;
        let (active_process, progress) = match *ingredient.activity() {
            Activity::Idle => (None, Fixed64::ZERO),
            Activity::Timed {
                process,
                elapsed,
                duration,
                ..
            } => (Some(process), progress_ratio(elapsed, duration)),
            Activity::Race {
                elapsed, done_at, ..
            } => (Some(ProcessType::Cook), progress_ratio(elapsed, done_at)),
        };
        Some(IngredientSnapshot {
            id,
            kind: ingredient.kind(),
            state: ingredient.state(),
            allowed_processes: ingredient.allowed_processes(),
            is_processing: ingredient.is_processing(),
            active_process,
            current_timer: ingredient.current_timer(),
            progress,
            current_strikes: ingredient.current_strikes(),
            location: entity.location,
            position: entity.position,
            held_by: self.touch.holder(id).or(entity.hold.input()),
        })
    }

    pub fn container_snapshot(&self, id: EntityId) -> Option<ContainerSnapshot> {
        let entity = self.entities.get(id)?;
        let container = entity.container()?;
        Some(ContainerSnapshot {
            id,
            kind: container.kind,
            capacity: container.capacity,
            contents: container.contents().to_vec(),
            is_complete: container.is_complete(),
            location: entity.location,
            position: entity.position,
        })
    }

    pub fn slot_snapshot(&self, id: SlotId) -> Option<SlotSnapshot> {
        let workstation = self.workstations.get(id.index())?;
        Some(SlotSnapshot {
            id,
            process: workstation.process,
            occupant: workstation.occupant(),
            has_attached_container: workstation.has_attached_container(),
            assigned_actor: workstation.assigned_actor,
            strike_input: self.sessions.get(id.index()).and_then(|s| s.bound_input),
        })
    }

    // -----------------------------------------------------------------------
    // Simulation state
    // -----------------------------------------------------------------------

    pub fn tick(&self) -> Ticks {
        self.sim_state.tick
    }

    pub fn clock(&self) -> Seconds {
        self.sim_state.clock
    }

    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    pub fn pause(&mut self) {
        self.sim_state.paused = true;
    }

    pub fn resume(&mut self) {
        self.sim_state.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.sim_state.paused
    }

    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim_state.tick);
        hasher.write_fixed64(self.sim_state.clock);

        for (id, entity) in &self.entities {
            hasher.write_u64(id.data().as_ffi());
            match &entity.body {
                Body::Ingredient(i) => {
                    hasher.write_u8(0);
                    hasher.write_u8(i.kind().index() as u8);
                    hasher.write_u8(i.state().rank());
                    hasher.write_fixed64(i.current_timer());
                    hasher.write_u32(i.current_strikes());
                }
                Body::Container(c) => {
                    hasher.write_u8(1);
                    hasher.write_u32(c.len() as u32);
                    for member in c.contents() {
                        hasher.write_u64(member.data().as_ffi());
                    }
                }
            }
            hash_location(&mut hasher, entity.location);
            hasher.write_fixed64(entity.position.x);
            hasher.write_fixed64(entity.position.y);
        }

        for workstation in &self.workstations {
            match workstation.occupant() {
                Some(occupant) => hasher.write_u64(occupant.data().as_ffi()),
                None => hasher.write_u8(0),
            }
            hasher.write_u32(workstation.assigned_actor.map_or(u32::MAX, |a| a.0));
        }

        hasher.finish()
    }
}

fn hash_location(hasher: &mut StateHash, location: Location) {
    match location {
        Location::Free => hasher.write_u8(0),
        Location::Slot(slot) => {
            hasher.write_u8(1);
            hasher.write_u32(slot.0);
        }
        Location::Container(host) => {
            hasher.write_u8(2);
            hasher.write_u64(host.data().as_ffi());
        }
        Location::Held(input) => {
            hasher.write_u8(3);
            hasher.write_u64(input.0);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
