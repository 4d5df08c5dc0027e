//! Sizzle Core -- the simulation core of a multiplayer cooking minigame.
//!
//! This crate tracks cooking workstations, ingredient processing, containers
//! and multi-touch manipulation, and arbitrates exclusive access between
//! them: one occupant per workstation, one input per held entity, one actor
//! per assigned workstation. All time is Q32.32 fixed-point, so replicas fed
//! the same commands make the same decisions.
//!
//! # Six-Phase Tick Pipeline
//!
//! Each call to [`kitchen::Kitchen::step`] advances the simulation by one
//! tick through the following phases:
//!
//! 1. **Input** -- Apply queued input and task commands in submission order.
//! 2. **Gesture** -- Advance hold dwell timers; fired holds pick.
//! 3. **Process** -- Advance timed operations, apply completions, credit
//!    task progress.
//! 4. **Assignment** -- Retry or expire parked task requests.
//! 5. **Post-tick** -- Deliver buffered events and collect reactive commands.
//! 6. **Bookkeeping** -- Advance tick and clock, compute the state hash.
//!
//! # Command Pattern
//!
//! Platform input and remote task messages are commands. They are queued
//! and resolved at the next tick boundary, or applied on the spot:
//!
//! ```rust,ignore
//! kitchen.submit(Command::InputBegin { input: InputId(1), position });
//! kitchen.step(secs(1.0 / 60.0));
//! ```
//!
//! # Key Types
//!
//! - [`kitchen::Kitchen`] -- Owner of all state and pipeline orchestrator.
//! - [`ingredient::Ingredient`] -- Per-ingredient process state machine
//!   (driven by [`process`]).
//! - [`workstation::Workstation`] -- Exclusive single-occupant slot.
//! - [`container::Container`] -- Plates, pans and burger stacks.
//! - [`touch::TouchArbiter`] -- Input-to-entity binding.
//! - [`hold::HoldGesture`] -- Press-and-hold pick detection.
//! - [`station::StationSession`] -- Slice and wash strike detection.
//! - [`assignment::AssignmentManager`] -- Actor-to-workstation binding.
//! - [`registry::Registry`] -- Immutable per-kind transition tables.
//! - [`event::EventBus`] -- Subscription-based event bus with buffered
//!   delivery.

pub mod assignment;
pub mod command_queue;
pub mod config;
pub mod container;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod entity;
pub mod error;
pub mod event;
pub mod fixed;
pub mod geometry;
pub mod hold;
pub mod id;
pub mod ingredient;
pub mod kitchen;
pub mod process;
pub mod query;
pub mod registry;
pub mod sim;
pub mod station;
pub mod touch;
pub mod validation;
pub mod workstation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
