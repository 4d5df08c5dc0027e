//! The per-ingredient process state machine.
//!
//! One generic machine serves every kind; the kind's [`KindProfile`] decides
//! which transitions exist and how each one completes:
//!
//! - **Timed** -- starts, runs for `duration`, applies the transition. Blocks
//!   picking while it runs.
//! - **Strikes** -- no timer; each accepted strike counts toward `needed`.
//! - **Doneness race** -- reaches `Cooked` at `done_at` and keeps running
//!   until `burn_at`, where it becomes `Burned`. Cancelling (removing the
//!   ingredient from the heat) freezes the last reached state.
//!
//! Timers are plain data advanced by [`Ingredient::tick`]; cancellation is a
//! state reset.

use crate::error::Rejection;
use crate::fixed::{Fixed64, Seconds, progress_ratio};
use crate::id::InputId;
use crate::ingredient::{Ingredient, IngredientKind, ProcessState, ProcessType};
use crate::registry::{KindProfile, ProcessMode, Registry};

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// The currently running timed operation, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Idle,
    Timed {
        process: ProcessType,
        to: ProcessState,
        elapsed: Seconds,
        duration: Seconds,
    },
    Race {
        elapsed: Seconds,
        done_at: Seconds,
        burn_at: Seconds,
        done: ProcessState,
    },
}

impl Activity {
    /// The process type this activity performs.
    pub fn process(&self) -> Option<ProcessType> {
        match self {
            Activity::Idle => None,
            Activity::Timed { process, .. } => Some(*process),
            Activity::Race { .. } => Some(ProcessType::Cook),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a successful `start_process` set in motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStart {
    /// A timer is now running.
    Timed { duration: Seconds },
    /// A doneness race is now running.
    Race { done_at: Seconds, burn_at: Seconds },
    /// Nothing runs on its own; the process waits for strikes.
    AwaitingStrikes { needed: u32 },
}

/// A state transition that happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub process: ProcessType,
    pub from: ProcessState,
    pub to: ProcessState,
}

/// Outcome of one tick for one ingredient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessTick {
    /// `(process, progress in [0, 1])` if a timed operation was running.
    pub progress: Option<(ProcessType, Fixed64)>,
    /// Transitions applied this tick, oldest first. A long tick through a
    /// doneness race can apply both the cook and the burn.
    pub completed: Vec<Completion>,
}

/// Outcome of one accepted strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeOutcome {
    pub count: u32,
    pub needed: u32,
    pub completed: Option<Completion>,
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

impl Ingredient {
    /// A fresh, raw ingredient of `kind`.
    pub fn new(kind: IngredientKind, registry: &Registry) -> Self {
        let state = ProcessState::Raw;
        Self {
            kind,
            state,
            allowed: registry.profile(kind).allowed(state),
            activity: Activity::Idle,
            strikes: 0,
        }
    }

    /// True iff nothing is running and `process` is legal from the current
    /// state.
    pub fn can_process(&self, process: ProcessType) -> bool {
        !self.is_processing() && self.allowed.contains(process)
    }

    /// False while an uninterruptible timed operation runs. A doneness race
    /// never blocks picking; the pick cancels it.
    pub fn can_pick(&self) -> bool {
        !matches!(self.activity, Activity::Timed { .. })
    }

    /// Begin `process`. `held` is whether a touch currently holds this
    /// ingredient; held ingredients never start processing.
    pub fn start_process(
        &mut self,
        process: ProcessType,
        profile: &KindProfile,
        held: Option<InputId>,
    ) -> Result<ProcessStart, Rejection> {
        if let Some(input) = held {
            return Err(Rejection::EntityHeld(input));
        }
        if self.is_processing() {
            return Err(Rejection::AlreadyProcessing);
        }
        let not_allowed = Rejection::ProcessNotAllowed {
            process,
            state: self.state,
        };
        if !self.allowed.contains(process) {
            return Err(not_allowed);
        }
        let transition = profile.transition(self.state, process).ok_or(not_allowed)?;

        let start = match transition.mode {
            ProcessMode::Timed { duration } => {
                self.activity = Activity::Timed {
                    process,
                    to: transition.to,
                    elapsed: Seconds::ZERO,
                    duration,
                };
                ProcessStart::Timed { duration }
            }
            ProcessMode::DonenessRace { done_at, burn_at } => {
                self.activity = Activity::Race {
                    elapsed: Seconds::ZERO,
                    done_at,
                    burn_at,
                    done: transition.to,
                };
                ProcessStart::Race { done_at, burn_at }
            }
            ProcessMode::Strikes { needed } => ProcessStart::AwaitingStrikes { needed },
        };
        Ok(start)
    }

    /// Advance the running operation by `dt`.
    pub fn tick(&mut self, dt: Seconds, profile: &KindProfile) -> ProcessTick {
        let mut result = ProcessTick::default();
        match &mut self.activity {
            Activity::Idle => {}
            Activity::Timed {
                process,
                to,
                elapsed,
                duration,
            } => {
                *elapsed = elapsed.saturating_add(dt);
                let (process, to, now, duration) = (*process, *to, *elapsed, *duration);
                result.progress = Some((process, progress_ratio(now, duration)));
                if now >= duration {
                    result.completed.push(self.apply(process, to, profile));
                    self.activity = Activity::Idle;
                }
            }
            Activity::Race {
                elapsed,
                done_at,
                burn_at,
                done,
            } => {
                *elapsed = elapsed.saturating_add(dt);
                let (now, done_at, burn_at, done) = (*elapsed, *done_at, *burn_at, *done);
                result.progress = Some((ProcessType::Cook, progress_ratio(now, done_at)));
                if now >= done_at && self.state < done {
                    result
                        .completed
                        .push(self.apply(ProcessType::Cook, done, profile));
                }
                if now >= burn_at {
                    result
                        .completed
                        .push(self.apply(ProcessType::Cook, ProcessState::Burned, profile));
                    self.activity = Activity::Idle;
                }
            }
        }
        result
    }

    /// Stop a doneness race, keeping whatever state it last reached. The
    /// timer is discarded; a later cook starts from zero.
    pub fn cancel(&mut self) -> Result<ProcessState, Rejection> {
        match self.activity {
            Activity::Race { .. } => {
                self.activity = Activity::Idle;
                Ok(self.state)
            }
            Activity::Timed { .. } => Err(Rejection::NotCancellable),
            Activity::Idle => Ok(self.state),
        }
    }

    /// Register one accepted strike of `process`.
    pub fn strike(
        &mut self,
        process: ProcessType,
        profile: &KindProfile,
    ) -> Result<StrikeOutcome, Rejection> {
        if self.is_processing() {
            return Err(Rejection::AlreadyProcessing);
        }
        if !self.allowed.contains(process) {
            return Err(Rejection::ProcessNotAllowed {
                process,
                state: self.state,
            });
        }
        let transition = profile
            .transition(self.state, process)
            .ok_or(Rejection::NotStrikeDriven(process))?;
        let ProcessMode::Strikes { needed } = transition.mode else {
            return Err(Rejection::NotStrikeDriven(process));
        };
        let to = transition.to;

        self.strikes += 1;
        let count = self.strikes;
        let completed = if count >= needed {
            Some(self.apply(process, to, profile))
        } else {
            None
        };
        Ok(StrikeOutcome {
            count,
            needed,
            completed,
        })
    }

    fn apply(&mut self, process: ProcessType, to: ProcessState, profile: &KindProfile) -> Completion {
        let from = self.state;
        debug_assert!(to > from, "transitions only move forward");
        self.state = to;
        self.allowed = profile.allowed(to);
        self.strikes = 0;
        Completion { process, from, to }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::secs;
    use crate::ingredient::Bun;
    use crate::registry::RegistryBuilder;

    fn registry() -> Registry {
        Registry::standard()
    }

    fn fresh(kind: IngredientKind) -> (Ingredient, KindProfile) {
        let reg = registry();
        (Ingredient::new(kind, &reg), reg.profile(kind).clone())
    }

    fn run(ing: &mut Ingredient, profile: &KindProfile, total: f64, dt: f64) -> Vec<Completion> {
        let mut done = Vec::new();
        let steps = (total / dt).round() as usize;
        for _ in 0..steps {
            done.extend(ing.tick(secs(dt), profile).completed);
        }
        done
    }

    #[test]
    fn fresh_ingredient_is_raw_and_idle() {
        let (lettuce, _) = fresh(IngredientKind::Lettuce);
        assert_eq!(lettuce.state(), ProcessState::Raw);
        assert!(!lettuce.is_processing());
        assert_eq!(lettuce.current_timer(), Seconds::ZERO);
        assert!(lettuce.can_process(ProcessType::Wash));
        assert!(!lettuce.can_process(ProcessType::Cut));
    }

    #[test]
    fn held_ingredient_does_not_start() {
        let (mut cheese, profile) = fresh(IngredientKind::Cheese);
        let err = cheese
            .start_process(ProcessType::Cut, &profile, Some(InputId(4)))
            .unwrap_err();
        assert_eq!(err, Rejection::EntityHeld(InputId(4)));
        assert!(!cheese.is_processing());
    }

    #[test]
    fn disallowed_process_is_rejected_without_change() {
        let (mut bread, profile) = fresh(IngredientKind::Bread(Bun::Bottom));
        let before = bread.clone();
        let err = bread
            .start_process(ProcessType::Cook, &profile, None)
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::ProcessNotAllowed {
                process: ProcessType::Cook,
                state: ProcessState::Raw
            }
        );
        assert_eq!(bread, before);
    }

    #[test]
    fn timed_cut_completes_and_reports_progress() {
        let (mut cheese, profile) = fresh(IngredientKind::Cheese);
        let start = cheese
            .start_process(ProcessType::Cut, &profile, None)
            .unwrap();
        assert_eq!(start, ProcessStart::Timed { duration: secs(1.5) });
        assert!(cheese.is_processing());
        assert!(!cheese.can_pick());

        let t = cheese.tick(secs(0.75), &profile);
        assert_eq!(t.progress, Some((ProcessType::Cut, secs(0.5))));
        assert!(t.completed.is_empty());
        assert_eq!(cheese.current_timer(), secs(0.75));

        let t = cheese.tick(secs(0.75), &profile);
        assert_eq!(t.progress, Some((ProcessType::Cut, Fixed64::ONE)));
        assert_eq!(
            t.completed,
            vec![Completion {
                process: ProcessType::Cut,
                from: ProcessState::Raw,
                to: ProcessState::Cut
            }]
        );
        assert_eq!(cheese.state(), ProcessState::Cut);
        assert!(!cheese.is_processing());
        assert!(cheese.allowed_processes().is_empty());
    }

    #[test]
    fn second_start_while_processing_is_rejected() {
        let (mut cheese, profile) = fresh(IngredientKind::Cheese);
        cheese
            .start_process(ProcessType::Cut, &profile, None)
            .unwrap();
        assert_eq!(
            cheese.start_process(ProcessType::Cut, &profile, None),
            Err(Rejection::AlreadyProcessing)
        );
        assert!(!cheese.can_process(ProcessType::Cut));
    }

    #[test]
    fn timed_operation_is_not_cancellable() {
        let (mut cheese, profile) = fresh(IngredientKind::Cheese);
        cheese
            .start_process(ProcessType::Cut, &profile, None)
            .unwrap();
        assert_eq!(cheese.cancel(), Err(Rejection::NotCancellable));
        assert!(cheese.is_processing());
    }

    #[test]
    fn meat_cooks_at_three_seconds() {
        let (mut meat, profile) = fresh(IngredientKind::Meat);
        meat.start_process(ProcessType::Cook, &profile, None)
            .unwrap();
        let done = run(&mut meat, &profile, 3.0, 0.25);
        assert_eq!(meat.state(), ProcessState::Cooked);
        assert_eq!(done.len(), 1);
        // Still on the heat: the race continues.
        assert!(meat.is_processing());
        assert!(meat.can_pick());
    }

    #[test]
    fn meat_burns_at_six_seconds() {
        let (mut meat, profile) = fresh(IngredientKind::Meat);
        meat.start_process(ProcessType::Cook, &profile, None)
            .unwrap();
        run(&mut meat, &profile, 6.0, 0.25);
        assert_eq!(meat.state(), ProcessState::Burned);
        assert!(!meat.is_processing());
    }

    #[test]
    fn meat_just_before_burn_is_cooked() {
        let (mut meat, profile) = fresh(IngredientKind::Meat);
        meat.start_process(ProcessType::Cook, &profile, None)
            .unwrap();
        run(&mut meat, &profile, 5.75, 0.25);
        assert_eq!(meat.state(), ProcessState::Cooked);
    }

    #[test]
    fn cancelled_race_freezes_state() {
        let (mut meat, profile) = fresh(IngredientKind::Meat);
        meat.start_process(ProcessType::Cook, &profile, None)
            .unwrap();
        run(&mut meat, &profile, 4.0, 0.5);
        assert_eq!(meat.cancel(), Ok(ProcessState::Cooked));
        assert!(!meat.is_processing());
        assert_eq!(meat.current_timer(), Seconds::ZERO);

        let done = run(&mut meat, &profile, 10.0, 0.5);
        assert!(done.is_empty());
        assert_eq!(meat.state(), ProcessState::Cooked);
    }

    #[test]
    fn race_cancelled_before_doneness_stays_raw_and_can_cook_again() {
        let (mut meat, profile) = fresh(IngredientKind::Meat);
        meat.start_process(ProcessType::Cook, &profile, None)
            .unwrap();
        run(&mut meat, &profile, 2.0, 0.5);
        assert_eq!(meat.cancel(), Ok(ProcessState::Raw));
        assert!(meat.can_process(ProcessType::Cook));
    }

    #[test]
    fn one_long_tick_can_cook_and_burn() {
        let (mut meat, profile) = fresh(IngredientKind::Meat);
        meat.start_process(ProcessType::Cook, &profile, None)
            .unwrap();
        let t = meat.tick(secs(7.0), &profile);
        let states: Vec<_> = t.completed.iter().map(|c| c.to).collect();
        assert_eq!(states, vec![ProcessState::Cooked, ProcessState::Burned]);
    }

    #[test]
    fn lettuce_needs_washing_before_slicing() {
        let (mut lettuce, profile) = fresh(IngredientKind::Lettuce);
        assert_eq!(
            lettuce.strike(ProcessType::Cut, &profile),
            Err(Rejection::ProcessNotAllowed {
                process: ProcessType::Cut,
                state: ProcessState::Raw
            })
        );
        for _ in 0..3 {
            lettuce.strike(ProcessType::Wash, &profile).unwrap();
        }
        assert_eq!(lettuce.state(), ProcessState::Washed);
        assert_eq!(lettuce.current_strikes(), 0);
        for i in 1..=4 {
            let out = lettuce.strike(ProcessType::Cut, &profile).unwrap();
            assert_eq!(out.count, i);
        }
        assert_eq!(lettuce.state(), ProcessState::Cut);
    }

    #[test]
    fn tomato_slices_from_raw() {
        let (mut tomato, profile) = fresh(IngredientKind::Tomato);
        let first = tomato.strike(ProcessType::Cut, &profile).unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(first.needed, 3);
        assert!(first.completed.is_none());
        tomato.strike(ProcessType::Cut, &profile).unwrap();
        let last = tomato.strike(ProcessType::Cut, &profile).unwrap();
        assert_eq!(last.completed.map(|c| c.to), Some(ProcessState::Cut));
        assert_eq!(
            tomato.strike(ProcessType::Cut, &profile),
            Err(Rejection::ProcessNotAllowed {
                process: ProcessType::Cut,
                state: ProcessState::Cut
            })
        );
    }

    #[test]
    fn timed_process_cannot_be_struck() {
        let (mut cheese, profile) = fresh(IngredientKind::Cheese);
        assert_eq!(
            cheese.strike(ProcessType::Cut, &profile),
            Err(Rejection::NotStrikeDriven(ProcessType::Cut))
        );
    }

    #[test]
    fn strike_driven_start_does_not_set_processing() {
        let (mut tomato, profile) = fresh(IngredientKind::Tomato);
        let start = tomato
            .start_process(ProcessType::Cut, &profile, None)
            .unwrap();
        assert_eq!(start, ProcessStart::AwaitingStrikes { needed: 3 });
        assert!(!tomato.is_processing());
    }

    #[test]
    fn custom_timed_wash_profile() {
        let mut b = RegistryBuilder::with_defaults();
        b.mutate(IngredientKind::Lettuce, |p| {
            p.transitions[0].mode = ProcessMode::Timed {
                duration: secs(2.0),
            };
        })
        .unwrap();
        let reg = b.build().unwrap();
        let profile = reg.profile(IngredientKind::Lettuce);
        let mut lettuce = Ingredient::new(IngredientKind::Lettuce, &reg);
        lettuce
            .start_process(ProcessType::Wash, profile, None)
            .unwrap();
        run(&mut lettuce, profile, 2.0, 0.5);
        assert_eq!(lettuce.state(), ProcessState::Washed);
        assert!(lettuce.allowed_processes().contains(ProcessType::Cut));
    }
}
