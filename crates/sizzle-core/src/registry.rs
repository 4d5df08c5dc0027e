use crate::fixed::{Seconds, secs};
use crate::ingredient::{Bun, IngredientKind, KIND_COUNT, ProcessSet, ProcessState, ProcessType};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Transition tables
// ---------------------------------------------------------------------------

/// How a process runs to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessMode {
    /// Completes after a fixed number of seconds. Cannot be interrupted.
    Timed { duration: Seconds },
    /// Completes after a number of accepted strikes (cuts, wash passes).
    Strikes { needed: u32 },
    /// Reaches `Cooked` at `done_at`, keeps running, and reaches `Burned` at
    /// `burn_at`. Removing the ingredient cancels it and keeps the last
    /// reached state.
    DonenessRace { done_at: Seconds, burn_at: Seconds },
}

impl ProcessMode {
    /// Nominal processing time, if the mode is timer-driven.
    pub fn processing_time(&self) -> Option<Seconds> {
        match self {
            ProcessMode::Timed { duration } => Some(*duration),
            ProcessMode::DonenessRace { done_at, .. } => Some(*done_at),
            ProcessMode::Strikes { .. } => None,
        }
    }

    pub fn is_timer_driven(&self) -> bool {
        !matches!(self, ProcessMode::Strikes { .. })
    }
}

/// One row of a kind's transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: ProcessState,
    pub process: ProcessType,
    pub to: ProcessState,
    pub mode: ProcessMode,
}

/// Transition table for one ingredient kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindProfile {
    pub transitions: Vec<Transition>,
}

impl KindProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style row insertion.
    pub fn with(
        mut self,
        from: ProcessState,
        process: ProcessType,
        to: ProcessState,
        mode: ProcessMode,
    ) -> Self {
        self.transitions.push(Transition {
            from,
            process,
            to,
            mode,
        });
        self
    }

    pub fn transition(&self, from: ProcessState, process: ProcessType) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.from == from && t.process == process)
    }

    /// Processes legal from `state`.
    pub fn allowed(&self, state: ProcessState) -> ProcessSet {
        self.transitions
            .iter()
            .filter(|t| t.from == state)
            .map(|t| t.process)
            .collect()
    }

    /// Every state reachable from `Raw`, including `Raw` itself and the
    /// burn state a doneness race can end in.
    pub fn reachable(&self) -> Vec<ProcessState> {
        let mut reached = vec![ProcessState::Raw];
        let mut frontier = vec![ProcessState::Raw];
        while let Some(state) = frontier.pop() {
            for t in self.transitions.iter().filter(|t| t.from == state) {
                let mut targets = vec![t.to];
                if matches!(t.mode, ProcessMode::DonenessRace { .. }) {
                    targets.push(ProcessState::Burned);
                }
                for to in targets {
                    if !reached.contains(&to) {
                        reached.push(to);
                        frontier.push(to);
                    }
                }
            }
        }
        reached.sort();
        reached
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable per-kind profiles, frozen at construction.
#[derive(Debug, Clone)]
pub struct Registry {
    profiles: Vec<KindProfile>,
}

impl Registry {
    pub fn profile(&self, kind: IngredientKind) -> &KindProfile {
        &self.profiles[kind.index()]
    }

    /// Registry with the stock kitchen tables.
    pub fn standard() -> Registry {
        Registry {
            profiles: IngredientKind::ALL.iter().map(|k| default_profile(*k)).collect(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

/// The stock transition table for a kind.
pub fn default_profile(kind: IngredientKind) -> KindProfile {
    use ProcessState::*;
    use ProcessType as P;
    match kind {
        IngredientKind::Bread(_) => KindProfile::new(),
        IngredientKind::Lettuce => KindProfile::new()
            .with(Raw, P::Wash, Washed, ProcessMode::Strikes { needed: 3 })
            .with(Washed, P::Cut, Cut, ProcessMode::Strikes { needed: 4 }),
        IngredientKind::Tomato => {
            KindProfile::new().with(Raw, P::Cut, Cut, ProcessMode::Strikes { needed: 3 })
        }
        IngredientKind::Cheese => KindProfile::new().with(
            Raw,
            P::Cut,
            Cut,
            ProcessMode::Timed {
                duration: secs(1.5),
            },
        ),
        IngredientKind::Meat => {
            let race = ProcessMode::DonenessRace {
                done_at: secs(3.0),
                burn_at: secs(6.0),
            };
            KindProfile::new()
                .with(Raw, P::Cut, Cut, ProcessMode::Strikes { needed: 5 })
                .with(Raw, P::Cook, Cooked, race)
                .with(Cut, P::Cook, Cooked, race)
        }
    }
}

/// Builder for a [`Registry`]. Starts empty or from the stock tables;
/// `build` validates every profile.
#[derive(Debug)]
pub struct RegistryBuilder {
    profiles: Vec<Option<KindProfile>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            profiles: vec![None; KIND_COUNT],
        }
    }

    pub fn with_defaults() -> Self {
        Self {
            profiles: IngredientKind::ALL
                .iter()
                .map(|k| Some(default_profile(*k)))
                .collect(),
        }
    }

    /// Register (or replace) the profile for a kind.
    pub fn register(&mut self, kind: IngredientKind, profile: KindProfile) -> &mut Self {
        self.profiles[kind.index()] = Some(profile);
        self
    }

    /// Register one profile for both bun halves.
    pub fn register_bread(&mut self, profile: KindProfile) -> &mut Self {
        self.register(IngredientKind::Bread(Bun::Bottom), profile.clone());
        self.register(IngredientKind::Bread(Bun::Top), profile)
    }

    /// Mutate an already-registered profile.
    pub fn mutate<F>(&mut self, kind: IngredientKind, f: F) -> Result<&mut Self, RegistryError>
    where
        F: FnOnce(&mut KindProfile),
    {
        let profile = self.profiles[kind.index()]
            .as_mut()
            .ok_or(RegistryError::MissingProfile(kind))?;
        f(profile);
        Ok(self)
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut profiles = Vec::with_capacity(KIND_COUNT);
        for (kind, profile) in IngredientKind::ALL.iter().zip(self.profiles) {
            let profile = profile.ok_or(RegistryError::MissingProfile(*kind))?;
            validate_profile(*kind, &profile)?;
            profiles.push(profile);
        }
        Ok(Registry { profiles })
    }
}

fn validate_profile(kind: IngredientKind, profile: &KindProfile) -> Result<(), RegistryError> {
    for (i, t) in profile.transitions.iter().enumerate() {
        if t.to <= t.from {
            return Err(RegistryError::BackwardTransition {
                kind,
                from: t.from,
                to: t.to,
            });
        }
        if matches!(t.process, ProcessType::Table | ProcessType::Assemble) {
            return Err(RegistryError::NotAProcess {
                kind,
                process: t.process,
            });
        }
        if profile.transitions[..i]
            .iter()
            .any(|o| o.from == t.from && o.process == t.process)
        {
            return Err(RegistryError::DuplicateTransition {
                kind,
                from: t.from,
                process: t.process,
            });
        }
        match t.mode {
            ProcessMode::Timed { duration } if duration <= Seconds::ZERO => {
                return Err(RegistryError::NonPositiveDuration {
                    kind,
                    process: t.process,
                });
            }
            ProcessMode::Strikes { needed: 0 } => {
                return Err(RegistryError::ZeroStrikes {
                    kind,
                    process: t.process,
                });
            }
            ProcessMode::DonenessRace { done_at, burn_at } => {
                if done_at <= Seconds::ZERO {
                    return Err(RegistryError::NonPositiveDuration {
                        kind,
                        process: t.process,
                    });
                }
                if burn_at <= done_at {
                    return Err(RegistryError::BurnNotAfterDone { kind });
                }
                if t.to >= ProcessState::Burned {
                    return Err(RegistryError::BackwardTransition {
                        kind,
                        from: t.to,
                        to: ProcessState::Burned,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no profile registered for {0:?}")]
    MissingProfile(IngredientKind),
    #[error("{kind:?}: transition {from:?} -> {to:?} does not move forward")]
    BackwardTransition {
        kind: IngredientKind,
        from: ProcessState,
        to: ProcessState,
    },
    #[error("{kind:?}: {process:?} is not a processing step")]
    NotAProcess {
        kind: IngredientKind,
        process: ProcessType,
    },
    #[error("{kind:?}: duplicate transition for {process:?} from {from:?}")]
    DuplicateTransition {
        kind: IngredientKind,
        from: ProcessState,
        process: ProcessType,
    },
    #[error("{kind:?}: {process:?} needs a positive duration")]
    NonPositiveDuration {
        kind: IngredientKind,
        process: ProcessType,
    },
    #[error("{kind:?}: {process:?} needs at least one strike")]
    ZeroStrikes {
        kind: IngredientKind,
        process: ProcessType,
    },
    #[error("{kind:?}: burn time must be later than doneness time")]
    BurnNotAfterDone { kind: IngredientKind },
}
