//! Ingredient kinds, process states, and process types.
//!
//! Kinds are a closed set. Everything kind-specific (which processes apply in
//! which state, timings, strike counts) lives in the [`Registry`] profile for
//! that kind, so a single state machine in [`crate::process`] drives every
//! ingredient.
//!
//! [`Registry`]: crate::registry::Registry

use crate::fixed::Seconds;
use crate::process::Activity;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// Which half of a bun a bread piece is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bun {
    Bottom,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngredientKind {
    Bread(Bun),
    Lettuce,
    Tomato,
    Cheese,
    Meat,
}

/// Total number of distinct kinds (bun halves count separately).
pub const KIND_COUNT: usize = 6;

impl IngredientKind {
    pub const ALL: [IngredientKind; KIND_COUNT] = [
        IngredientKind::Bread(Bun::Bottom),
        IngredientKind::Bread(Bun::Top),
        IngredientKind::Lettuce,
        IngredientKind::Tomato,
        IngredientKind::Cheese,
        IngredientKind::Meat,
    ];

    /// Dense index for per-kind tables.
    pub fn index(self) -> usize {
        match self {
            IngredientKind::Bread(Bun::Bottom) => 0,
            IngredientKind::Bread(Bun::Top) => 1,
            IngredientKind::Lettuce => 2,
            IngredientKind::Tomato => 3,
            IngredientKind::Cheese => 4,
            IngredientKind::Meat => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IngredientKind::Bread(Bun::Bottom) => "bottom_bun",
            IngredientKind::Bread(Bun::Top) => "top_bun",
            IngredientKind::Lettuce => "lettuce",
            IngredientKind::Tomato => "tomato",
            IngredientKind::Cheese => "cheese",
            IngredientKind::Meat => "meat",
        }
    }

    pub fn from_name(name: &str) -> Option<IngredientKind> {
        IngredientKind::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn is_bun(self) -> bool {
        matches!(self, IngredientKind::Bread(_))
    }

    /// The state a filling must have reached before it can go in a burger.
    /// Buns are always ready.
    pub fn burger_ready_state(self) -> Option<ProcessState> {
        match self {
            IngredientKind::Bread(_) => None,
            IngredientKind::Lettuce | IngredientKind::Tomato | IngredientKind::Cheese => {
                Some(ProcessState::Cut)
            }
            IngredientKind::Meat => Some(ProcessState::Cooked),
        }
    }
}

// ---------------------------------------------------------------------------
// States and process types
// ---------------------------------------------------------------------------

/// Processing state. The declaration order is the only direction states
/// may move in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ProcessState {
    #[default]
    Raw,
    Washed,
    Cut,
    Cooked,
    Burned,
}

impl ProcessState {
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// States a plate will take and a delivery zone will score.
    pub fn is_finished(self) -> bool {
        matches!(self, ProcessState::Cut | ProcessState::Cooked)
    }
}

/// The category of action a workstation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    Wash,
    Cut,
    Cook,
    Assemble,
    /// A plain table: a parking surface that never processes anything.
    Table,
}

impl ProcessType {
    pub const ALL: [ProcessType; 5] = [
        ProcessType::Wash,
        ProcessType::Cut,
        ProcessType::Cook,
        ProcessType::Assemble,
        ProcessType::Table,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn from_name(name: &str) -> Option<ProcessType> {
        match name {
            "wash" => Some(ProcessType::Wash),
            "cut" => Some(ProcessType::Cut),
            "cook" => Some(ProcessType::Cook),
            "assemble" => Some(ProcessType::Assemble),
            "table" | "none" => Some(ProcessType::Table),
            _ => None,
        }
    }
}

/// A small set of process types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessSet(u8);

impl ProcessSet {
    pub const EMPTY: ProcessSet = ProcessSet(0);

    pub fn insert(&mut self, p: ProcessType) {
        self.0 |= p.bit();
    }

    pub fn with(mut self, p: ProcessType) -> Self {
        self.insert(p);
        self
    }

    pub fn contains(&self, p: ProcessType) -> bool {
        self.0 & p.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = ProcessType> + '_ {
        ProcessType::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

impl FromIterator<ProcessType> for ProcessSet {
    fn from_iter<I: IntoIterator<Item = ProcessType>>(iter: I) -> Self {
        let mut set = ProcessSet::EMPTY;
        for p in iter {
            set.insert(p);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Ingredient
// ---------------------------------------------------------------------------

/// Per-ingredient processing state. Mutated only by the state machine in
/// [`crate::process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub kind: IngredientKind,
    pub(crate) state: ProcessState,
    /// Cached from the kind profile for `state`.
    pub(crate) allowed: ProcessSet,
    pub(crate) activity: Activity,
    /// Accepted strikes toward the current strike-driven process.
    pub(crate) strikes: u32,
}

impl Ingredient {
    pub fn kind(&self) -> IngredientKind {
        self.kind
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn allowed_processes(&self) -> ProcessSet {
        self.allowed
    }

    pub fn is_processing(&self) -> bool {
        !matches!(self.activity, Activity::Idle)
    }

    /// Elapsed seconds of the active timed operation, zero when idle.
    pub fn current_timer(&self) -> Seconds {
        match self.activity {
            Activity::Idle => Seconds::ZERO,
            Activity::Timed { elapsed, .. } | Activity::Race { elapsed, .. } => elapsed,
        }
    }

    pub fn current_strikes(&self) -> u32 {
        self.strikes
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// True if this ingredient may sit in a burger stack.
    pub fn is_burger_ready(&self) -> bool {
        match self.kind.burger_ready_state() {
            None => true,
            Some(required) => self.state == required,
        }
    }
}
