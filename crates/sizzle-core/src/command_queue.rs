//! Inbound commands, queued and executed at tick boundaries.
//!
//! Input events from the platform layer and task messages from the remote
//! layer are queued here and resolved during the input phase of the next
//! step, in submission order. Replicas fed the same command stream reach the
//! same decisions.

use crate::assignment::TaskRequest;
use crate::fixed::Ticks;
use crate::geometry::Position;
use crate::id::{ActorId, InputId};

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A finger or pointer went down.
    InputBegin { input: InputId, position: Position },
    /// A finger or pointer moved.
    InputMove { input: InputId, position: Position },
    /// A finger or pointer was lifted.
    InputEnd { input: InputId, position: Position },
    /// Bind an actor to a workstation for a task.
    AssignTask(TaskRequest),
    /// Release whatever the actor is bound to.
    UnassignTask { actor: ActorId },
}

impl Command {
    /// The input this command concerns, if it is an input event.
    pub fn input(&self) -> Option<InputId> {
        match self {
            Command::InputBegin { input, .. }
            | Command::InputMove { input, .. }
            | Command::InputEnd { input, .. } => Some(*input),
            Command::AssignTask(_) | Command::UnassignTask { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Commands waiting for the next tick boundary, with optional history for
/// replay and debugging.
#[derive(Debug)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// Executed commands: (tick, command).
    history: Vec<(Ticks, Command)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::with_max_history(0)
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
            max_history,
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Drain all pending commands in submission order, recording them in
    /// history under `tick`.
    pub fn drain(&mut self, tick: Ticks) -> Vec<Command> {
        let commands: Vec<Command> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            for cmd in &commands {
                self.history.push((tick, cmd.clone()));
            }
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(Ticks, Command)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
