//! Timer bookkeeping for the pure state machines.
//!
//! A state object owns exactly one [`TimerSlot`]. Arming the slot always
//! cancels whatever it held before, and a fired timer is only honoured when
//! its id matches the armed handle. The machines never schedule anything
//! themselves; they queue [`TimerCommand`]s that the app turns into
//! `Timer` capability requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerOwner {
    Ticker,
    Lifecycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId {
    pub owner: TimerOwner,
    pub generation: u64,
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.owner, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    Start { id: TimerId, delay: Duration },
    Cancel { id: TimerId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSlot {
    owner: TimerOwner,
    generation: u64,
    pending: Option<TimerId>,
}

impl TimerSlot {
    #[must_use]
    pub const fn new(owner: TimerOwner) -> Self {
        Self {
            owner,
            generation: 0,
            pending: None,
        }
    }

    #[must_use]
    pub fn pending(&self) -> Option<TimerId> {
        self.pending
    }

    /// Cancels the current handle (if any) and arms a fresh one.
    pub fn arm(&mut self, delay: Duration, commands: &mut Vec<TimerCommand>) -> TimerId {
        self.cancel(commands);
        self.generation += 1;
        let id = TimerId {
            owner: self.owner,
            generation: self.generation,
        };
        self.pending = Some(id);
        commands.push(TimerCommand::Start { id, delay });
        id
    }

    pub fn cancel(&mut self, commands: &mut Vec<TimerCommand>) {
        if let Some(id) = self.pending.take() {
            commands.push(TimerCommand::Cancel { id });
        }
    }

    /// Consumes the handle when `id` is the one currently armed.
    /// Returns `false` for stale or foreign ids, which callers must ignore.
    pub fn fire(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}
