use std::fmt;
use std::sync::{Mutex, PoisonError};

use log::debug;
use serde::{Deserialize, Serialize};

/// Lifecycle of a search run.
///
/// `Idle -> Sampling -> Dispatching -> Draining -> Completed | Aborted`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    /// Building the probe grid.
    Sampling,
    /// Workers are pulling and probing points.
    Dispatching,
    /// No new points are handed out; in-flight lookups are finishing.
    Draining,
    Completed,
    Aborted,
}

impl RunState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Sampling => "sampling",
            RunState::Dispatching => "dispatching",
            RunState::Draining => "draining",
            RunState::Completed => "completed",
            RunState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

pub(super) struct StateCell(Mutex<RunState>);

impl StateCell {
    pub(super) fn new() -> Self {
        Self(Mutex::new(RunState::Idle))
    }

    pub(super) fn get(&self) -> RunState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn set(&self, to: RunState) {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != to {
            debug!("run state {} -> {}", *state, to);
            *state = to;
        }
    }

    /// `Dispatching -> Draining`; a no-op from any other state.
    pub(super) fn begin_draining(&self) {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == RunState::Dispatching {
            debug!("run state {} -> {}", *state, RunState::Draining);
            *state = RunState::Draining;
        }
    }
}
