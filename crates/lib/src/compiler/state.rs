//! The per-instance single-flight guard.

use std::sync::Mutex;

use crate::util::sync::lock;
use crate::{CompilerError, Result};

/// Phase of a watching compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
  /// A rebuild is in progress.
  Running,
  /// Waiting for changes.
  Idle,
  /// Changes were reported; a rebuild is about to start.
  Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompilerState {
  #[default]
  Idle,
  Running,
  Watching(WatchPhase),
}

impl CompilerState {
  pub fn is_idle(self) -> bool {
    self == CompilerState::Idle
  }
}

#[derive(Debug, Default)]
pub(crate) struct StateCell(Mutex<CompilerState>);

impl StateCell {
  pub(crate) fn get(&self) -> CompilerState {
    *lock(&self.0)
  }

  /// Move from `Idle` to `next`. Any other current state is left untouched
  /// and reported as a concurrent run.
  pub(crate) fn begin(&self, next: CompilerState) -> Result<StateGuard<'_>> {
    self.enter(next)?;
    Ok(self.adopt())
  }

  /// Like [`begin`](Self::begin) without a guard, for state that is handed
  /// to a task which adopts it.
  pub(crate) fn enter(&self, next: CompilerState) -> Result<()> {
    let mut state = lock(&self.0);
    if !state.is_idle() {
      return Err(CompilerError::Concurrent);
    }
    *state = next;
    Ok(())
  }

  /// Guard that resets a state entered earlier.
  pub(crate) fn adopt(&self) -> StateGuard<'_> {
    StateGuard { cell: self }
  }

  pub(crate) fn set_watch_phase(&self, phase: WatchPhase) {
    let mut state = lock(&self.0);
    if let CompilerState::Watching(_) = *state {
      *state = CompilerState::Watching(phase);
    }
  }
}

/// Returns the compiler to `Idle` when dropped, on success, error or panic.
#[derive(Debug)]
pub(crate) struct StateGuard<'a> {
  cell: &'a StateCell,
}

impl Drop for StateGuard<'_> {
  fn drop(&mut self) {
    *lock(&self.cell.0) = CompilerState::Idle;
  }
}
