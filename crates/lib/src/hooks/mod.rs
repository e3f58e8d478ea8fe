//! Typed event slots.
//!
//! Every hook has a name and a dispatch discipline fixed by its type:
//! - [`SyncHook`]: calls every tap in registration order
//! - [`SyncBailHook`]: stops at the first tap with an opinion
//! - [`AsyncSeriesHook`]: awaits taps one after another
//! - [`AsyncParallelHook`]: runs all taps at once and joins them
//!
//! A failing tap stops dispatch the same way a failing phase does. Taps are
//! registered through `&self` and return a [`TapHandle`] for `untap`.
//! Dispatch works on a snapshot of the taps, so a tap may register or remove
//! taps on the hook that is calling it.

#[macro_use]
mod macros;
mod async_hooks;
mod sync_hooks;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::Result;
use crate::util::sync::{read, write};

pub use async_hooks::{AsyncParallelHook, AsyncSeriesHook};
pub use sync_hooks::{SyncBailHook, SyncHook};

/// Future returned by asynchronous taps.
pub type HookFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

static NEXT_TAP: AtomicU64 = AtomicU64::new(1);

/// Identifies one registration on one hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TapHandle(u64);

impl TapHandle {
  fn next() -> Self {
    TapHandle(NEXT_TAP.fetch_add(1, Ordering::Relaxed))
  }
}

/// How a hook dispatches to its taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
  Sync,
  SyncBail,
  AsyncSeries,
  AsyncParallel,
}

impl Discipline {
  pub fn is_async(self) -> bool {
    matches!(self, Discipline::AsyncSeries | Discipline::AsyncParallel)
  }
}

impl fmt::Display for Discipline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Discipline::Sync => "sync",
      Discipline::SyncBail => "sync-bail",
      Discipline::AsyncSeries => "async-series",
      Discipline::AsyncParallel => "async-parallel",
    })
  }
}

/// Introspection shared by every hook type.
pub trait HookInfo {
  fn name(&self) -> &'static str;
  fn discipline(&self) -> Discipline;
  /// Plugin names of the registered taps, in call order.
  fn tap_names(&self) -> Vec<String>;

  fn is_used(&self) -> bool {
    !self.tap_names().is_empty()
  }
}

struct Tap<F: ?Sized> {
  handle: TapHandle,
  name: String,
  callback: Arc<F>,
}

impl<F: ?Sized> Clone for Tap<F> {
  fn clone(&self) -> Self {
    Self {
      handle: self.handle,
      name: self.name.clone(),
      callback: Arc::clone(&self.callback),
    }
  }
}

/// The ordered registrations of one hook.
struct Taps<F: ?Sized> {
  taps: RwLock<Vec<Tap<F>>>,
}

impl<F: ?Sized> Taps<F> {
  fn new() -> Self {
    Self {
      taps: RwLock::new(Vec::new()),
    }
  }

  fn push(&self, name: impl Into<String>, callback: Arc<F>) -> TapHandle {
    let handle = TapHandle::next();
    write(&self.taps).push(Tap {
      handle,
      name: name.into(),
      callback,
    });
    handle
  }

  fn remove(&self, handle: TapHandle) -> bool {
    let mut taps = write(&self.taps);
    let before = taps.len();
    taps.retain(|t| t.handle != handle);
    taps.len() != before
  }

  fn snapshot(&self) -> Vec<(String, Arc<F>)> {
    read(&self.taps)
      .iter()
      .map(|t| (t.name.clone(), Arc::clone(&t.callback)))
      .collect()
  }

  fn names(&self) -> Vec<String> {
    read(&self.taps).iter().map(|t| t.name.clone()).collect()
  }

  /// Replace these taps with a copy of `other`'s.
  fn copy_from(&self, other: &Taps<F>) {
    let copied: Vec<Tap<F>> = read(&other.taps).clone();
    *write(&self.taps) = copied;
  }

  fn clear(&self) {
    write(&self.taps).clear();
  }
}
