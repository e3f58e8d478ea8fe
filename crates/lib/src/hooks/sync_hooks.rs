use std::sync::Arc;

use tracing::trace;

use super::{Discipline, TapHandle, Taps};
use crate::Result;

type SyncFn<A> = dyn Fn(&A) -> Result<()> + Send + Sync;
type BailFn<A, R> = dyn Fn(&A) -> Result<Option<R>> + Send + Sync;

/// Calls every tap in registration order. The first error stops the call.
pub struct SyncHook<A> {
  name: &'static str,
  taps: Taps<SyncFn<A>>,
}

impl<A> SyncHook<A> {
  pub fn new(name: &'static str) -> Self {
    Self {
      name,
      taps: Taps::new(),
    }
  }

  pub fn tap<F>(&self, plugin: impl Into<String>, callback: F) -> TapHandle
  where
    F: Fn(&A) -> Result<()> + Send + Sync + 'static,
  {
    self.taps.push(plugin, Arc::new(callback))
  }

  pub fn call(&self, args: &A) -> Result<()> {
    for (plugin, callback) in self.taps.snapshot() {
      trace!(hook = self.name, plugin = %plugin, "calling tap");
      callback(args)?;
    }
    Ok(())
  }

  hook_common!(Discipline::Sync);
}

hook_info!(SyncHook<A>, Discipline::Sync);

/// Calls taps in order until one returns `Some`.
///
/// A tap returning `None` has no opinion. The first `Some` is the result of
/// the call and the remaining taps are skipped.
pub struct SyncBailHook<A, R> {
  name: &'static str,
  taps: Taps<BailFn<A, R>>,
}

impl<A, R> SyncBailHook<A, R> {
  pub fn new(name: &'static str) -> Self {
    Self {
      name,
      taps: Taps::new(),
    }
  }

  pub fn tap<F>(&self, plugin: impl Into<String>, callback: F) -> TapHandle
  where
    F: Fn(&A) -> Result<Option<R>> + Send + Sync + 'static,
  {
    self.taps.push(plugin, Arc::new(callback))
  }

  pub fn call(&self, args: &A) -> Result<Option<R>> {
    for (plugin, callback) in self.taps.snapshot() {
      trace!(hook = self.name, plugin = %plugin, "calling tap");
      if let Some(result) = callback(args)? {
        trace!(hook = self.name, plugin = %plugin, "tap bailed");
        return Ok(Some(result));
      }
    }
    Ok(None)
  }

  hook_common!(Discipline::SyncBail);
}

hook_info!(SyncBailHook<A, R>, Discipline::SyncBail);
