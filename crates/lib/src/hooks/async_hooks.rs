use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::trace;

use super::{Discipline, HookFuture, TapHandle, Taps};
use crate::{CompilerError, Result};

type AsyncFn<A> = dyn Fn(A) -> HookFuture + Send + Sync;

fn ready<A: 'static, F>(callback: F) -> Arc<AsyncFn<A>>
where
  F: Fn(&A) -> Result<()> + Send + Sync + 'static,
{
  Arc::new(move |args: A| -> HookFuture {
    let result = callback(&args);
    Box::pin(async move { result })
  })
}

fn boxed<A: 'static, F, Fut>(callback: F) -> Arc<AsyncFn<A>>
where
  F: Fn(A) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<()>> + Send + 'static,
{
  Arc::new(move |args: A| -> HookFuture { Box::pin(callback(args)) })
}

/// Awaits taps one after another, in registration order.
///
/// Every tap receives its own clone of the arguments. The first error ends
/// the call; later taps never start.
pub struct AsyncSeriesHook<A> {
  name: &'static str,
  taps: Taps<AsyncFn<A>>,
}

impl<A: Clone + Send + 'static> AsyncSeriesHook<A> {
  pub fn new(name: &'static str) -> Self {
    Self {
      name,
      taps: Taps::new(),
    }
  }

  /// Register a synchronous tap; it completes as soon as it returns.
  pub fn tap<F>(&self, plugin: impl Into<String>, callback: F) -> TapHandle
  where
    F: Fn(&A) -> Result<()> + Send + Sync + 'static,
  {
    self.taps.push(plugin, ready(callback))
  }

  pub fn tap_async<F, Fut>(&self, plugin: impl Into<String>, callback: F) -> TapHandle
  where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
  {
    self.taps.push(plugin, boxed(callback))
  }

  pub async fn call(&self, args: A) -> Result<()> {
    for (plugin, callback) in self.taps.snapshot() {
      trace!(hook = self.name, plugin = %plugin, "calling tap");
      callback(args.clone()).await?;
    }
    Ok(())
  }

  hook_common!(Discipline::AsyncSeries);
}

hook_info!(AsyncSeriesHook<A>, Discipline::AsyncSeries);

/// Starts every tap at once on a [`JoinSet`] and waits for all of them.
///
/// The first failure is returned immediately; taps still in flight are
/// aborted when the set is dropped. Taps that touch shared state must leave
/// it consistent at every await point.
pub struct AsyncParallelHook<A> {
  name: &'static str,
  taps: Taps<AsyncFn<A>>,
}

impl<A: Clone + Send + 'static> AsyncParallelHook<A> {
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
    self.taps.push(plugin, ready(callback))
  }

  pub fn tap_async<F, Fut>(&self, plugin: impl Into<String>, callback: F) -> TapHandle
  where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
  {
    self.taps.push(plugin, boxed(callback))
  }

  pub async fn call(&self, args: A) -> Result<()> {
    let taps = self.taps.snapshot();
    if taps.is_empty() {
      return Ok(());
    }

    let mut set = JoinSet::new();
    for (plugin, callback) in taps {
      trace!(hook = self.name, plugin = %plugin, "starting tap");
      set.spawn(callback(args.clone()));
    }

    while let Some(joined) = set.join_next().await {
      match joined {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
          trace!(hook = self.name, error = %err, "tap failed, aborting the rest");
          return Err(err);
        }
        Err(join_err) => return Err(CompilerError::Task(join_err.to_string())),
      }
    }
    Ok(())
  }

  hook_common!(Discipline::AsyncParallel);
}

hook_info!(AsyncParallelHook<A>, Discipline::AsyncParallel);
