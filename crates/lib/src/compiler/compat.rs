//! Registration by event name.
//!
//! Older plugins register handlers with a kebab-case event name and an
//! untyped payload. [`Compiler::plugin`] maps the name onto the typed slot
//! and wraps the handler so it fits that slot's discipline. On the events in
//! [`FORCED_ASYNC_EVENTS`] a synchronous handler is deferred into the tap's
//! future: it runs when the hook awaits it (inside the spawned task for a
//! parallel slot), not when the hook starts the tap.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{CompilationEvent, Compiler, EntryOption, Invalidation};
use crate::compilation::{Compilation, CompilationParams, ContextModuleFactory, NormalModuleFactory, Stats};
use crate::consts::FORCED_ASYNC_EVENTS;
use crate::hooks::{
  AsyncParallelHook, AsyncSeriesHook, Discipline, HookFuture, HookInfo, SyncBailHook, SyncHook, TapHandle,
};
use crate::{CompilerError, Result};

/// Payload handed to a legacy handler.
#[derive(Clone)]
pub enum LegacyArgs {
  None,
  Compiler(Arc<Compiler>),
  Compilation(Arc<Compilation>),
  CompilationWithParams(CompilationEvent),
  Params(CompilationParams),
  NormalModuleFactory(Arc<NormalModuleFactory>),
  ContextModuleFactory(Arc<ContextModuleFactory>),
  Stats(Stats),
  /// Rendered error of the `failed` event.
  Error(String),
  Invalid(Invalidation),
  Entry(EntryOption),
}

impl fmt::Debug for LegacyArgs {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = match self {
      LegacyArgs::None => "None",
      LegacyArgs::Compiler(_) => "Compiler",
      LegacyArgs::Compilation(_) => "Compilation",
      LegacyArgs::CompilationWithParams(_) => "CompilationWithParams",
      LegacyArgs::Params(_) => "Params",
      LegacyArgs::NormalModuleFactory(_) => "NormalModuleFactory",
      LegacyArgs::ContextModuleFactory(_) => "ContextModuleFactory",
      LegacyArgs::Stats(_) => "Stats",
      LegacyArgs::Error(_) => "Error",
      LegacyArgs::Invalid(_) => "Invalid",
      LegacyArgs::Entry(_) => "Entry",
    };
    f.write_str(kind)
  }
}

type SyncHandler = dyn Fn(LegacyArgs) -> Result<()> + Send + Sync;
type AsyncHandler = dyn Fn(LegacyArgs) -> HookFuture + Send + Sync;
type BailHandler = dyn Fn(LegacyArgs) -> Result<Option<bool>> + Send + Sync;

/// A handler registered by event name.
#[derive(Clone)]
pub enum LegacyHandler {
  Sync(Arc<SyncHandler>),
  Async(Arc<AsyncHandler>),
  /// Answers a veto event; `None` means no opinion. On any other event the
  /// answer is ignored.
  Bail(Arc<BailHandler>),
}

impl LegacyHandler {
  pub fn sync<F>(f: F) -> Self
  where
    F: Fn(LegacyArgs) -> Result<()> + Send + Sync + 'static,
  {
    LegacyHandler::Sync(Arc::new(f))
  }

  pub fn async_fn<F, Fut>(f: F) -> Self
  where
    F: Fn(LegacyArgs) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
  {
    LegacyHandler::Async(Arc::new(move |args| -> HookFuture { Box::pin(f(args)) }))
  }

  pub fn bail<F>(f: F) -> Self
  where
    F: Fn(LegacyArgs) -> Result<Option<bool>> + Send + Sync + 'static,
  {
    LegacyHandler::Bail(Arc::new(f))
  }

  fn kind(&self) -> &'static str {
    match self {
      LegacyHandler::Sync(_) => "sync",
      LegacyHandler::Async(_) => "async",
      LegacyHandler::Bail(_) => "bail",
    }
  }
}

impl fmt::Debug for LegacyHandler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "LegacyHandler::{}", self.kind())
  }
}

impl Compiler {
  /// Register `handler` on the event called `event` (`"after-emit"` or
  /// `"after_emit"`).
  ///
  /// Fails with [`CompilerError::UnknownHook`] for names without a slot and
  /// [`CompilerError::IncompatibleTap`] for an asynchronous handler on a
  /// synchronous slot.
  pub fn plugin(&self, event: &str, plugin: &str, handler: LegacyHandler) -> Result<TapHandle> {
    let slot = event.replace('-', "_");
    let defer = is_forced_async(event);
    debug!(event, plugin, handler = handler.kind(), defer, "legacy registration");
    let hooks = &self.hooks;
    match slot.as_str() {
      "should_emit" => bail(&hooks.should_emit, event, plugin, handler, |c| {
        LegacyArgs::Compilation(Arc::clone(c))
      }),
      "entry_option" => bail(&hooks.entry_option, event, plugin, handler, |e| LegacyArgs::Entry(e.clone())),
      "done" => series(&hooks.done, plugin, handler, defer, LegacyArgs::Stats),
      "additional_pass" => series(&hooks.additional_pass, plugin, handler, defer, |_| LegacyArgs::None),
      "before_run" => series(&hooks.before_run, plugin, handler, defer, LegacyArgs::Compiler),
      "run" => series(&hooks.run, plugin, handler, defer, LegacyArgs::Compiler),
      "watch_run" => series(&hooks.watch_run, plugin, handler, defer, LegacyArgs::Compiler),
      "emit" => series(&hooks.emit, plugin, handler, defer, LegacyArgs::Compilation),
      "after_emit" => series(&hooks.after_emit, plugin, handler, defer, LegacyArgs::Compilation),
      "after_compile" => series(&hooks.after_compile, plugin, handler, defer, LegacyArgs::Compilation),
      "before_compile" => series(&hooks.before_compile, plugin, handler, defer, LegacyArgs::Params),
      "make" => parallel(&hooks.make, plugin, handler, defer, LegacyArgs::Compilation),
      "this_compilation" => sync(&hooks.this_compilation, event, plugin, handler, |e| {
        LegacyArgs::CompilationWithParams(e.clone())
      }),
      "compilation" => sync(&hooks.compilation, event, plugin, handler, |e| {
        LegacyArgs::CompilationWithParams(e.clone())
      }),
      "normal_module_factory" => sync(&hooks.normal_module_factory, event, plugin, handler, |f| {
        LegacyArgs::NormalModuleFactory(Arc::clone(f))
      }),
      "context_module_factory" => sync(&hooks.context_module_factory, event, plugin, handler, |f| {
        LegacyArgs::ContextModuleFactory(Arc::clone(f))
      }),
      "compile" => sync(&hooks.compile, event, plugin, handler, |p| LegacyArgs::Params(p.clone())),
      "failed" => sync(&hooks.failed, event, plugin, handler, |e| LegacyArgs::Error(e.to_string())),
      "invalid" => sync(&hooks.invalid, event, plugin, handler, |i| LegacyArgs::Invalid(i.clone())),
      "watch_close" => sync(&hooks.watch_close, event, plugin, handler, |_| LegacyArgs::None),
      "environment" => sync(&hooks.environment, event, plugin, handler, |_| LegacyArgs::None),
      "after_environment" => sync(&hooks.after_environment, event, plugin, handler, |_| LegacyArgs::None),
      "after_plugins" => sync(&hooks.after_plugins, event, plugin, handler, |_| LegacyArgs::None),
      "after_resolvers" => sync(&hooks.after_resolvers, event, plugin, handler, |_| LegacyArgs::None),
      _ => Err(CompilerError::UnknownHook(event.to_string())),
    }
  }

  /// Discipline a registration on `event` dispatches with, or `None` for an
  /// unknown event.
  pub fn legacy_discipline(&self, event: &str) -> Option<Discipline> {
    Some(self.hooks.get(&event.replace('-', "_"))?.discipline())
  }
}

fn is_forced_async(event: &str) -> bool {
  FORCED_ASYNC_EVENTS.contains(&event.replace('_', "-").as_str())
}

/// Run a synchronous handler inside the returned future.
fn deferred<A: Send + 'static>(
  f: Arc<SyncHandler>,
  wrap: fn(A) -> LegacyArgs,
) -> impl Fn(A) -> HookFuture + Send + Sync + 'static {
  move |args: A| -> HookFuture {
    let f = Arc::clone(&f);
    Box::pin(async move { f(wrap(args)) })
  }
}

/// A bail handler outside a veto slot is a plain handler whose answer is
/// dropped.
fn answer_ignored(f: Arc<BailHandler>) -> Arc<SyncHandler> {
  Arc::new(move |args| f(args).map(drop))
}

fn series<A: Clone + Send + 'static>(
  hook: &AsyncSeriesHook<A>,
  plugin: &str,
  handler: LegacyHandler,
  defer: bool,
  wrap: fn(A) -> LegacyArgs,
) -> Result<TapHandle> {
  let f = match handler {
    LegacyHandler::Async(f) => return Ok(hook.tap_async(plugin, move |args: A| f(wrap(args)))),
    LegacyHandler::Sync(f) => f,
    LegacyHandler::Bail(f) => answer_ignored(f),
  };
  if defer {
    return Ok(hook.tap_async(plugin, deferred(f, wrap)));
  }
  Ok(hook.tap(plugin, move |args: &A| f(wrap(args.clone()))))
}

fn parallel<A: Clone + Send + 'static>(
  hook: &AsyncParallelHook<A>,
  plugin: &str,
  handler: LegacyHandler,
  defer: bool,
  wrap: fn(A) -> LegacyArgs,
) -> Result<TapHandle> {
  let f = match handler {
    LegacyHandler::Async(f) => return Ok(hook.tap_async(plugin, move |args: A| f(wrap(args)))),
    LegacyHandler::Sync(f) => f,
    LegacyHandler::Bail(f) => answer_ignored(f),
  };
  if defer {
    return Ok(hook.tap_async(plugin, deferred(f, wrap)));
  }
  Ok(hook.tap(plugin, move |args: &A| f(wrap(args.clone()))))
}

fn sync<A: 'static>(
  hook: &SyncHook<A>,
  event: &str,
  plugin: &str,
  handler: LegacyHandler,
  wrap: fn(&A) -> LegacyArgs,
) -> Result<TapHandle> {
  match handler {
    LegacyHandler::Sync(f) => Ok(hook.tap(plugin, move |args: &A| f(wrap(args)))),
    LegacyHandler::Bail(f) => Ok(hook.tap(plugin, move |args: &A| f(wrap(args)).map(drop))),
    LegacyHandler::Async(_) => Err(CompilerError::IncompatibleTap { hook: event.to_string() }),
  }
}

fn bail<A: 'static>(
  hook: &SyncBailHook<A, bool>,
  event: &str,
  plugin: &str,
  handler: LegacyHandler,
  wrap: fn(&A) -> LegacyArgs,
) -> Result<TapHandle> {
  match handler {
    LegacyHandler::Bail(f) => Ok(hook.tap(plugin, move |args: &A| f(wrap(args)))),
    LegacyHandler::Sync(f) => Ok(hook.tap(plugin, move |args: &A| f(wrap(args)).map(|()| None))),
    LegacyHandler::Async(_) => Err(CompilerError::IncompatibleTap { hook: event.to_string() }),
  }
}
