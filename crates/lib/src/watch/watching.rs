use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{FileWatcher, PollingWatcher, WatchChanges, WatchRequest};
use crate::compilation::Stats;
use crate::compiler::{Compiler, CompilerState, Invalidation, WatchOptions, WatchPhase};
use crate::util::now_millis;
use crate::util::sync::lock;
use crate::{CompilerError, Result};

/// Receives the result of every watch build.
pub type WatchHandler = Arc<dyn Fn(Result<Stats>) + Send + Sync>;

/// Controller of a running watch loop.
///
/// Dropping it stops the loop after the current build, like [`close`]
/// without waiting.
///
/// [`close`]: Watching::close
pub struct Watching {
  invalidate: Arc<Notify>,
  close: watch::Sender<bool>,
  task: Mutex<Option<JoinHandle<()>>>,
}

impl Compiler {
  /// Build now and again whenever a watched file changes.
  ///
  /// Every result, success or failure, goes to `handler`; failures also go
  /// through the `failed` hook and watching continues. While another `run`
  /// or `watch` is active the handler receives [`CompilerError::Concurrent`]
  /// and `None` is returned.
  ///
  /// Uses the configured watch filesystem, or polls the input filesystem
  /// when there is none. Must be called within a tokio runtime.
  pub fn watch<F>(self: &Arc<Self>, options: WatchOptions, handler: F) -> Option<Watching>
  where
    F: Fn(Result<Stats>) + Send + Sync + 'static,
  {
    let handler: WatchHandler = Arc::new(handler);
    if let Err(err) = self.state.enter(CompilerState::Watching(WatchPhase::Idle)) {
      warn!(compiler = %self.label(), "watch rejected, compiler busy");
      handler(Err(err));
      return None;
    }

    let watcher = match self.watcher() {
      Ok(watcher) => watcher,
      Err(err) => {
        drop(self.state.adopt());
        handler(Err(err));
        return None;
      }
    };

    if !self.is_child() {
      self.timestamps().replace(Default::default(), Default::default());
    }

    let invalidate = Arc::new(Notify::new());
    let (close, closed) = watch::channel(false);
    let task = tokio::spawn(watch_loop(
      Arc::clone(self),
      options,
      handler,
      watcher,
      Arc::clone(&invalidate),
      closed,
    ));
    info!(compiler = %self.label(), "watching");
    Some(Watching {
      invalidate,
      close,
      task: Mutex::new(Some(task)),
    })
  }

  fn watcher(&self) -> Result<Arc<dyn FileWatcher>> {
    match self.watch_file_system() {
      Ok(watcher) => Ok(watcher),
      Err(_) => {
        let fs = self.input_file_system()?;
        Ok(Arc::new(PollingWatcher::new(fs)))
      }
    }
  }
}

impl Watching {
  /// Rebuild without waiting for a change. An invalidation during a build
  /// starts another build right after it.
  pub fn invalidate(&self) {
    self.invalidate.notify_one();
  }

  /// Stop watching. Waits for a build in progress, runs `watch_close` and
  /// returns the compiler to idle.
  pub async fn close(self) -> Result<()> {
    let _ = self.close.send(true);
    let task = lock(&self.task).take();
    if let Some(task) = task {
      task.await.map_err(|err| CompilerError::Task(err.to_string()))?;
    }
    Ok(())
  }
}

impl Drop for Watching {
  fn drop(&mut self) {
    let _ = self.close.send(true);
  }
}

async fn watch_loop(
  compiler: Arc<Compiler>,
  options: WatchOptions,
  handler: WatchHandler,
  watcher: Arc<dyn FileWatcher>,
  invalidate: Arc<Notify>,
  mut closed: watch::Receiver<bool>,
) {
  let _guard = compiler.state.adopt();
  let mut request = WatchRequest::default();
  let mut first = true;

  loop {
    compiler.state.set_watch_phase(WatchPhase::Running);
    let start_time = now_millis();
    let result = build(&compiler, start_time, first).await;
    first = false;

    match &result {
      Ok(stats) => {
        let compilation = &stats.compilation;
        request = WatchRequest {
          files: compilation.file_dependencies(),
          contexts: compilation.context_dependencies(),
          start_time,
        };
        info!(
          compiler = %compiler.label(),
          hash = stats.hash().as_deref().unwrap_or(""),
          watched = request.files.len() + request.contexts.len(),
          "watch build finished"
        );
      }
      Err(err) => {
        error!(compiler = %compiler.label(), error = %err, "watch build failed");
        compiler.report_failure(err);
        request.start_time = start_time;
      }
    }
    handler(result);
    compiler.state.set_watch_phase(WatchPhase::Idle);

    let waited = wait_for_change(&compiler, &options, &handler, &*watcher, &invalidate, &mut closed, &request);
    let Some(invalidation) = waited.await else {
      break;
    };

    compiler.state.set_watch_phase(WatchPhase::Invalid);
    debug!(file = ?invalidation.file, "invalidated");
    if let Err(err) = compiler.hooks.invalid.call(&invalidation) {
      warn!(error = %err, "invalid hook errored");
    }
  }

  if let Err(err) = compiler.hooks.watch_close.call(&()) {
    warn!(error = %err, "watch_close hook errored");
  }
  info!(compiler = %compiler.label(), "watch closed");
}

async fn build(compiler: &Arc<Compiler>, start_time: u64, first: bool) -> Result<Stats> {
  if first {
    compiler.read_records().await?;
  }
  compiler.hooks.watch_run.call(Arc::clone(compiler)).await?;
  compiler.compile_and_emit(start_time).await
}

/// Wait for the next change, invalidation or close. `None` means closed.
async fn wait_for_change(
  compiler: &Compiler,
  options: &WatchOptions,
  handler: &WatchHandler,
  watcher: &dyn FileWatcher,
  invalidate: &Notify,
  closed: &mut watch::Receiver<bool>,
  request: &WatchRequest,
) -> Option<Invalidation> {
  loop {
    if *closed.borrow() {
      return None;
    }
    tokio::select! {
      biased;
      _ = closed.changed() => return None,
      _ = invalidate.notified() => {
        return Some(Invalidation {
          file: None,
          changed_at: now_millis(),
        });
      }
      changes = watcher.wait(request, options) => match changes {
        Ok(changes) => return Some(apply_changes(compiler, changes)),
        Err(err) => {
          warn!(error = %err, "watcher failed");
          handler(Err(err));
          tokio::time::sleep(Duration::from_millis(options.poll_interval_ms)).await;
        }
      },
    }
  }
}

fn apply_changes(compiler: &Compiler, changes: WatchChanges) -> Invalidation {
  let file = changes.first_path().cloned();
  let changed_at = file
    .as_ref()
    .and_then(|path| changes.file_timestamps.get(path).copied())
    .unwrap_or_else(now_millis);

  let timestamps = compiler.timestamps();
  let mut files = timestamps.files();
  let mut contexts = timestamps.contexts();
  for path in &changes.removed {
    files.remove(path);
    contexts.remove(path);
  }
  files.extend(changes.file_timestamps);
  contexts.extend(changes.context_timestamps);
  timestamps.replace(files, contexts);
  compiler.purge_input_file_system();

  Invalidation { file, changed_at }
}
