use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use wrapkit_lib::watch::{FileWatcher, WatchChanges, WatchFuture, WatchRequest};
use wrapkit_lib::{BuildError, Compiler, CompilerError, Result, Stats, WatchOptions};

use super::common::memory_compiler;

const ENTRY: &str = "/project/src/index.js";

fn fast() -> WatchOptions {
  WatchOptions {
    aggregate_timeout_ms: 10,
    poll_interval_ms: 5,
    ignored: Vec::new(),
  }
}

fn results() -> (
  impl Fn(Result<Stats>) + Send + Sync + 'static,
  mpsc::UnboundedReceiver<Result<Stats>>,
) {
  let (tx, rx) = mpsc::unbounded_channel();
  (
    move |result: Result<Stats>| {
      let _ = tx.send(result);
    },
    rx,
  )
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Result<Stats>>) -> Result<Stats> {
  tokio::time::timeout(Duration::from_secs(5), rx.recv())
    .await
    .expect("watch build within timeout")
    .expect("watch loop still running")
}

fn depend_on_entry(compiler: &Compiler) {
  compiler.hooks.compilation.tap("entry-deps", |event| {
    event.compilation.add_file_dependency(ENTRY);
    Ok(())
  });
}

fn record_invalidations(compiler: &Compiler) -> Arc<Mutex<Vec<Option<PathBuf>>>> {
  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = Arc::clone(&seen);
  compiler.hooks.invalid.tap("record", move |invalidation| {
    sink.lock().unwrap().push(invalidation.file.clone());
    Ok(())
  });
  seen
}

#[tokio::test]
async fn file_change_triggers_a_rebuild() {
  let (compiler, fs) = memory_compiler(|_| {});
  fs.put(ENTRY, "export default 1;");
  depend_on_entry(&compiler);
  let invalidations = record_invalidations(&compiler);
  let closes = Arc::new(AtomicUsize::new(0));
  {
    let closes = Arc::clone(&closes);
    compiler.hooks.watch_close.tap("count", move |_| {
      closes.fetch_add(1, Ordering::SeqCst);
      Ok(())
    });
  }

  let (handler, mut rx) = results();
  let watching = compiler.watch(fast(), handler).unwrap();

  let first = next(&mut rx).await.unwrap();
  assert!(first.compilation.file_dependencies().contains(Path::new(ENTRY)));

  tokio::time::sleep(Duration::from_millis(5)).await;
  fs.put(ENTRY, "export default 2;");
  next(&mut rx).await.unwrap();

  assert_eq!(*invalidations.lock().unwrap(), [Some(PathBuf::from(ENTRY))]);
  assert!(compiler.timestamps().file(Path::new(ENTRY)).is_some());
  assert!(fs.purge_count() >= 1);

  watching.close().await.unwrap();
  assert_eq!(closes.load(Ordering::SeqCst), 1);
  assert!(compiler.state().is_idle());
}

#[tokio::test]
async fn compilation_dependency_change_triggers_a_rebuild() {
  const CONFIG: &str = "/project/wrapkit.json";
  let (compiler, fs) = memory_compiler(|_| {});
  fs.put(CONFIG, "{}");
  compiler.hooks.this_compilation.tap("config-deps", |event| {
    event.params.add_compilation_dependency(CONFIG);
    Ok(())
  });
  let invalidations = record_invalidations(&compiler);

  let (handler, mut rx) = results();
  let watching = compiler.watch(fast(), handler).unwrap();

  let first = next(&mut rx).await.unwrap();
  assert!(first.compilation.file_dependencies().contains(Path::new(CONFIG)));

  tokio::time::sleep(Duration::from_millis(5)).await;
  fs.put(CONFIG, r#"{ "changed": true }"#);
  next(&mut rx).await.unwrap();

  assert_eq!(*invalidations.lock().unwrap(), [Some(PathBuf::from(CONFIG))]);
  watching.close().await.unwrap();
}

#[tokio::test]
async fn invalidate_rebuilds_without_changes() {
  let (compiler, _fs) = memory_compiler(|_| {});
  let invalidations = record_invalidations(&compiler);
  let (handler, mut rx) = results();
  let watching = compiler.watch(fast(), handler).unwrap();

  next(&mut rx).await.unwrap();
  watching.invalidate();
  next(&mut rx).await.unwrap();

  assert_eq!(*invalidations.lock().unwrap(), [None]);
  watching.close().await.unwrap();
}

#[tokio::test]
async fn busy_compiler_rejects_run_and_second_watch() {
  let (compiler, _fs) = memory_compiler(|_| {});
  let (handler, mut rx) = results();
  let watching = compiler.watch(fast(), handler).unwrap();
  next(&mut rx).await.unwrap();

  assert!(compiler.run().await.unwrap_err().is_concurrent());

  let (second_handler, mut second_rx) = results();
  assert!(compiler.watch(fast(), second_handler).is_none());
  assert!(next(&mut second_rx).await.unwrap_err().is_concurrent());

  watching.close().await.unwrap();
  assert!(compiler.state().is_idle());
  compiler.run().await.unwrap();
}

#[tokio::test]
async fn failed_build_keeps_watching() {
  let (compiler, _fs) = memory_compiler(|_| {});
  let failed_once = Arc::new(AtomicBool::new(false));
  {
    let failed_once = Arc::clone(&failed_once);
    compiler.hooks.before_compile.tap("flaky", move |_| {
      if failed_once.swap(true, Ordering::SeqCst) {
        Ok(())
      } else {
        Err(BuildError::new("syntax error").into())
      }
    });
  }
  let failures = Arc::new(AtomicUsize::new(0));
  {
    let failures = Arc::clone(&failures);
    compiler.hooks.failed.tap("count", move |_| {
      failures.fetch_add(1, Ordering::SeqCst);
      Ok(())
    });
  }

  let (handler, mut rx) = results();
  let watching = compiler.watch(fast(), handler).unwrap();

  let err = next(&mut rx).await.unwrap_err();
  assert_eq!(err.to_string(), "syntax error");
  watching.invalidate();
  next(&mut rx).await.unwrap();

  assert_eq!(failures.load(Ordering::SeqCst), 1);
  watching.close().await.unwrap();
}

/// Replays queued change batches.
struct ScriptedWatcher {
  batches: tokio::sync::Mutex<mpsc::UnboundedReceiver<WatchChanges>>,
  requests: Mutex<Vec<WatchRequest>>,
}

impl FileWatcher for ScriptedWatcher {
  fn wait<'a>(&'a self, request: &'a WatchRequest, _options: &'a WatchOptions) -> WatchFuture<'a> {
    Box::pin(async move {
      self.requests.lock().unwrap().push(request.clone());
      match self.batches.lock().await.recv().await {
        Some(changes) => Ok::<_, CompilerError>(changes),
        None => std::future::pending().await,
      }
    })
  }
}

#[tokio::test]
async fn configured_watcher_drives_timestamps() {
  let (compiler, _fs) = memory_compiler(|_| {});
  depend_on_entry(&compiler);
  compiler.hooks.compilation.tap("context-deps", |event| {
    event.compilation.add_context_dependency("/project/src");
    Ok(())
  });
  compiler.timestamps().set_file("/project/src/gone.js", 1);

  let (batches, queue) = mpsc::unbounded_channel();
  let watcher = Arc::new(ScriptedWatcher {
    batches: tokio::sync::Mutex::new(queue),
    requests: Mutex::new(Vec::new()),
  });
  compiler.set_watch_file_system(Arc::clone(&watcher) as Arc<dyn FileWatcher>);

  let (handler, mut rx) = results();
  let watching = compiler.watch(fast(), handler).unwrap();
  next(&mut rx).await.unwrap();
  // Watching starts from empty timestamps.
  assert!(compiler.timestamps().files().is_empty());

  let mut changes = WatchChanges::default();
  changes.changed.push(PathBuf::from(ENTRY));
  changes.file_timestamps.insert(PathBuf::from(ENTRY), 42);
  changes.context_timestamps.insert(PathBuf::from("/project/src"), 42);
  batches.send(changes).unwrap();
  next(&mut rx).await.unwrap();

  assert_eq!(compiler.timestamps().file(Path::new(ENTRY)), Some(42));
  assert_eq!(compiler.timestamps().context(Path::new("/project/src")), Some(42));

  let request = watcher.requests.lock().unwrap()[0].clone();
  assert!(request.files.contains(Path::new(ENTRY)));
  assert!(request.contexts.contains(Path::new("/project/src")));

  watching.close().await.unwrap();
}

#[tokio::test]
async fn watch_without_any_file_system_reports_to_the_handler() {
  let compiler = Arc::new(Compiler::new(wrapkit_lib::CompilerOptions::new("/project")));
  let (handler, mut rx) = results();
  assert!(compiler.watch(fast(), handler).is_none());
  assert!(matches!(
    next(&mut rx).await.unwrap_err(),
    CompilerError::MissingFileSystem("input")
  ));
  assert!(compiler.state().is_idle());
}
