use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Barrier;
use wrapkit_lib::compiler::{CompilerHooks, LegacyHandler};
use wrapkit_lib::hooks::{AsyncParallelHook, Discipline, HookInfo, SyncBailHook, SyncHook};
use wrapkit_lib::{BuildError, CompilerError};

use super::common::memory_compiler;

#[test]
fn taps_added_during_dispatch_wait_for_the_next_call() {
  let hook = Arc::new(SyncHook::<u32>::new("tick"));
  let calls = Arc::new(Mutex::new(Vec::new()));
  {
    let hook_ref = Arc::downgrade(&hook);
    let calls = Arc::clone(&calls);
    hook.tap("spawner", move |n| {
      calls.lock().unwrap().push(format!("spawner:{n}"));
      if let Some(hook) = hook_ref.upgrade() {
        let calls = Arc::clone(&calls);
        hook.tap("late", move |n| {
          calls.lock().unwrap().push(format!("late:{n}"));
          Ok(())
        });
      }
      Ok(())
    });
  }

  hook.call(&1).unwrap();
  assert_eq!(*calls.lock().unwrap(), ["spawner:1"]);
  hook.call(&2).unwrap();
  assert_eq!(*calls.lock().unwrap(), ["spawner:1", "spawner:2", "late:2"]);
}

#[test]
fn untapped_callbacks_are_not_called() {
  let hook = SyncHook::<()>::new("ping");
  let calls = Arc::new(Mutex::new(0));
  let handle = {
    let calls = Arc::clone(&calls);
    hook.tap("counter", move |_| {
      *calls.lock().unwrap() += 1;
      Ok(())
    })
  };
  hook.call(&()).unwrap();
  assert!(hook.untap(handle));
  assert!(!hook.untap(handle));
  hook.call(&()).unwrap();
  assert_eq!(*calls.lock().unwrap(), 1);
  assert!(!hook.is_used());
}

#[test]
fn bail_hook_skips_taps_after_an_answer() {
  let hook = SyncBailHook::<String, usize>::new("measure");
  let reached = Arc::new(Mutex::new(Vec::new()));
  for (name, answer) in [("undecided", None), ("decider", Some(3)), ("never", Some(9))] {
    let reached = Arc::clone(&reached);
    hook.tap(name, move |_| {
      reached.lock().unwrap().push(name);
      Ok(answer)
    });
  }

  assert_eq!(hook.call(&"abc".to_string()).unwrap(), Some(3));
  assert_eq!(*reached.lock().unwrap(), ["undecided", "decider"]);
  assert_eq!(hook.tap_names(), ["undecided", "decider", "never"]);
}

#[tokio::test]
async fn parallel_taps_overlap() {
  let hook = AsyncParallelHook::<Arc<Barrier>>::new("meet");
  for name in ["left", "right", "center"] {
    hook.tap_async(name, |barrier: Arc<Barrier>| async move {
      barrier.wait().await;
      Ok::<(), CompilerError>(())
    });
  }
  let result = tokio::time::timeout(Duration::from_secs(5), hook.call(Arc::new(Barrier::new(3)))).await;
  assert!(matches!(result, Ok(Ok(()))));
}

#[tokio::test]
async fn parallel_failure_does_not_wait_for_stragglers() {
  let hook = AsyncParallelHook::<()>::new("race");
  hook.tap_async("stuck", |_| async {
    std::future::pending::<()>().await;
    Ok::<(), CompilerError>(())
  });
  hook.tap_async("broken", |_| async { Err::<(), CompilerError>(BuildError::new("broken tap").into()) });

  let result = tokio::time::timeout(Duration::from_secs(5), hook.call(())).await;
  let err = result.expect("call returned before timeout").unwrap_err();
  assert_eq!(err.to_string(), "broken tap");
}

#[test]
fn registry_reports_every_compiler_hook() {
  let hooks = CompilerHooks::default();
  for name in CompilerHooks::names() {
    let hook = hooks.get(name).unwrap();
    assert_eq!(hook.name(), *name);
    assert!(!hook.is_used());
  }
  assert_eq!(hooks.get("make").unwrap().discipline(), Discipline::AsyncParallel);
  assert_eq!(hooks.get("should_emit").unwrap().discipline(), Discipline::SyncBail);
  assert!(hooks.get("seal").is_none());
}

#[tokio::test]
async fn legacy_taps_run_alongside_typed_taps() {
  let (compiler, _fs) = memory_compiler(|_| {});
  let seen = Arc::new(Mutex::new(Vec::new()));
  {
    let seen = Arc::clone(&seen);
    compiler.hooks.done.tap("typed", move |_| {
      seen.lock().unwrap().push("typed".to_string());
      Ok(())
    });
  }
  {
    let seen = Arc::clone(&seen);
    compiler
      .plugin(
        "done",
        "legacy",
        LegacyHandler::sync(move |args| {
          seen.lock().unwrap().push(format!("legacy:{args:?}"));
          Ok(())
        }),
      )
      .unwrap();
  }

  compiler.run().await.unwrap();
  assert_eq!(*seen.lock().unwrap(), ["typed", "legacy:Stats"]);

  let err = compiler
    .plugin("not-a-hook", "legacy", LegacyHandler::sync(|_| Ok(())))
    .unwrap_err();
  assert!(matches!(err, CompilerError::UnknownHook(ref name) if name == "not-a-hook"));
}
