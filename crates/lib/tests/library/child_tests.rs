use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, json};
use wrapkit_lib::block::GroupOptions;
use wrapkit_lib::compilation::Chunk;
use wrapkit_lib::{BuildError, Compiler, CompilerError, plugin_fn};

use super::common::memory_compiler;

fn worker_plugin() -> Arc<dyn wrapkit_lib::Plugin> {
  plugin_fn("worker-entry", |child: &Compiler| {
    child.hooks.make.tap("worker-entry", |compilation| {
      compilation.emit_asset("worker.js", "self.onmessage = () => {};");
      let group = compilation.add_entrypoint("worker", GroupOptions::named("worker"));
      compilation.with_chunk_graph(|graph| {
        graph.add_chunk(group, Chunk::with_id("worker", "w0"));
      });
      Ok(())
    });
    Ok(())
  })
}

#[tokio::test]
async fn child_build_is_emitted_and_recorded_by_the_parent() {
  let (compiler, fs) = memory_compiler(|options| {
    options.records_path = Some(PathBuf::from("records.json"));
  });
  let chunk_ids = Arc::new(Mutex::new(Vec::new()));
  {
    let parent = Arc::downgrade(&compiler);
    let chunk_ids = Arc::clone(&chunk_ids);
    compiler.hooks.make.tap_async("spawn-worker", move |compilation| {
      let parent = parent.upgrade().expect("parent compiler alive");
      let chunk_ids = Arc::clone(&chunk_ids);
      async move {
        let child = parent.create_child_compiler(&compilation, "/project/worker.js", 0, &Map::new(), &[worker_plugin()])?;
        let (chunks, _) = child.run_as_child().await?;
        chunk_ids
          .lock()
          .unwrap()
          .extend(chunks.into_iter().filter_map(|chunk| chunk.id).map(|id| id.to_string()));
        Ok::<(), CompilerError>(())
      }
    });
  }

  let stats = compiler.run().await.unwrap();

  assert_eq!(*chunk_ids.lock().unwrap(), ["w0"]);
  assert_eq!(
    fs.read_to_string("/project/dist/worker.js").as_deref(),
    Some("self.onmessage = () => {};")
  );
  let summary = stats.summary();
  assert_eq!(summary.children.len(), 1);
  assert_eq!(summary.children[0].name.as_deref(), Some("/project/worker.js"));

  let records: serde_json::Value = serde_json::from_str(&fs.read_to_string("/project/records.json").unwrap()).unwrap();
  assert_eq!(records, json!({ "./worker.js": [{}] }));
}

#[tokio::test]
async fn child_failure_fails_the_parent_phase() {
  let (compiler, _fs) = memory_compiler(|_| {});
  let child_failures = Arc::new(AtomicUsize::new(0));
  let failing = {
    let child_failures = Arc::clone(&child_failures);
    plugin_fn("failing", move |child: &Compiler| {
      child.hooks.before_compile.tap("failing", |_| Err(BuildError::new("worker entry missing").into()));
      let child_failures = Arc::clone(&child_failures);
      child.hooks.failed.tap("count", move |_| {
        child_failures.fetch_add(1, Ordering::SeqCst);
        Ok(())
      });
      Ok(())
    })
  };
  {
    let parent = Arc::downgrade(&compiler);
    compiler.hooks.make.tap_async("spawn-worker", move |compilation| {
      let parent = parent.upgrade().expect("parent compiler alive");
      let failing = Arc::clone(&failing);
      async move {
        let child = parent.create_child_compiler(&compilation, "worker", 0, &Map::new(), &[failing])?;
        child.run_as_child().await?;
        Ok::<(), CompilerError>(())
      }
    });
  }

  let err = compiler.run().await.unwrap_err();
  assert_eq!(err.to_string(), "worker entry missing");
  assert_eq!(child_failures.load(Ordering::SeqCst), 1);
  assert!(compiler.state().is_idle());
}

#[tokio::test]
async fn child_outliving_its_parent_compilation_cannot_run() {
  let (compiler, _fs) = memory_compiler(|_| {});
  let params = compiler.new_compilation_params().unwrap();
  let compilation = compiler.new_compilation(&params).unwrap();
  let child = compiler
    .create_child_compiler(&compilation, "late", 0, &Map::new(), &[])
    .unwrap();
  drop(compilation);

  assert!(child.is_child());
  assert!(child.parent_compilation().is_none());
  let err = child.run_as_child().await.unwrap_err();
  assert!(matches!(err, CompilerError::NotAChild(Some(ref name)) if name == "late"));
}

#[tokio::test]
async fn child_cannot_emit_on_its_own() {
  let (compiler, _fs) = memory_compiler(|_| {});
  let params = compiler.new_compilation_params().unwrap();
  let compilation = compiler.new_compilation(&params).unwrap();
  let child = compiler
    .create_child_compiler(&compilation, "worker", 0, &Map::new(), &[])
    .unwrap();

  let err = child.run().await.unwrap_err();
  assert!(matches!(err, CompilerError::MissingFileSystem("output")));
}
