use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Notify;
use wrapkit_lib::compilation::Module;
use wrapkit_lib::compiler::CompilerState;
use wrapkit_lib::{BuildError, CompilerError, CompilerOptions, Environment, create_compiler};

use super::common::memory_compiler;

#[tokio::test]
async fn bare_build_on_disk_persists_empty_records() {
  let temp = TempDir::new().unwrap();
  let mut options = CompilerOptions::new(temp.path());
  options.output.path = Some(PathBuf::from("dist"));
  options.records_output_path = Some(PathBuf::from("state/records.json"));

  let compiler = create_compiler(options, Environment::native(), &[]).unwrap();
  let stats = compiler.run().await.unwrap();

  assert!(stats.end_time >= stats.start_time);
  assert!(!stats.has_errors());
  assert!(compiler.state().is_idle());

  let records = std::fs::read_to_string(temp.path().join("state/records.json")).unwrap();
  assert_eq!(records, "{}");
}

#[tokio::test]
async fn assets_land_under_the_output_path_on_disk() {
  let temp = TempDir::new().unwrap();
  let mut options = CompilerOptions::new(temp.path());
  options.output.path = Some(PathBuf::from("dist"));

  let compiler = create_compiler(options, Environment::native(), &[]).unwrap();
  compiler.hooks.compilation.tap("emitter", |event| {
    event.compilation.emit_asset("main.js", "console.log(1);");
    event.compilation.emit_asset("chunks/1.js", "void 0;");
    Ok(())
  });

  let stats = compiler.run().await.unwrap();
  assert_eq!(
    std::fs::read_to_string(temp.path().join("dist/main.js")).unwrap(),
    "console.log(1);"
  );
  assert!(temp.path().join("dist/chunks/1.js").is_file());
  assert_eq!(stats.summary().emitted().count(), 2);
}

#[tokio::test]
async fn second_run_while_busy_is_rejected() {
  let (compiler, _fs) = memory_compiler(|_| {});
  let entered = Arc::new(Notify::new());
  let release = Arc::new(Notify::new());
  {
    let entered = Arc::clone(&entered);
    let release = Arc::clone(&release);
    compiler.hooks.make.tap_async("slow", move |_| {
      let entered = Arc::clone(&entered);
      let release = Arc::clone(&release);
      async move {
        entered.notify_one();
        release.notified().await;
        Ok::<(), CompilerError>(())
      }
    });
  }

  let first = tokio::spawn({
    let compiler = Arc::clone(&compiler);
    async move { compiler.run().await }
  });
  entered.notified().await;

  let err = compiler.run().await.unwrap_err();
  assert!(err.is_concurrent());
  assert_eq!(compiler.state(), CompilerState::Running);

  release.notify_one();
  let stats = first.await.unwrap().unwrap();
  assert!(!stats.has_errors());
  assert!(compiler.state().is_idle());
}

#[tokio::test]
async fn repeated_runs_write_identical_output() {
  let (compiler, fs) = memory_compiler(|options| {
    options.output.path = Some(PathBuf::from("/project/dist/[hash]"));
  });
  compiler.hooks.compilation.tap("content", |event| {
    event.compilation.add_module(Module::new("./index.js"));
    event.compilation.emit_asset("main.js", "export default 1;");
    Ok(())
  });

  let first = compiler.run().await.unwrap();
  let files_after_first = fs.files();
  let second = compiler.run().await.unwrap();

  assert_eq!(first.hash(), second.hash());
  assert_eq!(fs.files(), files_after_first);
  let hash = first.hash().unwrap();
  let short: String = hash.chars().take(20).collect();
  assert_eq!(
    fs.read_to_string(format!("/project/dist/{short}/main.js")).as_deref(),
    Some("export default 1;")
  );
}

#[tokio::test]
async fn missing_records_input_starts_fresh() {
  let (compiler, fs) = memory_compiler(|options| {
    options.records_path = Some(PathBuf::from("records.json"));
  });
  compiler.hooks.compilation.tap("remember", |event| {
    event.compilation.records().update(|records| {
      records["modules"] = json!({ "./index.js": 0 });
    });
    Ok(())
  });

  compiler.run().await.unwrap();
  let written: serde_json::Value =
    serde_json::from_str(&fs.read_to_string("/project/records.json").unwrap()).unwrap();
  assert_eq!(written, json!({ "modules": { "./index.js": 0 } }));
}

#[tokio::test]
async fn corrupt_records_fail_the_run() {
  let (compiler, fs) = memory_compiler(|options| {
    options.records_path = Some(PathBuf::from("records.json"));
  });
  fs.put("/project/records.json", "{ not json");

  let failures = Arc::new(AtomicUsize::new(0));
  {
    let failures = Arc::clone(&failures);
    compiler.hooks.failed.tap("count", move |_| {
      failures.fetch_add(1, Ordering::SeqCst);
      Ok(())
    });
  }

  let err = compiler.run().await.unwrap_err();
  assert!(matches!(err, CompilerError::RecordsParse(_)));
  assert_eq!(failures.load(Ordering::SeqCst), 1);
  assert!(compiler.state().is_idle());
}

#[tokio::test]
async fn build_errors_are_reported_in_stats_not_as_failures() {
  let (compiler, _fs) = memory_compiler(|_| {});
  compiler.hooks.make.tap("lint", |compilation| {
    compilation.push_error(BuildError::new("unexpected token"));
    compilation.push_warning(BuildError::new("unused import"));
    Ok(())
  });

  let stats = compiler.run().await.unwrap();
  assert!(stats.has_errors());
  assert!(stats.has_warnings());
  let summary = stats.summary();
  assert_eq!(summary.errors.len(), 1);
  assert_eq!(summary.warnings.len(), 1);
}
