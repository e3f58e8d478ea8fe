//! Writing a compilation's assets to the output filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, trace};

use super::Compiler;
use crate::compilation::Compilation;
use crate::fs::OutputFileSystem;
use crate::util::path::strip_query;
use crate::{CompilerError, Result};

impl Compiler {
  /// Run `emit`, write every asset under the resolved output path, then run
  /// `after_emit`.
  ///
  /// Writes run concurrently; the first failed write aborts the rest and
  /// fails the emit. An asset already written to the same target is skipped
  /// and marked as not emitted.
  pub async fn emit_assets(&self, compilation: &Arc<Compilation>) -> Result<()> {
    let fs = self.output_file_system()?;

    debug!(phase = "emit");
    self.hooks.emit.call(Arc::clone(compilation)).await?;

    let output_path = PathBuf::from(compilation.get_path(&self.output_path.to_string_lossy()));
    fs.mkdirp(&output_path)
      .await
      .map_err(|source| CompilerError::fs("mkdirp", &output_path, source))?;

    let mut writes = JoinSet::new();
    for name in compilation.assets().into_keys() {
      writes.spawn(emit_asset(
        Arc::clone(&fs),
        output_path.clone(),
        name,
        Arc::clone(compilation),
      ));
    }
    while let Some(joined) = writes.join_next().await {
      joined.map_err(|err| CompilerError::Task(err.to_string()))??;
    }

    debug!(phase = "after_emit");
    self.hooks.after_emit.call(Arc::clone(compilation)).await
  }
}

async fn emit_asset(
  fs: Arc<dyn OutputFileSystem>,
  output_path: PathBuf,
  name: String,
  compilation: Arc<Compilation>,
) -> Result<()> {
  let target_file = strip_query(&name);
  let target_path = fs.join(&output_path, target_file);

  let Some(asset) = compilation.asset(&name) else {
    return Ok(());
  };
  if asset.exists_at.as_deref() == Some(target_path.as_path()) {
    trace!(asset = %name, "already at target, skipping");
    compilation.with_assets(|assets| {
      if let Some(asset) = assets.get_mut(&name) {
        asset.emitted = false;
      }
    });
    return Ok(());
  }

  if target_file.contains(['/', '\\']) {
    if let Some(dir) = Path::new(target_file).parent() {
      let dir = fs.join(&output_path, &dir.to_string_lossy());
      fs.mkdirp(&dir)
        .await
        .map_err(|source| CompilerError::fs("mkdirp", &dir, source))?;
    }
  }

  fs.write_file(&target_path, asset.source.to_bytes())
    .await
    .map_err(|source| CompilerError::fs("write", &target_path, source))?;
  debug!(asset = %name, path = %target_path.display(), size = asset.source.size(), "asset written");

  compilation.with_assets(|assets| {
    if let Some(entry) = assets.get_mut(&name) {
      if entry.source == asset.source {
        entry.exists_at = Some(target_path);
        entry.emitted = true;
      }
    }
  });
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compiler::CompilerOptions;
  use crate::fs::MemoryFileSystem;

  async fn setup(output: &str) -> (Arc<Compiler>, MemoryFileSystem, Arc<Compilation>) {
    let mut options = CompilerOptions::new("/project");
    options.output.path = Some(PathBuf::from(output));
    let fs = MemoryFileSystem::new();
    let compiler = Arc::new(Compiler::new(options));
    compiler.set_output_file_system(Some(Arc::new(fs.clone())));
    let params = compiler.new_compilation_params().unwrap();
    let compilation = compiler.new_compilation(&params).unwrap();
    compilation.seal().await.unwrap();
    (compiler, fs, compilation)
  }

  #[tokio::test]
  async fn writes_assets_and_nested_directories() {
    let (compiler, fs, compilation) = setup("/project/dist").await;
    compilation.emit_asset("main.js", "console.log(1)");
    compilation.emit_asset("css/site.css?v=3", "body{}");
    compilation.emit_asset("img/logo.bin", vec![0u8, 159, 146, 150]);

    compiler.emit_assets(&compilation).await.unwrap();

    assert_eq!(fs.read_to_string("/project/dist/main.js").as_deref(), Some("console.log(1)"));
    assert_eq!(fs.read_to_string("/project/dist/css/site.css").as_deref(), Some("body{}"));
    assert!(fs.exists("/project/dist/img/logo.bin"));
    let asset = compilation.asset("main.js").unwrap();
    assert!(asset.emitted);
    assert_eq!(asset.exists_at, Some(PathBuf::from("/project/dist/main.js")));
  }

  #[tokio::test]
  async fn second_emit_of_same_asset_is_skipped() {
    let (compiler, fs, compilation) = setup("/project/dist").await;
    compilation.emit_asset("main.js", "content");

    compiler.emit_assets(&compilation).await.unwrap();
    assert_eq!(fs.write_count(), 1);

    compiler.emit_assets(&compilation).await.unwrap();
    assert_eq!(fs.write_count(), 1);
    assert!(!compilation.asset("main.js").unwrap().emitted);
  }

  #[tokio::test]
  async fn output_path_uses_compilation_hash() {
    let (compiler, fs, compilation) = setup("/project/dist/[hash]").await;
    compilation.emit_asset("main.js", "content");
    compiler.emit_assets(&compilation).await.unwrap();

    let hash = compilation.hash().unwrap();
    let short: String = hash.chars().take(20).collect();
    assert!(fs.exists(format!("/project/dist/{}/main.js", short)));
  }

  #[tokio::test]
  async fn failed_write_fails_the_emit() {
    let (compiler, fs, compilation) = setup("/project/dist").await;
    // A file where the asset's directory should be.
    fs.put("/project/dist/css", "not a directory");
    compilation.emit_asset("css/site.css", "body{}");

    let err = compiler.emit_assets(&compilation).await.unwrap_err();
    assert!(matches!(err, CompilerError::FileSystem { op: "mkdirp", .. }));
  }

  #[tokio::test]
  async fn emit_without_output_file_system() {
    let (compiler, _fs, compilation) = setup("/project/dist").await;
    compiler.set_output_file_system(None);
    assert!(matches!(
      compiler.emit_assets(&compilation).await,
      Err(CompilerError::MissingFileSystem("output"))
    ));
  }
}
