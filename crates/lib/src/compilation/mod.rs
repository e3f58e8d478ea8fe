//! The per-run compilation.
//!
//! A [`Compilation`] holds everything one compile produces: modules with
//! their block trees, the chunk graph, entrypoints, assets and diagnostics.
//! Module graph construction and chunking belong to plugins (through
//! `make`, `seal` and `optimize_chunk_ids`); the compilation itself owns the
//! hashing pass over the block graph and the asset map the compiler emits.

pub mod asset;
pub mod chunk;
pub mod module;
pub mod params;
pub mod stats;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::block::GroupOptions;
use crate::compiler::Compiler;
use crate::compiler::options::OutputOptions;
use crate::error::BuildError;
use crate::hooks::{AsyncSeriesHook, SyncBailHook, SyncHook};
use crate::records::RecordsHandle;
use crate::timestamps::Timestamps;
use crate::util::hash::create_hash;
use crate::util::sync::lock;
use crate::Result;

pub use asset::{Asset, AssetSource};
pub use chunk::{Chunk, ChunkGraph, ChunkGroup, ChunkGroupId, ChunkId, ChunkKey};
pub use module::Module;
pub use params::{CompilationParams, ContextModuleFactory, NormalModuleFactory};
pub use stats::{AssetSummary, Stats, StatsSummary};

/// Payload of the `child_compiler` hook.
#[derive(Clone)]
pub struct ChildCompilerEvent {
  pub compiler: Arc<Compiler>,
  pub name: String,
  pub index: usize,
}

#[derive(Debug)]
pub struct CompilationHooks {
  /// Any tap answering `true` makes the compiler emit and compile again.
  pub need_additional_pass: SyncBailHook<Arc<Compilation>, bool>,
  pub child_compiler: SyncHook<ChildCompilerEvent>,
  pub finish_modules: SyncHook<Arc<Compilation>>,
  pub seal: SyncHook<Arc<Compilation>>,
  pub optimize_chunk_ids: SyncHook<Arc<Compilation>>,
  pub additional_assets: AsyncSeriesHook<Arc<Compilation>>,
}

impl Default for CompilationHooks {
  fn default() -> Self {
    Self {
      need_additional_pass: SyncBailHook::new("need_additional_pass"),
      child_compiler: SyncHook::new("child_compiler"),
      finish_modules: SyncHook::new("finish_modules"),
      seal: SyncHook::new("seal"),
      optimize_chunk_ids: SyncHook::new("optimize_chunk_ids"),
      additional_assets: AsyncSeriesHook::new("additional_assets"),
    }
  }
}

#[derive(Debug)]
pub struct Compilation {
  name: Option<String>,
  output_options: OutputOptions,
  timestamps: Timestamps,
  records: RecordsHandle,
  compilation_dependencies: Arc<Mutex<BTreeSet<PathBuf>>>,
  file_dependencies: Mutex<BTreeSet<PathBuf>>,
  context_dependencies: Mutex<BTreeSet<PathBuf>>,
  modules: Mutex<Vec<Module>>,
  chunk_graph: Mutex<ChunkGraph>,
  entrypoints: Mutex<BTreeMap<String, ChunkGroupId>>,
  assets: Mutex<BTreeMap<String, Asset>>,
  children: Mutex<Vec<Arc<Compilation>>>,
  errors: Mutex<Vec<BuildError>>,
  warnings: Mutex<Vec<BuildError>>,
  hash: Mutex<Option<String>>,
  pub hooks: CompilationHooks,
}

impl Compilation {
  pub fn new(
    name: Option<String>,
    output_options: OutputOptions,
    timestamps: Timestamps,
    records: RecordsHandle,
    params: &CompilationParams,
  ) -> Self {
    Self {
      name,
      output_options,
      timestamps,
      records,
      compilation_dependencies: params.shared_compilation_dependencies(),
      file_dependencies: Mutex::default(),
      context_dependencies: Mutex::default(),
      modules: Mutex::default(),
      chunk_graph: Mutex::default(),
      entrypoints: Mutex::default(),
      assets: Mutex::default(),
      children: Mutex::default(),
      errors: Mutex::default(),
      warnings: Mutex::default(),
      hash: Mutex::default(),
      hooks: CompilationHooks::default(),
    }
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn output_options(&self) -> &OutputOptions {
    &self.output_options
  }

  pub fn timestamps(&self) -> &Timestamps {
    &self.timestamps
  }

  pub fn records(&self) -> &RecordsHandle {
    &self.records
  }

  /// Shared with the [`CompilationParams`] this compilation was built from,
  /// so additions made by later hooks show up here.
  pub fn compilation_dependencies(&self) -> BTreeSet<PathBuf> {
    lock(&self.compilation_dependencies).clone()
  }

  pub fn add_file_dependency(&self, path: impl AsRef<Path>) {
    lock(&self.file_dependencies).insert(path.as_ref().to_path_buf());
  }

  /// Files to watch: every recorded file dependency plus the compilation
  /// dependencies.
  pub fn file_dependencies(&self) -> BTreeSet<PathBuf> {
    let mut files = lock(&self.file_dependencies).clone();
    files.extend(lock(&self.compilation_dependencies).iter().cloned());
    files
  }

  pub fn add_context_dependency(&self, path: impl AsRef<Path>) {
    lock(&self.context_dependencies).insert(path.as_ref().to_path_buf());
  }

  pub fn context_dependencies(&self) -> BTreeSet<PathBuf> {
    lock(&self.context_dependencies).clone()
  }

  pub fn add_module(&self, module: Module) {
    lock(&self.modules).push(module);
  }

  pub fn with_modules<R>(&self, f: impl FnOnce(&mut Vec<Module>) -> R) -> R {
    f(&mut lock(&self.modules))
  }

  pub fn module_hash(&self, identifier: &str) -> Option<String> {
    lock(&self.modules)
      .iter()
      .find(|m| m.identifier == identifier)
      .and_then(|m| m.hash.clone())
  }

  pub fn with_chunk_graph<R>(&self, f: impl FnOnce(&mut ChunkGraph) -> R) -> R {
    f(&mut lock(&self.chunk_graph))
  }

  /// Register an entrypoint backed by a new chunk group.
  pub fn add_entrypoint(&self, name: impl Into<String>, options: GroupOptions) -> ChunkGroupId {
    let group = self.with_chunk_graph(|graph| graph.add_group(options));
    lock(&self.entrypoints).insert(name.into(), group);
    group
  }

  pub fn entrypoints(&self) -> BTreeMap<String, ChunkGroupId> {
    lock(&self.entrypoints).clone()
  }

  /// Chunks of every entrypoint group, in entrypoint name order.
  pub fn entrypoint_chunks(&self) -> Vec<Chunk> {
    let entrypoints = self.entrypoints();
    let graph = lock(&self.chunk_graph);
    entrypoints
      .values()
      .flat_map(|group| graph.group_chunks(*group))
      .cloned()
      .collect()
  }

  /// Add or replace an asset. A replaced asset is written again on emit.
  pub fn emit_asset(&self, name: impl Into<String>, source: impl Into<AssetSource>) {
    lock(&self.assets).insert(name.into(), Asset::new(source));
  }

  pub fn asset(&self, name: &str) -> Option<Asset> {
    lock(&self.assets).get(name).cloned()
  }

  pub fn assets(&self) -> BTreeMap<String, Asset> {
    lock(&self.assets).clone()
  }

  pub fn with_assets<R>(&self, f: impl FnOnce(&mut BTreeMap<String, Asset>) -> R) -> R {
    f(&mut lock(&self.assets))
  }

  /// Copy `assets` into this compilation; entries with the same name are
  /// overwritten.
  pub fn merge_assets(&self, assets: BTreeMap<String, Asset>) {
    lock(&self.assets).extend(assets);
  }

  pub fn push_child(&self, child: Arc<Compilation>) {
    lock(&self.children).push(child);
  }

  pub fn children(&self) -> Vec<Arc<Compilation>> {
    lock(&self.children).clone()
  }

  pub fn push_error(&self, error: BuildError) {
    lock(&self.errors).push(error);
  }

  pub fn push_warning(&self, warning: BuildError) {
    lock(&self.warnings).push(warning);
  }

  pub fn errors(&self) -> Vec<BuildError> {
    lock(&self.errors).clone()
  }

  pub fn warnings(&self) -> Vec<BuildError> {
    lock(&self.warnings).clone()
  }

  /// Full hash of the compilation, available after sealing.
  pub fn hash(&self) -> Option<String> {
    lock(&self.hash).clone()
  }

  pub fn finish(self: &Arc<Self>) -> Result<()> {
    self.hooks.finish_modules.call(self)
  }

  /// Seal the module graph: let plugins build chunks and assign ids, then
  /// hash every module and derive the full hash, then collect additional
  /// assets.
  pub async fn seal(self: &Arc<Self>) -> Result<()> {
    self.hooks.seal.call(self)?;
    self.hooks.optimize_chunk_ids.call(self)?;
    self.hash_modules()?;
    debug!(compilation = self.name.as_deref().unwrap_or(""), hash = ?self.hash(), "sealed");
    self.hooks.additional_assets.call(Arc::clone(self)).await
  }

  /// Clear everything tied to the last seal so the modules can be sealed
  /// again.
  pub fn unseal(&self) {
    self.with_chunk_graph(ChunkGraph::clear);
    lock(&self.entrypoints).clear();
    for module in lock(&self.modules).iter_mut() {
      module.block.unseal();
      module.hash = None;
    }
    *lock(&self.hash) = None;
  }

  pub fn need_additional_pass(self: &Arc<Self>) -> Result<bool> {
    Ok(self.hooks.need_additional_pass.call(self)?.unwrap_or(false))
  }

  /// Substitute `[name]`, `[hash]` (shortened to the configured digest
  /// length) and `[fullhash]` in `template`.
  pub fn get_path(&self, template: &str) -> String {
    let full = self.hash().unwrap_or_default();
    let short: String = full.chars().take(self.output_options.hash_digest_length).collect();
    template
      .replace("[fullhash]", &full)
      .replace("[hash]", &short)
      .replace("[name]", self.name.as_deref().unwrap_or(""))
  }

  fn hash_modules(&self) -> Result<()> {
    let options = &self.output_options;
    let graph = lock(&self.chunk_graph);
    let mut modules = lock(&self.modules);

    let mut order: Vec<usize> = (0..modules.len()).collect();
    order.sort_by(|&a, &b| modules[a].identifier.cmp(&modules[b].identifier));

    let mut full = create_hash(&options.hash_function)?;
    for idx in order {
      let module = &mut modules[idx];
      let mut hash = create_hash(&options.hash_function)?;
      hash.update(&module.identifier);
      module.block.update_hash(hash.as_mut(), &graph);
      let digest = hash.digest(options.hash_digest);
      full.update(&digest);
      module.hash = Some(digest);
    }
    *lock(&self.hash) = Some(full.digest(options.hash_digest));
    Ok(())
  }
}
