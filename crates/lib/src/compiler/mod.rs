//! The top-level orchestrator.
//!
//! A [`Compiler`] owns the configuration, the filesystem capabilities, the
//! resolver factory, the persisted records and the timestamp maps, and it
//! drives every build through its [`CompilerHooks`]:
//!
//! ```text
//! before_run -> run -> read records
//!   -> before_compile -> compile -> this_compilation -> compilation
//!   -> make -> finish -> seal -> after_compile
//!   -> should_emit? -> emit -> write assets -> after_emit
//!   -> (need_additional_pass? done -> additional_pass -> compile again)
//!   -> persist records -> done
//! ```
//!
//! Every phase returns a [`Result`]; the first error ends the run, resets
//! the single-flight guard and goes through the `failed` hook.

mod child;
mod compat;
mod emit;
pub mod hooks;
pub mod options;
mod records;
pub mod state;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, Weak};

use tracing::{debug, error, info, warn};

use crate::compilation::{Compilation, CompilationParams, ContextModuleFactory, NormalModuleFactory, Stats};
use crate::fs::{InputFileSystem, OutputFileSystem};
use crate::records::RecordsHandle;
use crate::resolver::ResolverFactory;
use crate::timestamps::Timestamps;
use crate::util::now_millis;
use crate::util::sync::{read, write};
use crate::watch::FileWatcher;
use crate::{CompilerError, Result};

pub use compat::{LegacyArgs, LegacyHandler};
pub use hooks::{CompilationEvent, CompilerHooks, EntryOption, Invalidation};
pub use options::{CompilerOptions, OutputOptions, WatchOptions};
pub use state::{CompilerState, WatchPhase};

use state::{StateCell, StateGuard};

pub struct Compiler {
  name: Option<String>,
  context: PathBuf,
  options: CompilerOptions,
  output_path: PathBuf,
  records_input_path: Option<PathBuf>,
  records_output_path: Option<PathBuf>,
  input_file_system: RwLock<Option<Arc<dyn InputFileSystem>>>,
  output_file_system: RwLock<Option<Arc<dyn OutputFileSystem>>>,
  watch_file_system: RwLock<Option<Arc<dyn FileWatcher>>>,
  resolver_factory: Arc<ResolverFactory>,
  records: RecordsHandle,
  timestamps: Timestamps,
  pub(crate) state: StateCell,
  parent_compilation: Option<Weak<Compilation>>,
  pub hooks: CompilerHooks,
}

impl Compiler {
  /// Build a root compiler. Options are normalized first; no filesystem is
  /// configured yet.
  pub fn new(options: CompilerOptions) -> Self {
    let options = options.normalize();
    let output_path = options.output.path.clone().unwrap_or_else(|| options.context.clone());
    Self {
      name: options.name.clone(),
      context: options.context.clone(),
      output_path,
      records_input_path: options.records_input_path.clone(),
      records_output_path: options.records_output_path.clone(),
      options,
      input_file_system: RwLock::new(None),
      output_file_system: RwLock::new(None),
      watch_file_system: RwLock::new(None),
      resolver_factory: Arc::new(ResolverFactory::new()),
      records: RecordsHandle::new(),
      timestamps: Timestamps::new(),
      state: StateCell::default(),
      parent_compilation: None,
      hooks: CompilerHooks::default(),
    }
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn context(&self) -> &Path {
    &self.context
  }

  pub fn options(&self) -> &CompilerOptions {
    &self.options
  }

  /// Output directory template; `[hash]` and `[name]` are substituted per
  /// compilation.
  pub fn output_path(&self) -> &Path {
    &self.output_path
  }

  pub fn records_input_path(&self) -> Option<&Path> {
    self.records_input_path.as_deref()
  }

  pub fn records_output_path(&self) -> Option<&Path> {
    self.records_output_path.as_deref()
  }

  pub fn resolver_factory(&self) -> &Arc<ResolverFactory> {
    &self.resolver_factory
  }

  pub fn records(&self) -> &RecordsHandle {
    &self.records
  }

  pub fn timestamps(&self) -> &Timestamps {
    &self.timestamps
  }

  pub fn state(&self) -> CompilerState {
    self.state.get()
  }

  pub fn is_child(&self) -> bool {
    self.parent_compilation.is_some()
  }

  /// The compilation this child was created from, while it is alive.
  pub fn parent_compilation(&self) -> Option<Arc<Compilation>> {
    self.parent_compilation.as_ref().and_then(Weak::upgrade)
  }

  pub fn set_input_file_system(&self, fs: Arc<dyn InputFileSystem>) {
    *write(&self.input_file_system) = Some(fs);
  }

  pub fn set_output_file_system(&self, fs: Option<Arc<dyn OutputFileSystem>>) {
    *write(&self.output_file_system) = fs;
  }

  pub fn set_watch_file_system(&self, watcher: Arc<dyn FileWatcher>) {
    *write(&self.watch_file_system) = Some(watcher);
  }

  pub fn input_file_system(&self) -> Result<Arc<dyn InputFileSystem>> {
    read(&self.input_file_system)
      .clone()
      .ok_or(CompilerError::MissingFileSystem("input"))
  }

  pub fn output_file_system(&self) -> Result<Arc<dyn OutputFileSystem>> {
    read(&self.output_file_system)
      .clone()
      .ok_or(CompilerError::MissingFileSystem("output"))
  }

  pub fn watch_file_system(&self) -> Result<Arc<dyn FileWatcher>> {
    read(&self.watch_file_system)
      .clone()
      .ok_or(CompilerError::MissingFileSystem("watch"))
  }

  pub fn has_output_file_system(&self) -> bool {
    read(&self.output_file_system).is_some()
  }

  /// Let the input filesystem drop its caches, if it has any.
  pub fn purge_input_file_system(&self) {
    if let Some(fs) = read(&self.input_file_system).as_ref() {
      fs.purge();
    }
  }

  /// Run one full build.
  ///
  /// Fails with [`CompilerError::Concurrent`] while another `run` or
  /// `watch` is active on this instance, without touching any state.
  pub async fn run(self: &Arc<Self>) -> Result<Stats> {
    let _guard: StateGuard<'_> = self.state.begin(CompilerState::Running)?;
    let start_time = now_millis();
    info!(compiler = %self.label(), "build started");

    let result = self.run_phases(start_time).await;
    match &result {
      Ok(stats) => info!(
        compiler = %self.label(),
        hash = stats.hash().as_deref().unwrap_or(""),
        duration_ms = stats.duration().as_millis() as u64,
        "build finished"
      ),
      Err(err) => {
        error!(compiler = %self.label(), error = %err, "build failed");
        self.report_failure(err);
      }
    }
    result
  }

  async fn run_phases(self: &Arc<Self>, start_time: u64) -> Result<Stats> {
    debug!(phase = "before_run");
    self.hooks.before_run.call(Arc::clone(self)).await?;
    debug!(phase = "run");
    self.hooks.run.call(Arc::clone(self)).await?;
    self.read_records().await?;
    self.compile_and_emit(start_time).await
  }

  /// Compile, emit, loop on additional passes, persist records and run
  /// `done`. Shared by `run` and every watch rebuild.
  pub(crate) async fn compile_and_emit(self: &Arc<Self>, start_time: u64) -> Result<Stats> {
    let mut passes = 0;
    loop {
      let compilation = self.compile().await?;

      if self.hooks.should_emit.call(&compilation)? == Some(false) {
        info!(compiler = %self.label(), "emission vetoed");
        self.emit_records().await?;
        return self.finish_build(compilation, start_time).await;
      }

      self.emit_assets(&compilation).await?;

      if compilation.need_additional_pass()? {
        passes += 1;
        if let Some(limit) = self.options.max_additional_passes {
          if passes > limit {
            return Err(CompilerError::AdditionalPassLimit(limit));
          }
        }
        debug!(phase = "additional_pass", pass = passes);
        let stats = Stats::new(compilation, start_time, now_millis());
        self.hooks.done.call(stats).await?;
        self.hooks.additional_pass.call(()).await?;
        continue;
      }

      self.emit_records().await?;
      return self.finish_build(compilation, start_time).await;
    }
  }

  async fn finish_build(&self, compilation: Arc<Compilation>, start_time: u64) -> Result<Stats> {
    let stats = Stats::new(compilation, start_time, now_millis());
    debug!(phase = "done");
    self.hooks.done.call(stats.clone()).await?;
    Ok(stats)
  }

  /// Build one compilation without emitting anything.
  pub async fn compile(self: &Arc<Self>) -> Result<Arc<Compilation>> {
    let params = self.new_compilation_params()?;
    debug!(phase = "before_compile");
    self.hooks.before_compile.call(params.clone()).await?;
    self.hooks.compile.call(&params)?;

    let compilation = self.new_compilation(&params)?;
    debug!(phase = "make");
    self.hooks.make.call(Arc::clone(&compilation)).await?;

    compilation.finish()?;
    debug!(phase = "seal");
    compilation.seal().await?;

    debug!(phase = "after_compile");
    self.hooks.after_compile.call(Arc::clone(&compilation)).await?;
    Ok(compilation)
  }

  /// Fresh module factories for one compile.
  pub fn new_compilation_params(&self) -> Result<CompilationParams> {
    let normal = Arc::new(NormalModuleFactory::new(
      self.context.clone(),
      self.options.module.clone(),
      Arc::clone(&self.resolver_factory),
    ));
    self.hooks.normal_module_factory.call(&normal)?;

    let context = Arc::new(ContextModuleFactory::new(Arc::clone(&self.resolver_factory)));
    self.hooks.context_module_factory.call(&context)?;

    Ok(CompilationParams::new(normal, context))
  }

  /// A compilation seeded with this compiler's timestamps and records.
  pub fn new_compilation(&self, params: &CompilationParams) -> Result<Arc<Compilation>> {
    let compilation = Arc::new(Compilation::new(
      self.name.clone(),
      self.options.output.clone(),
      self.timestamps.clone(),
      self.records.clone(),
      params,
    ));
    let event = CompilationEvent {
      compilation: Arc::clone(&compilation),
      params: params.clone(),
    };
    self.hooks.this_compilation.call(&event)?;
    self.hooks.compilation.call(&event)?;
    Ok(compilation)
  }

  pub(crate) fn report_failure(&self, err: &CompilerError) {
    if let Err(hook_err) = self.hooks.failed.call(err) {
      warn!(compiler = %self.label(), error = %hook_err, "failed hook errored");
    }
  }

  pub(crate) fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("<root>")
  }
}

impl fmt::Debug for Compiler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Compiler")
      .field("name", &self.name)
      .field("context", &self.context)
      .field("output_path", &self.output_path)
      .field("state", &self.state.get())
      .field("is_child", &self.is_child())
      .finish_non_exhaustive()
  }
}
