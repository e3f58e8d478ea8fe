//! Child compilers: isolated sub-builds sharing the parent's resources.

use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::state::StateCell;
use super::{Compiler, CompilerHooks, CompilerOptions};
use crate::compilation::{Chunk, ChildCompilerEvent, Compilation};
use crate::plugin::Plugin;
use crate::util::identifier::make_paths_relative;
use crate::util::sync::read;
use crate::{CompilerError, Result};

impl Compiler {
  /// Create a compiler for a sub-build of `compilation`.
  ///
  /// The child shares this compiler's context, input filesystem, resolver
  /// factory and timestamps, and has no output filesystem. Its records are
  /// the slot `[name relative to context][index]` of this compiler's records.
  /// `plugins` are applied first; then every hook outside the parent-only
  /// phases takes over this compiler's taps. `output_overrides` are layered
  /// on a copy of the output options.
  pub fn create_child_compiler(
    &self,
    compilation: &Arc<Compilation>,
    name: &str,
    index: usize,
    output_overrides: &Map<String, Value>,
    plugins: &[Arc<dyn Plugin>],
  ) -> Result<Arc<Compiler>> {
    let options = CompilerOptions {
      name: Some(name.to_string()),
      output: self.options.output.with_overrides(output_overrides)?,
      records_path: None,
      records_input_path: None,
      records_output_path: None,
      ..self.options.clone()
    };
    let relative_name = make_paths_relative(&self.context, name);

    let child = Compiler {
      name: Some(name.to_string()),
      context: self.context.clone(),
      options,
      output_path: self.output_path.clone(),
      records_input_path: None,
      records_output_path: None,
      input_file_system: RwLock::new(read(&self.input_file_system).clone()),
      output_file_system: RwLock::new(None),
      watch_file_system: RwLock::new(read(&self.watch_file_system).clone()),
      resolver_factory: Arc::clone(&self.resolver_factory),
      records: self.records.child_slot(&relative_name, index),
      timestamps: self.timestamps.clone(),
      state: StateCell::default(),
      parent_compilation: Some(Arc::downgrade(compilation)),
      hooks: CompilerHooks::default(),
    };

    for plugin in plugins {
      debug!(compiler = name, plugin = plugin.name(), "applying plugin");
      plugin.apply(&child)?;
    }
    child.hooks.inherit_from(&self.hooks);

    let child = Arc::new(child);
    compilation.hooks.child_compiler.call(&ChildCompilerEvent {
      compiler: Arc::clone(&child),
      name: name.to_string(),
      index,
    })?;
    debug!(compiler = name, index, records = %relative_name, "child compiler created");
    Ok(child)
  }

  /// Compile as part of the parent compilation.
  ///
  /// Nothing is emitted and no records are read or written. The child's
  /// assets are merged into the parent's (later children win on name
  /// clashes) and the child compilation joins the parent's children.
  /// Returns the chunks of every entrypoint together with the compilation.
  pub async fn run_as_child(self: &Arc<Self>) -> Result<(Vec<Chunk>, Arc<Compilation>)> {
    let parent = self
      .parent_compilation()
      .ok_or_else(|| CompilerError::NotAChild(self.name.clone()))?;

    let compilation = match self.compile().await {
      Ok(compilation) => compilation,
      Err(err) => {
        self.report_failure(&err);
        return Err(err);
      }
    };

    parent.push_child(Arc::clone(&compilation));
    parent.merge_assets(compilation.assets());
    let entries = compilation.entrypoint_chunks();
    info!(compiler = %self.label(), chunks = entries.len(), "child compilation finished");
    Ok((entries, compilation))
  }
}
