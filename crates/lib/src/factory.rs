//! Building a configured compiler.

use std::sync::Arc;

use tracing::debug;

use crate::Result;
use crate::compiler::{Compiler, CompilerOptions, EntryOption};
use crate::fs::{InputFileSystem, MemoryFileSystem, NativeFileSystem, OutputFileSystem};
use crate::plugin::Plugin;
use crate::watch::FileWatcher;

/// The filesystems a compiler runs against.
#[derive(Clone)]
pub struct Environment {
  pub input_file_system: Arc<dyn InputFileSystem>,
  pub output_file_system: Option<Arc<dyn OutputFileSystem>>,
  /// Falls back to polling the input filesystem when unset.
  pub watch_file_system: Option<Arc<dyn FileWatcher>>,
}

impl Environment {
  /// The local disk for reading and writing.
  pub fn native() -> Self {
    let fs = Arc::new(NativeFileSystem::new());
    Self {
      input_file_system: fs.clone(),
      output_file_system: Some(fs),
      watch_file_system: None,
    }
  }

  /// One in-memory tree for reading and writing.
  pub fn memory(fs: &MemoryFileSystem) -> Self {
    Self {
      input_file_system: Arc::new(fs.clone()),
      output_file_system: Some(Arc::new(fs.clone())),
      watch_file_system: None,
    }
  }
}

/// Create a compiler from `options`, wire `environment` into it and apply
/// `plugins`.
///
/// Hooks fire in this order: `environment`, `after_environment`,
/// `entry_option` (a tap answering `Some` claims the entries), then
/// `after_plugins` and `after_resolvers`.
pub fn create_compiler(
  options: CompilerOptions,
  environment: Environment,
  plugins: &[Arc<dyn Plugin>],
) -> Result<Arc<Compiler>> {
  let compiler = Compiler::new(options);
  compiler.set_input_file_system(environment.input_file_system);
  compiler.set_output_file_system(environment.output_file_system);
  if let Some(watcher) = environment.watch_file_system {
    compiler.set_watch_file_system(watcher);
  }

  for plugin in plugins {
    debug!(plugin = plugin.name(), "applying plugin");
    plugin.apply(&compiler)?;
  }

  compiler.hooks.environment.call(&())?;
  compiler.hooks.after_environment.call(&())?;

  let entry = EntryOption {
    context: compiler.context().to_path_buf(),
    entry: compiler.options().entry.clone(),
  };
  let claimed = compiler.hooks.entry_option.call(&entry)?;
  debug!(entries = entry.entry.len(), claimed = claimed.is_some(), "entry options processed");

  compiler.hooks.after_plugins.call(&())?;
  compiler.hooks.after_resolvers.call(&())?;
  Ok(Arc::new(compiler))
}
