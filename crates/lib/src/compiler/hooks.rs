//! The compiler's event slots.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::Compiler;
use crate::CompilerError;
use crate::compilation::{Compilation, CompilationParams, ContextModuleFactory, NormalModuleFactory, Stats};
use crate::consts::CHILD_EXCLUDED_HOOKS;
use crate::hooks::{AsyncParallelHook, AsyncSeriesHook, HookInfo, SyncBailHook, SyncHook};

/// Payload of `this_compilation` and `compilation`.
#[derive(Clone)]
pub struct CompilationEvent {
  pub compilation: Arc<Compilation>,
  pub params: CompilationParams,
}

/// Payload of `invalid`: the changed file, if known, and when it changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
  pub file: Option<PathBuf>,
  pub changed_at: u64,
}

/// Payload of `entry_option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOption {
  pub context: PathBuf,
  pub entry: BTreeMap<String, Vec<String>>,
}

macro_rules! compiler_hooks {
  ($( $(#[$doc:meta])* $field:ident: $ty:ty, )*) => {
    pub struct CompilerHooks {
      $( $(#[$doc])* pub $field: $ty, )*
    }

    impl Default for CompilerHooks {
      fn default() -> Self {
        Self {
          $( $field: <$ty>::new(stringify!($field)), )*
        }
      }
    }

    impl CompilerHooks {
      /// Every slot name, in declaration order.
      pub fn names() -> &'static [&'static str] {
        &[$( stringify!($field) ),*]
      }

      /// Look a slot up by its snake_case name.
      pub fn get(&self, name: &str) -> Option<&dyn HookInfo> {
        match name {
          $( stringify!($field) => Some(&self.$field), )*
          _ => None,
        }
      }

      /// Replace this compiler's taps with the parent's, except on the
      /// parent-only phases in [`CHILD_EXCLUDED_HOOKS`], which keep their
      /// own taps.
      pub fn inherit_from(&self, parent: &CompilerHooks) {
        $(
          if !CHILD_EXCLUDED_HOOKS.contains(&stringify!($field)) {
            self.$field.copy_taps_from(&parent.$field);
          }
        )*
      }
    }
  };
}

compiler_hooks! {
  /// Any tap answering `false` skips emission.
  should_emit: SyncBailHook<Arc<Compilation>, bool>,
  done: AsyncSeriesHook<Stats>,
  additional_pass: AsyncSeriesHook<()>,
  before_run: AsyncSeriesHook<Arc<Compiler>>,
  run: AsyncSeriesHook<Arc<Compiler>>,
  emit: AsyncSeriesHook<Arc<Compilation>>,
  after_emit: AsyncSeriesHook<Arc<Compilation>>,
  this_compilation: SyncHook<CompilationEvent>,
  compilation: SyncHook<CompilationEvent>,
  normal_module_factory: SyncHook<Arc<NormalModuleFactory>>,
  context_module_factory: SyncHook<Arc<ContextModuleFactory>>,
  before_compile: AsyncSeriesHook<CompilationParams>,
  compile: SyncHook<CompilationParams>,
  /// Builds the module graph; taps run concurrently.
  make: AsyncParallelHook<Arc<Compilation>>,
  after_compile: AsyncSeriesHook<Arc<Compilation>>,
  watch_run: AsyncSeriesHook<Arc<Compiler>>,
  failed: SyncHook<CompilerError>,
  invalid: SyncHook<Invalidation>,
  watch_close: SyncHook<()>,
  environment: SyncHook<()>,
  after_environment: SyncHook<()>,
  after_plugins: SyncHook<()>,
  after_resolvers: SyncHook<()>,
  entry_option: SyncBailHook<EntryOption, bool>,
}

impl fmt::Debug for CompilerHooks {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut map = f.debug_map();
    for name in Self::names() {
      if let Some(hook) = self.get(name) {
        map.entry(name, &hook.tap_names());
      }
    }
    map.finish()
  }
}
