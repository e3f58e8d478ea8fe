//! Plugins extend the compiler by tapping its hooks.

use std::fmt;
use std::sync::Arc;

use crate::Result;
use crate::compiler::Compiler;

pub trait Plugin: Send + Sync {
  fn name(&self) -> &str;

  /// Register taps on `compiler`. Called once per compiler instance.
  fn apply(&self, compiler: &Compiler) -> Result<()>;
}

/// A plugin built from a closure.
pub struct FnPlugin<F> {
  name: String,
  apply: F,
}

impl<F> Plugin for FnPlugin<F>
where
  F: Fn(&Compiler) -> Result<()> + Send + Sync,
{
  fn name(&self) -> &str {
    &self.name
  }

  fn apply(&self, compiler: &Compiler) -> Result<()> {
    (self.apply)(compiler)
  }
}

impl<F> fmt::Debug for FnPlugin<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FnPlugin").field("name", &self.name).finish()
  }
}

/// Wrap `apply` as a named plugin.
pub fn plugin_fn<F>(name: impl Into<String>, apply: F) -> Arc<dyn Plugin>
where
  F: Fn(&Compiler) -> Result<()> + Send + Sync + 'static,
{
  Arc::new(FnPlugin {
    name: name.into(),
    apply,
  })
}
