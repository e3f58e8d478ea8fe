//! Per-compile parameters: fresh module factories and the compilation
//! dependency set.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::resolver::{Resolver, ResolverFactory};
use crate::util::sync::lock;

/// Creates normal modules; holds the resolver factory and module rules.
#[derive(Debug)]
pub struct NormalModuleFactory {
  pub context: PathBuf,
  pub module_options: Value,
  resolver_factory: Arc<ResolverFactory>,
}

impl NormalModuleFactory {
  pub fn new(context: PathBuf, module_options: Value, resolver_factory: Arc<ResolverFactory>) -> Self {
    Self {
      context,
      module_options,
      resolver_factory,
    }
  }

  pub fn resolver(&self) -> Arc<Resolver> {
    let options = self.module_options.get("resolve").cloned().unwrap_or(Value::Null);
    self.resolver_factory.get("normal", &options)
  }

  pub fn resolver_factory(&self) -> &Arc<ResolverFactory> {
    &self.resolver_factory
  }
}

/// Creates context modules (directory requests).
#[derive(Debug)]
pub struct ContextModuleFactory {
  resolver_factory: Arc<ResolverFactory>,
}

impl ContextModuleFactory {
  pub fn new(resolver_factory: Arc<ResolverFactory>) -> Self {
    Self { resolver_factory }
  }

  pub fn resolver(&self) -> Arc<Resolver> {
    self.resolver_factory.get("context", &Value::Null)
  }

  pub fn resolver_factory(&self) -> &Arc<ResolverFactory> {
    &self.resolver_factory
  }
}

/// Parameters of one compile. Clones share the factories and the
/// dependency set.
#[derive(Debug, Clone)]
pub struct CompilationParams {
  pub normal_module_factory: Arc<NormalModuleFactory>,
  pub context_module_factory: Arc<ContextModuleFactory>,
  compilation_dependencies: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl CompilationParams {
  pub fn new(normal: Arc<NormalModuleFactory>, context: Arc<ContextModuleFactory>) -> Self {
    Self {
      normal_module_factory: normal,
      context_module_factory: context,
      compilation_dependencies: Arc::default(),
    }
  }

  /// Add a file the whole compilation depends on (config files and the
  /// like); watching treats it like any other file dependency.
  pub fn add_compilation_dependency(&self, path: impl AsRef<Path>) {
    lock(&self.compilation_dependencies).insert(path.as_ref().to_path_buf());
  }

  pub fn compilation_dependencies(&self) -> BTreeSet<PathBuf> {
    lock(&self.compilation_dependencies).clone()
  }

  /// The live set, for a compilation that must see later additions.
  pub(crate) fn shared_compilation_dependencies(&self) -> Arc<Mutex<BTreeSet<PathBuf>>> {
    Arc::clone(&self.compilation_dependencies)
  }
}
