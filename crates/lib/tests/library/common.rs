//! Shared helpers for library integration tests.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use wrapkit_lib::block::Dependency;
use wrapkit_lib::fs::MemoryFileSystem;
use wrapkit_lib::util::hash::HashAccumulator;
use wrapkit_lib::{Compiler, CompilerOptions, Environment, create_compiler};

/// A dependency on a plain request string.
#[derive(Debug)]
pub struct RequestDependency {
  pub request: String,
  disconnected: AtomicBool,
}

impl RequestDependency {
  pub fn shared(request: &str) -> Arc<dyn Dependency> {
    Arc::new(Self {
      request: request.to_string(),
      disconnected: AtomicBool::new(false),
    })
  }
}

impl Dependency for RequestDependency {
  fn kind(&self) -> &'static str {
    "request"
  }

  fn update_hash(&self, hash: &mut dyn HashAccumulator) {
    hash.update(&self.request);
  }

  fn disconnect(&self) {
    self.disconnected.store(true, Ordering::SeqCst);
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// A compiler over a fresh in-memory tree rooted at `/project`.
pub fn memory_compiler(configure: impl FnOnce(&mut CompilerOptions)) -> (Arc<Compiler>, MemoryFileSystem) {
  let mut options = CompilerOptions::new("/project");
  options.output.path = Some(PathBuf::from("/project/dist"));
  configure(&mut options);
  let fs = MemoryFileSystem::new();
  let compiler = create_compiler(options, Environment::memory(&fs), &[]).unwrap();
  (compiler, fs)
}
