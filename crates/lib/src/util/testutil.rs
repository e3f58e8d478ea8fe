//! Test helpers for wrapkit-lib.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::block::Dependency;
use crate::util::hash::HashAccumulator;

/// A dependency that hashes its request and records disconnects.
#[derive(Debug)]
pub struct TestDependency {
  pub request: String,
  disconnected: AtomicBool,
}

impl TestDependency {
  pub const KIND: &'static str = "test";

  pub fn new(request: impl Into<String>) -> Self {
    Self {
      request: request.into(),
      disconnected: AtomicBool::new(false),
    }
  }

  pub fn shared(request: impl Into<String>) -> Arc<dyn Dependency> {
    Arc::new(Self::new(request))
  }

  pub fn is_disconnected(&self) -> bool {
    self.disconnected.load(Ordering::SeqCst)
  }
}

impl Dependency for TestDependency {
  fn kind(&self) -> &'static str {
    Self::KIND
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
