//! Resolver factory handed to module factories.
//!
//! Resolution itself lives outside the core. The factory only hands out one
//! shared resolver per (type, options) pair so that parent and child
//! compilers reuse the same instances.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::trace;

use crate::util::sync::lock;

/// An opaque resolver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolver {
  pub kind: String,
  pub options: Value,
}

#[derive(Debug, Default)]
pub struct ResolverFactory {
  cache: Mutex<HashMap<String, Arc<Resolver>>>,
}

impl ResolverFactory {
  pub fn new() -> Self {
    Self::default()
  }

  /// The shared resolver for `kind` with `options`.
  pub fn get(&self, kind: &str, options: &Value) -> Arc<Resolver> {
    let key = format!("{}|{}", kind, options);
    let mut cache = lock(&self.cache);
    Arc::clone(cache.entry(key).or_insert_with(|| {
      trace!(kind, "creating resolver");
      Arc::new(Resolver {
        kind: kind.to_string(),
        options: options.clone(),
      })
    }))
  }

  pub fn len(&self) -> usize {
    lock(&self.cache).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
