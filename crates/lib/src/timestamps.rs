//! File and context modification times used for change detection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::util::sync::{read, write};

pub type TimestampMap = HashMap<PathBuf, u64>;

/// Two shared maps: per-file and per-directory modification times.
///
/// Cloning shares the maps. A parent compiler hands clones to its children;
/// only the parent starts a fresh pair when watching begins.
#[derive(Debug, Clone, Default)]
pub struct Timestamps {
  files: Arc<RwLock<TimestampMap>>,
  contexts: Arc<RwLock<TimestampMap>>,
}

impl Timestamps {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn file(&self, path: &Path) -> Option<u64> {
    read(&self.files).get(path).copied()
  }

  pub fn context(&self, path: &Path) -> Option<u64> {
    read(&self.contexts).get(path).copied()
  }

  pub fn files(&self) -> TimestampMap {
    read(&self.files).clone()
  }

  pub fn contexts(&self) -> TimestampMap {
    read(&self.contexts).clone()
  }

  /// Replace the contents of both maps, keeping them shared.
  pub fn replace(&self, files: TimestampMap, contexts: TimestampMap) {
    *write(&self.files) = files;
    *write(&self.contexts) = contexts;
  }

  pub fn set_file(&self, path: impl Into<PathBuf>, time: u64) {
    write(&self.files).insert(path.into(), time);
  }

  pub fn shares_with(&self, other: &Timestamps) -> bool {
    Arc::ptr_eq(&self.files, &other.files) && Arc::ptr_eq(&self.contexts, &other.contexts)
  }
}
