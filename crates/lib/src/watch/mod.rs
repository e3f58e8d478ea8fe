//! Watch mode.
//!
//! [`Compiler::watch`](crate::compiler::Compiler::watch) rebuilds whenever a
//! [`FileWatcher`] reports changes to the files and directories the last
//! compilation depended on. The watcher is a collaborator like the
//! filesystems: [`PollingWatcher`] polls modification times through an
//! [`InputFileSystem`](crate::fs::InputFileSystem), and embedders can plug in
//! a native one.

mod polling;
mod watching;

use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::Result;
use crate::compiler::WatchOptions;
use crate::timestamps::TimestampMap;

pub use polling::PollingWatcher;
pub use watching::{WatchHandler, Watching};

pub type WatchFuture<'a> = Pin<Box<dyn Future<Output = Result<WatchChanges>> + Send + 'a>>;

/// What to watch after a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchRequest {
  pub files: BTreeSet<PathBuf>,
  pub contexts: BTreeSet<PathBuf>,
  /// When the build that produced these dependencies started. Anything
  /// modified later counts as changed.
  pub start_time: u64,
}

/// A batch of changes, collected over the aggregate timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchChanges {
  /// Paths that appeared or were modified.
  pub changed: Vec<PathBuf>,
  pub removed: Vec<PathBuf>,
  /// Current modification times of the watched files.
  pub file_timestamps: TimestampMap,
  /// Current modification times of the watched directories.
  pub context_timestamps: TimestampMap,
}

impl WatchChanges {
  pub fn is_empty(&self) -> bool {
    self.changed.is_empty() && self.removed.is_empty()
  }

  /// The path reported to the `invalid` hook.
  pub fn first_path(&self) -> Option<&PathBuf> {
    self.changed.first().or_else(|| self.removed.first())
  }
}

/// Reports changes to a set of paths.
pub trait FileWatcher: Send + Sync {
  /// Resolve with the first non-empty batch of changes under `request`.
  fn wait<'a>(&'a self, request: &'a WatchRequest, options: &'a WatchOptions) -> WatchFuture<'a>;
}
