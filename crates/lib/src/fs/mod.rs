//! Filesystem capabilities consumed by the compiler.
//!
//! The compiler never touches `std::fs` directly. It reads through an
//! [`InputFileSystem`] (records, watched files) and writes through an
//! [`OutputFileSystem`] (assets, records). Two implementations ship with the
//! crate:
//! - [`NativeFileSystem`]: the local disk through `tokio::fs`
//! - [`MemoryFileSystem`]: a shared in-memory tree for tests and embedding

mod memory;
mod native;

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::Serialize;

pub use memory::MemoryFileSystem;
pub use native::NativeFileSystem;

/// Future returned by filesystem capability calls.
pub type FsFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
  File,
  Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileStat {
  pub kind: FileKind,
  pub size: u64,
  /// Last modification, in milliseconds since the Unix epoch.
  pub modified_ms: u64,
}

impl FileStat {
  pub fn is_file(&self) -> bool {
    self.kind == FileKind::File
  }

  pub fn is_dir(&self) -> bool {
    self.kind == FileKind::Directory
  }
}

/// Read access. A missing path is reported as `io::ErrorKind::NotFound`.
pub trait InputFileSystem: Send + Sync {
  fn stat<'a>(&'a self, path: &'a Path) -> FsFuture<'a, FileStat>;

  fn read_file<'a>(&'a self, path: &'a Path) -> FsFuture<'a, Vec<u8>>;

  /// Drop cached state so the next read sees the current content.
  fn purge(&self) {}
}

/// Write access. `mkdirp` succeeds when the directory already exists.
pub trait OutputFileSystem: Send + Sync {
  fn join(&self, base: &Path, relative: &str) -> PathBuf {
    base.join(relative)
  }

  fn mkdirp<'a>(&'a self, path: &'a Path) -> FsFuture<'a, ()>;

  fn write_file<'a>(&'a self, path: &'a Path, data: Vec<u8>) -> FsFuture<'a, ()>;
}
