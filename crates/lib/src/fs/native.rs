use std::path::Path;

use tracing::trace;

use super::{FileKind, FileStat, FsFuture, InputFileSystem, OutputFileSystem};
use crate::util::unix_millis;

/// The local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFileSystem;

impl NativeFileSystem {
  pub fn new() -> Self {
    Self
  }
}

impl InputFileSystem for NativeFileSystem {
  fn stat<'a>(&'a self, path: &'a Path) -> FsFuture<'a, FileStat> {
    Box::pin(async move {
      let meta = tokio::fs::metadata(path).await?;
      let modified_ms = meta.modified().map(unix_millis).unwrap_or(0);
      Ok(FileStat {
        kind: if meta.is_dir() {
          FileKind::Directory
        } else {
          FileKind::File
        },
        size: meta.len(),
        modified_ms,
      })
    })
  }

  fn read_file<'a>(&'a self, path: &'a Path) -> FsFuture<'a, Vec<u8>> {
    Box::pin(tokio::fs::read(path))
  }
}

impl OutputFileSystem for NativeFileSystem {
  fn mkdirp<'a>(&'a self, path: &'a Path) -> FsFuture<'a, ()> {
    Box::pin(async move {
      trace!(path = %path.display(), "creating directory");
      tokio::fs::create_dir_all(path).await
    })
  }

  fn write_file<'a>(&'a self, path: &'a Path, data: Vec<u8>) -> FsFuture<'a, ()> {
    Box::pin(async move {
      trace!(path = %path.display(), bytes = data.len(), "writing file");
      tokio::fs::write(path, data).await
    })
  }
}
