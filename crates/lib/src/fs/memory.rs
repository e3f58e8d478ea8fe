use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::{FileKind, FileStat, FsFuture, InputFileSystem, OutputFileSystem};
use crate::util::now_millis;
use crate::util::sync::{read, write};

#[derive(Debug, Clone)]
struct MemoryFile {
  content: Vec<u8>,
  modified_ms: u64,
}

#[derive(Debug, Default)]
struct State {
  files: BTreeMap<PathBuf, MemoryFile>,
  dirs: BTreeSet<PathBuf>,
  writes: usize,
}

/// An in-memory file tree.
///
/// Clones share the same tree, so a test can keep a handle while the
/// compiler reads and writes through another. Directories are explicit:
/// writing a file into a directory that was never created fails with
/// `NotFound`, like the disk would.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
  state: Arc<RwLock<State>>,
  purges: Arc<AtomicUsize>,
}

impl MemoryFileSystem {
  pub fn new() -> Self {
    Self::default()
  }

  /// A tree pre-populated with files; their parent directories are created.
  pub fn with_files<I, P, C>(files: I) -> Self
  where
    I: IntoIterator<Item = (P, C)>,
    P: AsRef<Path>,
    C: Into<Vec<u8>>,
  {
    let fs = Self::new();
    for (path, content) in files {
      fs.put(path, content);
    }
    fs
  }

  /// Create or replace a file, creating its parents. The modification time
  /// always moves forward, even within the same millisecond.
  pub fn put(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
    let path = normalize(path.as_ref());
    let mut state = write(&self.state);
    if let Some(parent) = path.parent() {
      insert_ancestors(&mut state.dirs, parent);
    }
    let previous = state.files.get(&path).map(|f| f.modified_ms).unwrap_or(0);
    state.files.insert(
      path,
      MemoryFile {
        content: content.into(),
        modified_ms: now_millis().max(previous + 1),
      },
    );
  }

  pub fn remove(&self, path: impl AsRef<Path>) -> bool {
    write(&self.state).files.remove(&normalize(path.as_ref())).is_some()
  }

  pub fn read_to_string(&self, path: impl AsRef<Path>) -> Option<String> {
    read(&self.state)
      .files
      .get(&normalize(path.as_ref()))
      .map(|f| String::from_utf8_lossy(&f.content).into_owned())
  }

  pub fn exists(&self, path: impl AsRef<Path>) -> bool {
    let path = normalize(path.as_ref());
    let state = read(&self.state);
    state.files.contains_key(&path) || is_dir(&state, &path)
  }

  pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
    is_dir(&read(&self.state), &normalize(path.as_ref()))
  }

  /// Paths of all files, sorted.
  pub fn files(&self) -> Vec<PathBuf> {
    read(&self.state).files.keys().cloned().collect()
  }

  /// Number of `write_file` calls that reached the tree.
  pub fn write_count(&self) -> usize {
    read(&self.state).writes
  }

  pub fn purge_count(&self) -> usize {
    self.purges.load(Ordering::SeqCst)
  }

  fn stat_sync(&self, path: &Path) -> io::Result<FileStat> {
    let path = normalize(path);
    let state = read(&self.state);
    if let Some(file) = state.files.get(&path) {
      return Ok(FileStat {
        kind: FileKind::File,
        size: file.content.len() as u64,
        modified_ms: file.modified_ms,
      });
    }
    if is_dir(&state, &path) {
      return Ok(FileStat {
        kind: FileKind::Directory,
        size: 0,
        modified_ms: 0,
      });
    }
    Err(not_found(&path))
  }

  fn read_sync(&self, path: &Path) -> io::Result<Vec<u8>> {
    let path = normalize(path);
    read(&self.state)
      .files
      .get(&path)
      .map(|f| f.content.clone())
      .ok_or_else(|| not_found(&path))
  }

  fn mkdirp_sync(&self, path: &Path) -> io::Result<()> {
    let path = normalize(path);
    let mut state = write(&self.state);
    if let Some(file) = path.ancestors().find(|p| state.files.contains_key(*p)) {
      return Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{} is a file", file.display()),
      ));
    }
    insert_ancestors(&mut state.dirs, &path);
    Ok(())
  }

  fn write_sync(&self, path: &Path, data: Vec<u8>) -> io::Result<()> {
    let path = normalize(path);
    let mut state = write(&self.state);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      if !is_dir(&state, parent) {
        return Err(not_found(parent));
      }
    }
    if is_dir(&state, &path) {
      return Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{} is a directory", path.display()),
      ));
    }
    let previous = state.files.get(&path).map(|f| f.modified_ms).unwrap_or(0);
    state.files.insert(
      path,
      MemoryFile {
        content: data,
        modified_ms: now_millis().max(previous + 1),
      },
    );
    state.writes += 1;
    Ok(())
  }
}

impl InputFileSystem for MemoryFileSystem {
  fn stat<'a>(&'a self, path: &'a Path) -> FsFuture<'a, FileStat> {
    Box::pin(async move { self.stat_sync(path) })
  }

  fn read_file<'a>(&'a self, path: &'a Path) -> FsFuture<'a, Vec<u8>> {
    Box::pin(async move { self.read_sync(path) })
  }

  fn purge(&self) {
    self.purges.fetch_add(1, Ordering::SeqCst);
  }
}

impl OutputFileSystem for MemoryFileSystem {
  fn mkdirp<'a>(&'a self, path: &'a Path) -> FsFuture<'a, ()> {
    Box::pin(async move { self.mkdirp_sync(path) })
  }

  fn write_file<'a>(&'a self, path: &'a Path, data: Vec<u8>) -> FsFuture<'a, ()> {
    Box::pin(async move { self.write_sync(path, data) })
  }
}

/// Drop `.` components and resolve `..` lexically.
fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        out.pop();
      }
      other => out.push(other.as_os_str()),
    }
  }
  out
}

fn is_dir(state: &State, path: &Path) -> bool {
  path.parent().is_none() || state.dirs.contains(path)
}

fn insert_ancestors(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
  for ancestor in path.ancestors() {
    if ancestor.as_os_str().is_empty() || ancestor.parent().is_none() {
      continue;
    }
    dirs.insert(ancestor.to_path_buf());
  }
}

fn not_found(path: &Path) -> io::Error {
  io::Error::new(io::ErrorKind::NotFound, format!("no such file or directory: {}", path.display()))
}
