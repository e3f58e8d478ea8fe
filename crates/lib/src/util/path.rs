//! Path string helpers for output targets.
//!
//! Output targets are produced by template substitution and may use either
//! separator, so these work on strings rather than `Path`.

/// Directory portion of `path`, split at the last `/` or `\`.
///
/// Returns `None` when there is no separator or the directory part is empty
/// (a file directly under the root, like `/records.json`).
pub fn parent_dir_of(path: &str) -> Option<&str> {
  let idx = path.rfind(['/', '\\'])?;
  let dir = &path[..idx];
  if dir.is_empty() { None } else { Some(dir) }
}

/// Drop a `?query` suffix from an asset name.
pub fn strip_query(name: &str) -> &str {
  match name.find('?') {
    Some(idx) => &name[..idx],
    None => name,
  }
}
