//! Context-relative identifiers.
//!
//! Child compilers key their records slot by the name they were created with,
//! rewritten relative to the compiler context so records stay portable.

use std::path::{Component, Path};

/// Rewrite absolute paths in `identifier` relative to `context`.
///
/// The identifier is split on `!`, `|` and spaces (loader chains and
/// multi-requests); every absolute part becomes `./rel` or `../rel` with
/// forward slashes. Other parts and the delimiters are kept as is.
pub fn make_paths_relative(context: &Path, identifier: &str) -> String {
  let mut out = String::with_capacity(identifier.len());
  let mut part = String::new();
  for c in identifier.chars() {
    if matches!(c, '!' | '|' | ' ') {
      out.push_str(&relative_part(context, &part));
      part.clear();
      out.push(c);
    } else {
      part.push(c);
    }
  }
  out.push_str(&relative_part(context, &part));
  out
}

fn relative_part(context: &Path, part: &str) -> String {
  let path = Path::new(part);
  if part.is_empty() || !path.is_absolute() {
    return part.to_string();
  }
  let rel = relative_to(context, path);
  if rel.starts_with("../") || rel == ".." {
    rel
  } else if rel.is_empty() {
    ".".to_string()
  } else {
    format!("./{}", rel)
  }
}

fn relative_to(base: &Path, target: &Path) -> String {
  let base: Vec<Component<'_>> = base.components().collect();
  let target: Vec<Component<'_>> = target.components().collect();
  let common = base.iter().zip(&target).take_while(|(a, b)| a == b).count();

  let mut segments: Vec<String> = Vec::new();
  for _ in common..base.len() {
    segments.push("..".to_string());
  }
  for component in &target[common..] {
    segments.push(component.as_os_str().to_string_lossy().into_owned());
  }
  segments.join("/")
}
