//! Source locations of dependencies and split points.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
  pub line: u32,
  pub column: u32,
}

impl Position {
  pub fn new(line: u32, column: u32) -> Self {
    Self { line, column }
  }
}

/// A span in a module's source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
  pub start: Position,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end: Option<Position>,
  /// Position among dependencies sharing the same span.
  #[serde(default)]
  pub index: u32,
}

/// Where a dependency or block came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyLocation {
  Source(SourceLocation),
  /// A name for dependencies that do not come from source text, such as
  /// entry points.
  Synthetic(String),
}

impl DependencyLocation {
  pub fn at(line: u32, column: u32) -> Self {
    DependencyLocation::Source(SourceLocation {
      start: Position::new(line, column),
      end: None,
      index: 0,
    })
  }

  pub fn synthetic(name: impl Into<String>) -> Self {
    DependencyLocation::Synthetic(name.into())
  }
}

impl fmt::Display for DependencyLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DependencyLocation::Synthetic(name) => f.write_str(name),
      DependencyLocation::Source(loc) => {
        write!(f, "{}:{}", loc.start.line, loc.start.column)?;
        if let Some(end) = loc.end {
          if end.line == loc.start.line {
            write!(f, "-{}", end.column)?;
          } else {
            write!(f, "-{}:{}", end.line, end.column)?;
          }
        }
        Ok(())
      }
    }
  }
}

/// Total order over locations: source spans first (by start line, start
/// column, then index), synthetic names after them, ordered lexically.
pub fn compare_locations(a: &DependencyLocation, b: &DependencyLocation) -> Ordering {
  match (a, b) {
    (DependencyLocation::Synthetic(a), DependencyLocation::Synthetic(b)) => a.cmp(b),
    (DependencyLocation::Source(_), DependencyLocation::Synthetic(_)) => Ordering::Less,
    (DependencyLocation::Synthetic(_), DependencyLocation::Source(_)) => Ordering::Greater,
    (DependencyLocation::Source(a), DependencyLocation::Source(b)) => a
      .start
      .line
      .cmp(&b.start.line)
      .then(a.start.column.cmp(&b.start.column))
      .then(a.index.cmp(&b.index)),
  }
}
