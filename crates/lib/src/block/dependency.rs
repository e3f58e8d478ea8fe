//! The dependency contract and code generation templates.
//!
//! Concrete dependency kinds (imports, requires, context requests) live
//! outside the core; the block graph only needs them to hash themselves and
//! to release resolved state on disconnect.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::Result;
use crate::util::hash::HashAccumulator;

/// An edge from a block to another module in the module graph.
///
/// Dependencies are shared (`Arc`) between the block that declares them and
/// the module graph built from them; resolved state needs interior
/// mutability.
pub trait Dependency: fmt::Debug + Send + Sync + 'static {
  /// Stable name of the concrete kind, used to look up its template.
  fn kind(&self) -> &'static str;

  /// Feed everything that identifies this dependency into `hash`.
  fn update_hash(&self, hash: &mut dyn HashAccumulator);

  /// Release state resolved during a build. Called once per disconnect of
  /// the owning block, so it must tolerate repeated calls.
  fn disconnect(&self) {}

  fn as_any(&self) -> &dyn Any;
}

/// Rewrites a source region for one dependency kind.
pub trait DependencyTemplate: Send + Sync {
  fn apply(&self, dependency: &dyn Dependency, source: &mut ReplaceSource, templates: &DependencyTemplates) -> Result<()>;
}

/// Templates keyed by [`Dependency::kind`].
#[derive(Default, Clone)]
pub struct DependencyTemplates {
  templates: HashMap<&'static str, Arc<dyn DependencyTemplate>>,
}

impl DependencyTemplates {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, kind: &'static str, template: Arc<dyn DependencyTemplate>) {
    self.templates.insert(kind, template);
  }

  pub fn get(&self, kind: &str) -> Option<&Arc<dyn DependencyTemplate>> {
    self.templates.get(kind)
  }

  pub fn len(&self) -> usize {
    self.templates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.templates.is_empty()
  }
}

impl fmt::Debug for DependencyTemplates {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut kinds: Vec<_> = self.templates.keys().collect();
    kinds.sort();
    f.debug_struct("DependencyTemplates").field("kinds", &kinds).finish()
  }
}

#[derive(Debug, Clone)]
struct Replacement {
  start: usize,
  end: usize,
  content: String,
  seq: usize,
}

/// A source text with pending replacements over byte ranges of the original.
///
/// Replacements are applied when [`ReplaceSource::source`] is called, ordered
/// by start offset and then by insertion order. A replacement overlapping an
/// earlier one is clipped to the text that is still left.
#[derive(Debug, Clone, Default)]
pub struct ReplaceSource {
  original: String,
  replacements: Vec<Replacement>,
}

impl ReplaceSource {
  pub fn new(original: impl Into<String>) -> Self {
    Self {
      original: original.into(),
      replacements: Vec::new(),
    }
  }

  pub fn original(&self) -> &str {
    &self.original
  }

  /// Replace `range` of the original text with `content`.
  pub fn replace(&mut self, range: Range<usize>, content: impl Into<String>) {
    let start = self.floor_boundary(range.start);
    let end = self.floor_boundary(range.end.max(range.start));
    let seq = self.replacements.len();
    self.replacements.push(Replacement {
      start,
      end,
      content: content.into(),
      seq,
    });
  }

  /// Insert `content` before byte offset `pos`.
  pub fn insert(&mut self, pos: usize, content: impl Into<String>) {
    self.replace(pos..pos, content);
  }

  pub fn has_replacements(&self) -> bool {
    !self.replacements.is_empty()
  }

  /// Render the text with all replacements applied.
  pub fn source(&self) -> String {
    let mut ordered: Vec<&Replacement> = self.replacements.iter().collect();
    ordered.sort_by_key(|r| (r.start, r.seq));

    let mut out = String::with_capacity(self.original.len());
    let mut cursor = 0;
    for r in ordered {
      let start = r.start.max(cursor);
      out.push_str(&self.original[cursor..start]);
      out.push_str(&r.content);
      cursor = r.end.max(start);
    }
    out.push_str(&self.original[cursor..]);
    out
  }

  fn floor_boundary(&self, pos: usize) -> usize {
    let mut pos = pos.min(self.original.len());
    while !self.original.is_char_boundary(pos) {
      pos -= 1;
    }
    pos
  }
}
