//! The dependency block graph.
//!
//! A [`DependenciesBlock`] is one scope of a module's source: the
//! dependencies it references, the split points nested in it and the
//! variables it declares. The hash of a block always combines its parts in
//! the order dependencies, child blocks, variables. That order is part of the
//! output identity and must not change.

pub mod async_block;
pub mod dependency;
pub mod location;
pub mod variable;

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::compilation::chunk::ChunkGraph;
use crate::util::hash::HashAccumulator;

pub use async_block::{AsyncDependenciesBlock, GroupOptions};
pub use dependency::{Dependency, DependencyTemplate, DependencyTemplates, ReplaceSource};
pub use location::{DependencyLocation, Position, SourceLocation, compare_locations};
pub use variable::BlockVariable;

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a block, used for parent back-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
  fn next() -> Self {
    BlockId(NEXT_BLOCK_ID.fetch_add(1, AtomicOrdering::Relaxed))
  }
}

#[derive(Debug)]
pub struct DependenciesBlock {
  id: BlockId,
  parent: Option<BlockId>,
  dependencies: Vec<Arc<dyn Dependency>>,
  blocks: Vec<AsyncDependenciesBlock>,
  variables: Vec<BlockVariable>,
}

impl Default for DependenciesBlock {
  fn default() -> Self {
    Self::new()
  }
}

impl DependenciesBlock {
  pub fn new() -> Self {
    Self {
      id: BlockId::next(),
      parent: None,
      dependencies: Vec::new(),
      blocks: Vec::new(),
      variables: Vec::new(),
    }
  }

  pub fn id(&self) -> BlockId {
    self.id
  }

  /// The block this one was added to, if any.
  pub fn parent(&self) -> Option<BlockId> {
    self.parent
  }

  pub fn dependencies(&self) -> &[Arc<dyn Dependency>] {
    &self.dependencies
  }

  pub fn blocks(&self) -> &[AsyncDependenciesBlock] {
    &self.blocks
  }

  pub fn blocks_mut(&mut self) -> &mut [AsyncDependenciesBlock] {
    &mut self.blocks
  }

  pub fn variables(&self) -> &[BlockVariable] {
    &self.variables
  }

  pub fn add_dependency(&mut self, dependency: Arc<dyn Dependency>) {
    self.dependencies.push(dependency);
  }

  /// Remove `dependency` by identity. Returns false if this block does not
  /// hold it.
  pub fn remove_dependency(&mut self, dependency: &Arc<dyn Dependency>) -> bool {
    match self.dependencies.iter().position(|d| Arc::ptr_eq(d, dependency)) {
      Some(idx) => {
        self.dependencies.remove(idx);
        true
      }
      None => false,
    }
  }

  /// Take ownership of `block` and point its parent at this block.
  pub fn add_block(&mut self, mut block: AsyncDependenciesBlock) {
    block.parent = Some(self.id);
    self.blocks.push(block);
  }

  /// Declare a variable. A second declaration with the same name and
  /// expression is ignored; returns whether the variable was added.
  pub fn add_variable(
    &mut self,
    name: impl Into<String>,
    expression: impl Into<String>,
    dependencies: Vec<Arc<dyn Dependency>>,
  ) -> bool {
    let name = name.into();
    let expression = expression.into();
    if self
      .variables
      .iter()
      .any(|v| v.name == name && v.expression == expression)
    {
      return false;
    }
    self.variables.push(BlockVariable::new(name, expression, dependencies));
    true
  }

  pub fn update_hash(&self, hash: &mut dyn HashAccumulator, graph: &ChunkGraph) {
    for dep in &self.dependencies {
      dep.update_hash(hash);
    }
    for block in &self.blocks {
      block.update_hash(hash, graph);
    }
    for variable in &self.variables {
      variable.update_hash(hash);
    }
  }

  pub fn disconnect(&mut self) {
    for dep in &self.dependencies {
      dep.disconnect();
    }
    for block in &mut self.blocks {
      block.disconnect();
    }
    for variable in &mut self.variables {
      variable.disconnect();
    }
  }

  /// Clear state tied to one build's output. Dependencies and variables
  /// are kept.
  pub fn unseal(&mut self) {
    for block in &mut self.blocks {
      block.unseal();
    }
  }

  /// True if this block or any descendant references a dependency.
  pub fn has_dependencies(&self) -> bool {
    !self.dependencies.is_empty()
      || self.blocks.iter().any(|b| b.has_dependencies())
      || self.variables.iter().any(|v| v.has_dependencies())
  }

  /// True if any dependency in this block or its descendants matches.
  pub fn has_dependencies_where(&self, filter: &dyn Fn(&dyn Dependency) -> bool) -> bool {
    self.dependencies.iter().any(|d| filter(d.as_ref()))
      || self.blocks.iter().any(|b| b.has_dependencies_where(filter))
      || self.variables.iter().any(|v| v.has_dependencies_where(filter))
  }

  /// Order child blocks by source location, recursively. Blocks without a
  /// location keep their relative order after all located ones.
  pub fn sort_items(&mut self) {
    self.blocks.sort_by(|a, b| match (&a.loc, &b.loc) {
      (Some(a), Some(b)) => compare_locations(a, b),
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => Ordering::Equal,
    });
    for block in &mut self.blocks {
      block.sort_items();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::hash::{DigestEncoding, create_hash};
  use crate::util::testutil::TestDependency;

  fn digest(block: &DependenciesBlock) -> String {
    let mut hash = create_hash("debug").unwrap();
    block.update_hash(hash.as_mut(), &ChunkGraph::default());
    hash.digest(DigestEncoding::Hex)
  }

  fn lazy(name: &str) -> AsyncDependenciesBlock {
    let mut block = AsyncDependenciesBlock::new(name, "./index.js", None, None);
    block.add_dependency(TestDependency::shared(name));
    block
  }

  #[test]
  fn empty_block_has_no_dependencies() {
    let block = DependenciesBlock::new();
    assert!(!block.has_dependencies());
    assert!(!block.has_dependencies_where(&|_| true));
  }

  #[test]
  fn nested_dependencies_are_found() {
    let mut block = DependenciesBlock::new();
    block.add_block(lazy("./lazy"));
    assert!(block.has_dependencies());
    assert!(block.has_dependencies_where(&|d| d.kind() == TestDependency::KIND));
    assert!(!block.has_dependencies_where(&|_| false));
  }

  #[test]
  fn variable_dependencies_count() {
    let mut block = DependenciesBlock::new();
    block.add_variable("module", "require('module')", vec![TestDependency::shared("module")]);
    assert!(block.has_dependencies());
  }

  #[test]
  fn duplicate_variable_is_ignored() {
    let mut block = DependenciesBlock::new();
    assert!(block.add_variable("process", "require('process')", Vec::new()));
    assert!(!block.add_variable("process", "require('process')", vec![TestDependency::shared("x")]));
    assert!(block.add_variable("process", "require('process/browser')", Vec::new()));
    assert_eq!(block.variables().len(), 2);
  }

  #[test]
  fn add_block_sets_parent() {
    let mut block = DependenciesBlock::new();
    block.add_block(lazy("./a"));
    assert_eq!(block.blocks()[0].parent(), Some(block.id()));
  }

  #[test]
  fn remove_dependency_by_identity() {
    let mut block = DependenciesBlock::new();
    block.add_dependency(TestDependency::shared("./a"));
    block.add_dependency(TestDependency::shared("./a"));

    let second = Arc::clone(&block.dependencies()[1]);
    assert!(block.remove_dependency(&second));
    assert_eq!(block.dependencies().len(), 1);
    assert!(!Arc::ptr_eq(&block.dependencies()[0], &second));

    assert!(!block.remove_dependency(&second));
    let stranger = TestDependency::shared("./a");
    assert!(!block.remove_dependency(&stranger));
    assert_eq!(block.dependencies().len(), 1);
  }

  #[test]
  fn hash_order_is_dependencies_blocks_variables() {
    let mut block = DependenciesBlock::new();
    block.add_variable("v", "expr", Vec::new());
    block.add_block(AsyncDependenciesBlock::new(GroupOptions::default(), "m", None, None));
    block.add_dependency(TestDependency::shared("dep"));
    assert_eq!(digest(&block), "dep7b7dvexpr");
  }

  #[test]
  fn permuting_child_blocks_changes_hash() {
    let mut first = DependenciesBlock::new();
    first.add_block(lazy("./a"));
    first.add_block(lazy("./b"));

    let mut second = DependenciesBlock::new();
    second.add_block(lazy("./b"));
    second.add_block(lazy("./a"));

    assert_ne!(digest(&first), digest(&second));
  }

  #[test]
  fn hash_is_pure() {
    let build = || {
      let mut block = DependenciesBlock::new();
      block.add_dependency(TestDependency::shared("./x"));
      block.add_block(lazy("./a"));
      block.add_variable("v", "e", vec![TestDependency::shared("./y")]);
      block
    };
    assert_eq!(digest(&build()), digest(&build()));
  }

  #[test]
  fn disconnect_reaches_all_dependencies() {
    let mut block = DependenciesBlock::new();
    block.add_dependency(TestDependency::shared("./x"));
    block.add_block(lazy("./a"));
    block.add_variable("v", "e", vec![TestDependency::shared("./y")]);

    block.disconnect();
    block.disconnect();

    let all_disconnected = |block: &DependenciesBlock| {
      !block.has_dependencies_where(&|d| {
        d.as_any()
          .downcast_ref::<TestDependency>()
          .is_some_and(|t| !t.is_disconnected())
      })
    };
    assert!(all_disconnected(&block));
    assert!(block.has_dependencies());
  }

  #[test]
  fn sort_items_orders_by_location() {
    let located = |name: &str, loc: Option<DependencyLocation>| AsyncDependenciesBlock::new(name, "m", loc, None);

    let mut block = DependenciesBlock::new();
    block.add_block(located("none", None));
    block.add_block(located("entry", Some(DependencyLocation::synthetic("entry"))));
    block.add_block(located("late", Some(DependencyLocation::at(20, 1))));
    block.add_block(located("early", Some(DependencyLocation::at(3, 9))));
    block.sort_items();

    let names: Vec<_> = block.blocks().iter().map(|b| b.chunk_name().unwrap_or("")).collect();
    assert_eq!(names, ["early", "late", "entry", "none"]);
  }
}
