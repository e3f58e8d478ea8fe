use wrapkit_lib::CompilerError;
use wrapkit_lib::block::{AsyncDependenciesBlock, DependenciesBlock, GroupOptions};
use wrapkit_lib::compilation::{Chunk, ChunkGraph};
use wrapkit_lib::util::hash::{DigestEncoding, create_hash};

use super::common::RequestDependency;

fn digest(block: &DependenciesBlock, graph: &ChunkGraph) -> String {
  let mut hash = create_hash("sha256").unwrap();
  block.update_hash(hash.as_mut(), graph);
  hash.digest(DigestEncoding::Hex)
}

fn split_point(name: &str, request: &str) -> AsyncDependenciesBlock {
  let mut block = AsyncDependenciesBlock::new(GroupOptions::named(name), "./index.js", None, None);
  block.add_dependency(RequestDependency::shared(request));
  block
}

#[test]
fn child_block_order_changes_the_digest() {
  let graph = ChunkGraph::default();

  let mut forward = DependenciesBlock::new();
  forward.add_block(split_point("a", "./a"));
  forward.add_block(split_point("b", "./b"));

  let mut reversed = DependenciesBlock::new();
  reversed.add_block(split_point("b", "./b"));
  reversed.add_block(split_point("a", "./a"));

  assert_ne!(digest(&forward, &graph), digest(&reversed, &graph));
  assert_eq!(digest(&forward, &graph), digest(&forward, &graph));
}

#[test]
fn has_dependencies_looks_through_descendants() {
  let empty = DependenciesBlock::new();
  assert!(!empty.has_dependencies());

  let mut root = DependenciesBlock::new();
  let mut outer = AsyncDependenciesBlock::new(GroupOptions::default(), "./index.js", None, None);
  outer.add_block(split_point("inner", "./deep"));
  root.add_block(outer);

  assert!(root.has_dependencies());
  assert!(root.has_dependencies_where(&|dep| dep.kind() == "request"));
  assert!(!root.has_dependencies_where(&|dep| dep.kind() == "harmony"));
}

#[test]
fn duplicate_variables_are_ignored() {
  let mut block = DependenciesBlock::new();
  assert!(block.add_variable("process", "require('process')", vec![RequestDependency::shared("process")]));
  assert!(!block.add_variable("process", "require('process')", Vec::new()));
  assert!(block.add_variable("process", "globalThis.process", Vec::new()));
  assert_eq!(block.variables().len(), 2);
}

#[test]
#[allow(deprecated)]
fn legacy_chunk_accessors_always_fail() {
  let mut graph = ChunkGraph::default();
  let group = graph.add_group(GroupOptions::named("lazy"));
  graph.add_chunk(group, Chunk::with_id("lazy", "1"));

  let mut block = split_point("lazy", "./lazy");
  assert!(matches!(block.chunks(), Err(CompilerError::LegacyApi { .. })));
  block.set_chunk_group(Some(group));
  assert!(matches!(block.chunks(), Err(CompilerError::LegacyApi { .. })));

  let err = block.set_chunks(Vec::new()).unwrap_err();
  assert!(err.to_string().contains("chunk_group"));
}

#[test]
fn same_options_different_chunk_ids_hash_differently() {
  let mut graph = ChunkGraph::default();
  let first = graph.add_group(GroupOptions::named("lazy"));
  graph.add_chunk(first, Chunk::with_id("lazy", "1"));
  let second = graph.add_group(GroupOptions::named("lazy"));
  graph.add_chunk(second, Chunk::with_id("lazy", "2"));

  let mut a = DependenciesBlock::new();
  let mut block = split_point("lazy", "./lazy");
  block.set_chunk_group(Some(first));
  a.add_block(block);

  let mut b = DependenciesBlock::new();
  let mut block = split_point("lazy", "./lazy");
  block.set_chunk_group(Some(second));
  b.add_block(block);

  assert_ne!(digest(&a, &graph), digest(&b, &graph));
}

#[test]
fn unseal_forgets_placement_but_keeps_content() {
  let mut graph = ChunkGraph::default();
  let group = graph.add_group(GroupOptions::named("lazy"));
  graph.add_chunk(group, Chunk::with_id("lazy", "7"));

  let mut root = DependenciesBlock::new();
  root.add_block(split_point("lazy", "./lazy"));
  let unplaced = digest(&root, &graph);

  root.blocks_mut()[0].set_chunk_group(Some(group));
  let placed = digest(&root, &graph);
  assert_ne!(unplaced, placed);

  root.unseal();
  assert_eq!(root.blocks()[0].chunk_group(), None);
  assert!(root.has_dependencies());
  assert_eq!(digest(&root, &graph), unplaced);
}
