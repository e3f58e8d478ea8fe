use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DependenciesBlock;
use super::location::DependencyLocation;
use crate::compilation::chunk::{ChunkGraph, ChunkGroupId, ChunkId};
use crate::util::hash::HashAccumulator;
use crate::{CompilerError, Result};

/// Configuration of the output group created for a split point.
///
/// Serialized with `name` first and the extra keys in sorted order, so the
/// JSON fed to the block hash is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupOptions {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(flatten)]
  pub extra: BTreeMap<String, Value>,
}

impl GroupOptions {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: Some(name.into()),
      extra: BTreeMap::new(),
    }
  }

  pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
    self.extra.insert(key.into(), value);
    self
  }

  fn to_json(&self) -> String {
    serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
  }
}

impl From<&str> for GroupOptions {
  fn from(name: &str) -> Self {
    GroupOptions::named(name)
  }
}

impl From<Option<GroupOptions>> for GroupOptions {
  fn from(options: Option<GroupOptions>) -> Self {
    options.unwrap_or_default()
  }
}

/// A split point: a block whose contents load as a separate output group.
///
/// The chunk group is a lookup into the compilation's [`ChunkGraph`], set
/// while chunks are built and cleared by [`disconnect`](Self::disconnect)
/// and [`unseal`](Self::unseal). It is never carried into the next build.
#[derive(Debug)]
pub struct AsyncDependenciesBlock {
  block: DependenciesBlock,
  pub group_options: GroupOptions,
  /// Identifier of the module that declared the split point.
  pub module: String,
  pub loc: Option<DependencyLocation>,
  pub request: Option<String>,
  chunk_group: Option<ChunkGroupId>,
}

impl AsyncDependenciesBlock {
  pub fn new(
    group_options: impl Into<GroupOptions>,
    module: impl Into<String>,
    loc: Option<DependencyLocation>,
    request: Option<String>,
  ) -> Self {
    Self {
      block: DependenciesBlock::new(),
      group_options: group_options.into(),
      module: module.into(),
      loc,
      request,
      chunk_group: None,
    }
  }

  pub fn chunk_name(&self) -> Option<&str> {
    self.group_options.name.as_deref()
  }

  pub fn set_chunk_name(&mut self, name: Option<String>) {
    self.group_options.name = name;
  }

  pub fn chunk_group(&self) -> Option<ChunkGroupId> {
    self.chunk_group
  }

  pub fn set_chunk_group(&mut self, group: Option<ChunkGroupId>) {
    self.chunk_group = group;
  }

  /// Removed accessor for the block's chunks. Always fails.
  #[deprecated(note = "use AsyncDependenciesBlock::chunk_group")]
  pub fn chunks(&self) -> Result<Vec<ChunkId>> {
    Err(moved_to_chunk_group())
  }

  /// Removed setter for the block's chunks. Always fails.
  #[deprecated(note = "use AsyncDependenciesBlock::set_chunk_group")]
  pub fn set_chunks(&mut self, _chunks: Vec<ChunkId>) -> Result<()> {
    Err(moved_to_chunk_group())
  }

  pub fn update_hash(&self, hash: &mut dyn HashAccumulator, graph: &ChunkGraph) {
    hash.update(&self.group_options.to_json());
    hash.update(&graph.joined_chunk_ids(self.chunk_group));
    self.block.update_hash(hash, graph);
  }

  pub fn disconnect(&mut self) {
    self.chunk_group = None;
    self.block.disconnect();
  }

  pub fn unseal(&mut self) {
    self.chunk_group = None;
    self.block.unseal();
  }

  pub fn into_inner(self) -> DependenciesBlock {
    self.block
  }
}

fn moved_to_chunk_group() -> CompilerError {
  CompilerError::LegacyApi {
    accessor: "AsyncDependenciesBlock::chunks",
    replacement: "AsyncDependenciesBlock::chunk_group",
  }
}

impl Deref for AsyncDependenciesBlock {
  type Target = DependenciesBlock;

  fn deref(&self) -> &DependenciesBlock {
    &self.block
  }
}

impl DerefMut for AsyncDependenciesBlock {
  fn deref_mut(&mut self) -> &mut DependenciesBlock {
    &mut self.block
  }
}
