//! Output units and the groups that own them.
//!
//! The [`ChunkGraph`] is the registry blocks look their output group up in;
//! blocks hold a [`ChunkGroupId`], never the group itself.

use std::fmt;

use serde::Serialize;

use crate::block::GroupOptions;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChunkId(pub String);

impl fmt::Display for ChunkId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ChunkId {
  fn from(id: &str) -> Self {
    ChunkId(id.to_string())
  }
}

impl From<usize> for ChunkId {
  fn from(id: usize) -> Self {
    ChunkId(id.to_string())
  }
}

/// Index of a group in its [`ChunkGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkGroupId(pub usize);

/// Index of a chunk in its [`ChunkGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkKey(pub usize);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Chunk {
  pub name: Option<String>,
  /// Assigned while optimizing chunk ids; `None` until then.
  pub id: Option<ChunkId>,
  pub files: Vec<String>,
}

impl Chunk {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: Some(name.into()),
      ..Self::default()
    }
  }

  pub fn with_id(name: impl Into<String>, id: impl Into<ChunkId>) -> Self {
    Self {
      name: Some(name.into()),
      id: Some(id.into()),
      files: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct ChunkGroup {
  pub options: GroupOptions,
  pub chunks: Vec<ChunkKey>,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkGraph {
  chunks: Vec<Chunk>,
  groups: Vec<ChunkGroup>,
}

impl ChunkGraph {
  pub fn add_group(&mut self, options: GroupOptions) -> ChunkGroupId {
    self.groups.push(ChunkGroup {
      options,
      chunks: Vec::new(),
    });
    ChunkGroupId(self.groups.len() - 1)
  }

  pub fn group(&self, id: ChunkGroupId) -> Option<&ChunkGroup> {
    self.groups.get(id.0)
  }

  /// Add `chunk` to the group. Returns `None` if the group does not exist.
  pub fn add_chunk(&mut self, group: ChunkGroupId, chunk: Chunk) -> Option<ChunkKey> {
    let group = self.groups.get_mut(group.0)?;
    self.chunks.push(chunk);
    let key = ChunkKey(self.chunks.len() - 1);
    group.chunks.push(key);
    Some(key)
  }

  pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
    self.chunks.get(key.0)
  }

  pub fn chunk_mut(&mut self, key: ChunkKey) -> Option<&mut Chunk> {
    self.chunks.get_mut(key.0)
  }

  pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
    self.chunks.iter()
  }

  pub fn chunks_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
    self.chunks.iter_mut()
  }

  /// Chunks of a group in group order.
  pub fn group_chunks(&self, group: ChunkGroupId) -> Vec<&Chunk> {
    self
      .group(group)
      .map(|g| g.chunks.iter().filter_map(|k| self.chunk(*k)).collect())
      .unwrap_or_default()
  }

  /// Comma-joined ids of the group's chunks, with an empty entry for every
  /// chunk that has no id yet. Empty for an unset or unknown group.
  pub fn joined_chunk_ids(&self, group: Option<ChunkGroupId>) -> String {
    let Some(group) = group else {
      return String::new();
    };
    self
      .group_chunks(group)
      .iter()
      .map(|c| c.id.as_ref().map(|id| id.0.as_str()).unwrap_or(""))
      .collect::<Vec<_>>()
      .join(",")
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty() && self.chunks.is_empty()
  }

  pub fn clear(&mut self) {
    self.chunks.clear();
    self.groups.clear();
  }
}
