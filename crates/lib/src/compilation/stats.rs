use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::Compilation;

/// Snapshot of one finished compilation.
#[derive(Debug, Clone)]
pub struct Stats {
  pub compilation: Arc<Compilation>,
  /// Milliseconds since the Unix epoch.
  pub start_time: u64,
  pub end_time: u64,
}

impl Stats {
  pub fn new(compilation: Arc<Compilation>, start_time: u64, end_time: u64) -> Self {
    Self {
      compilation,
      start_time,
      end_time,
    }
  }

  pub fn has_errors(&self) -> bool {
    !self.compilation.errors().is_empty() || self.compilation.children().iter().any(|c| !c.errors().is_empty())
  }

  pub fn has_warnings(&self) -> bool {
    !self.compilation.warnings().is_empty() || self.compilation.children().iter().any(|c| !c.warnings().is_empty())
  }

  pub fn hash(&self) -> Option<String> {
    self.compilation.hash()
  }

  pub fn duration(&self) -> Duration {
    Duration::from_millis(self.end_time.saturating_sub(self.start_time))
  }

  pub fn summary(&self) -> StatsSummary {
    StatsSummary::build(&self.compilation, Some((self.start_time, self.end_time)))
  }
}

/// Serializable view of [`Stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hash: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_time: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_time: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
  pub assets: Vec<AssetSummary>,
  pub errors: Vec<String>,
  pub warnings: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub children: Vec<StatsSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
  pub name: String,
  pub size: usize,
  pub emitted: bool,
}

impl StatsSummary {
  fn build(compilation: &Compilation, times: Option<(u64, u64)>) -> Self {
    Self {
      name: compilation.name().map(str::to_string),
      hash: compilation.hash(),
      start_time: times.map(|(start, _)| start),
      end_time: times.map(|(_, end)| end),
      duration_ms: times.map(|(start, end)| end.saturating_sub(start)),
      assets: compilation
        .assets()
        .into_iter()
        .map(|(name, asset)| AssetSummary {
          name,
          size: asset.source.size(),
          emitted: asset.emitted,
        })
        .collect(),
      errors: compilation.errors().iter().map(|e| e.inspect()).collect(),
      warnings: compilation.warnings().iter().map(|e| e.inspect()).collect(),
      children: compilation
        .children()
        .iter()
        .map(|child| StatsSummary::build(child, None))
        .collect(),
    }
  }

  pub fn emitted(&self) -> impl Iterator<Item = &AssetSummary> {
    self.assets.iter().filter(|a| a.emitted)
  }

  pub fn skipped(&self) -> impl Iterator<Item = &AssetSummary> {
    self.assets.iter().filter(|a| !a.emitted)
  }
}
