//! Compiler configuration.
//!
//! Options are loaded from a JSON config file (camelCase keys, every field
//! optional) and normalized once before the compiler is built:
//!
//! ```json
//! {
//!   "context": "/project",
//!   "entry": { "main": ["./src/index.js"] },
//!   "output": { "path": "dist", "filename": "[name].[hash].js" },
//!   "recordsPath": "records/records.json"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::{
  DEFAULT_AGGREGATE_TIMEOUT_MS, DEFAULT_HASH_DIGEST_LENGTH, DEFAULT_HASH_FUNCTION, DEFAULT_OUTPUT_FILENAME,
  DEFAULT_POLL_INTERVAL_MS,
};
use crate::util::hash::DigestEncoding;
use crate::{CompilerError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
  /// Base directory for entries and relative paths.
  pub context: PathBuf,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  /// Entry name to the requests it starts from.
  pub entry: BTreeMap<String, Vec<String>>,
  pub output: OutputOptions,
  /// Shorthand for setting both records paths.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub records_path: Option<PathBuf>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub records_input_path: Option<PathBuf>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub records_output_path: Option<PathBuf>,
  /// Module rules, handed to module factories untouched.
  pub module: Value,
  pub watch_options: WatchOptions,
  /// Upper bound on additional passes per run. Unbounded when unset.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_additional_passes: Option<usize>,
}

impl Default for CompilerOptions {
  fn default() -> Self {
    Self {
      context: PathBuf::from("."),
      name: None,
      entry: BTreeMap::new(),
      output: OutputOptions::default(),
      records_path: None,
      records_input_path: None,
      records_output_path: None,
      module: Value::Object(Map::new()),
      watch_options: WatchOptions::default(),
      max_additional_passes: None,
    }
  }
}

impl CompilerOptions {
  pub fn new(context: impl Into<PathBuf>) -> Self {
    Self {
      context: context.into(),
      ..Self::default()
    }
  }

  /// Load options from a JSON config file.
  pub fn from_file(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path).map_err(|source| CompilerError::ConfigRead {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| CompilerError::ConfigParse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Resolve the records shorthand and make paths absolute against
  /// `context`.
  pub fn normalize(mut self) -> Self {
    if let Some(records) = self.records_path.take() {
      self.records_input_path.get_or_insert_with(|| records.clone());
      self.records_output_path.get_or_insert(records);
    }
    let context = self.context.clone();
    let resolve = |p: PathBuf| if p.is_absolute() { p } else { context.join(p) };
    self.records_input_path = self.records_input_path.map(resolve);
    self.records_output_path = self.records_output_path.map(resolve);
    self.output.path = Some(self.output.path.take().map(resolve).unwrap_or_else(|| context.clone()));
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputOptions {
  /// Output directory; may contain `[name]` and `[hash]`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub path: Option<PathBuf>,
  pub filename: String,
  pub hash_function: String,
  pub hash_digest: DigestEncoding,
  pub hash_digest_length: usize,
  /// Keys this crate does not interpret, kept for plugins.
  #[serde(flatten)]
  pub extra: BTreeMap<String, Value>,
}

impl Default for OutputOptions {
  fn default() -> Self {
    Self {
      path: None,
      filename: DEFAULT_OUTPUT_FILENAME.to_string(),
      hash_function: DEFAULT_HASH_FUNCTION.to_string(),
      hash_digest: DigestEncoding::Hex,
      hash_digest_length: DEFAULT_HASH_DIGEST_LENGTH,
      extra: BTreeMap::new(),
    }
  }
}

impl OutputOptions {
  /// A copy of these options with `overrides` layered on top.
  pub fn with_overrides(&self, overrides: &Map<String, Value>) -> Result<OutputOptions> {
    if overrides.is_empty() {
      return Ok(self.clone());
    }
    let mut merged = serde_json::to_value(self).map_err(CompilerError::InvalidOutputOptions)?;
    if let Value::Object(map) = &mut merged {
      for (key, value) in overrides {
        map.insert(key.clone(), value.clone());
      }
    }
    serde_json::from_value(merged).map_err(CompilerError::InvalidOutputOptions)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
  /// Wait this long after the first change before rebuilding, collecting
  /// further changes.
  #[serde(rename = "aggregateTimeout")]
  pub aggregate_timeout_ms: u64,
  #[serde(rename = "poll")]
  pub poll_interval_ms: u64,
  /// Path prefixes never reported as changed.
  pub ignored: Vec<PathBuf>,
}

impl Default for WatchOptions {
  fn default() -> Self {
    Self {
      aggregate_timeout_ms: DEFAULT_AGGREGATE_TIMEOUT_MS,
      poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
      ignored: Vec::new(),
    }
  }
}

impl WatchOptions {
  pub fn is_ignored(&self, path: &Path) -> bool {
    self.ignored.iter().any(|prefix| path.starts_with(prefix))
  }
}
