//! Loading and persisting records.

use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::Compiler;
use crate::util::path::parent_dir_of;
use crate::{CompilerError, Result};

impl Compiler {
  /// Load records from the configured input path.
  ///
  /// Without an input path the records start as `{}`. A path that cannot be
  /// stat'ed is treated as a first build; content that does not parse is an
  /// error.
  pub async fn read_records(&self) -> Result<()> {
    let Some(path) = self.records_input_path.as_deref() else {
      self.records.replace(Value::Object(Map::new()));
      return Ok(());
    };

    let fs = self.input_file_system()?;
    if let Err(err) = fs.stat(path).await {
      debug!(path = %path.display(), error = %err, "no records to read");
      return Ok(());
    }

    let content = fs
      .read_file(path)
      .await
      .map_err(|source| CompilerError::fs("read records", path, source))?;
    let records: Value = serde_json::from_slice(&content).map_err(CompilerError::RecordsParse)?;
    self.records.replace(records);
    info!(path = %path.display(), "records loaded");
    Ok(())
  }

  /// Write the records to the configured output path as pretty-printed
  /// JSON. Does nothing without an output path.
  pub async fn emit_records(&self) -> Result<()> {
    let Some(path) = self.records_output_path.as_deref() else {
      return Ok(());
    };
    let fs = self.output_file_system()?;

    let target = path.to_string_lossy();
    if let Some(dir) = parent_dir_of(&target) {
      let dir = PathBuf::from(dir);
      fs.mkdirp(&dir)
        .await
        .map_err(|source| CompilerError::fs("mkdirp", &dir, source))?;
    }

    let content = serde_json::to_string_pretty(&self.records.get()).map_err(CompilerError::RecordsSerialize)?;
    fs.write_file(path, content.into_bytes())
      .await
      .map_err(|source| CompilerError::fs("write records", path, source))?;
    info!(path = %path.display(), "records written");
    Ok(())
  }
}
