//! Error types for the compiler core.
//!
//! Two layers:
//! - [`BuildError`]: a structured diagnostic raised by plugins and phases. It
//!   carries optional origin/module/dependency context and a detail block.
//! - [`CompilerError`]: everything that can abort a compiler operation. A
//!   hook handler failure and a phase failure are the same type and
//!   short-circuit the same way.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// A structured build diagnostic.
///
/// The `Display` form is the message alone; [`BuildError::inspect`] renders
/// the message together with the context and detail block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct BuildError {
  /// Short human-readable description.
  pub message: String,
  /// Multi-line explanation appended by `inspect`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
  /// Requests that could not be found.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub missing: Vec<String>,
  /// Where the problem was first observed (plugin or phase name).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub origin: Option<String>,
  /// Identifier of the module the error belongs to.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub module: Option<String>,
  /// Dependency requests involved in the error.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub dependencies: Vec<String>,
}

impl BuildError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      ..Self::default()
    }
  }

  pub fn with_details(mut self, details: impl Into<String>) -> Self {
    self.details = Some(details.into());
    self
  }

  pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
    self.origin = Some(origin.into());
    self
  }

  pub fn with_module(mut self, module: impl Into<String>) -> Self {
    self.module = Some(module.into());
    self
  }

  pub fn with_dependency(mut self, request: impl Into<String>) -> Self {
    self.dependencies.push(request.into());
    self
  }

  pub fn with_missing(mut self, request: impl Into<String>) -> Self {
    self.missing.push(request.into());
    self
  }

  /// Render the message, its context and the detail block.
  pub fn inspect(&self) -> String {
    let mut out = self.message.clone();
    if let Some(module) = &self.module {
      let _ = write!(out, "\n  in module {}", module);
    }
    if let Some(origin) = &self.origin {
      let _ = write!(out, "\n  from {}", origin);
    }
    for request in &self.dependencies {
      let _ = write!(out, "\n  dependency {}", request);
    }
    for request in &self.missing {
      let _ = write!(out, "\n  missing {}", request);
    }
    if let Some(details) = &self.details {
      out.push('\n');
      out.push_str(details);
    }
    out
  }
}

/// Errors that abort a compiler operation.
#[derive(Debug, Error)]
pub enum CompilerError {
  /// `run` or `watch` was entered while another cycle was active.
  #[error("the compiler is already running; each instance only supports a single concurrent compilation at a time")]
  Concurrent,

  /// The persisted records file is not valid JSON.
  #[error("Cannot parse records: {0}")]
  RecordsParse(#[source] serde_json::Error),

  /// The records object could not be serialized.
  #[error("failed to serialize records: {0}")]
  RecordsSerialize(#[source] serde_json::Error),

  /// A filesystem capability call failed.
  #[error("{op} failed for {}: {source}", .path.display())]
  FileSystem {
    op: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A filesystem capability the operation needs was never configured.
  #[error("no {0} file system configured")]
  MissingFileSystem(&'static str),

  /// No code generation template is registered for a dependency kind.
  #[error("No template for dependency: {0}")]
  TemplateResolution(String),

  /// A superseded accessor was used.
  #[error("{accessor} was removed; use {replacement} instead")]
  LegacyApi {
    accessor: &'static str,
    replacement: &'static str,
  },

  /// A plugin or phase reported a structured build error.
  #[error(transparent)]
  Build(#[from] BuildError),

  #[error("unknown hash algorithm: {0}")]
  UnknownHashAlgorithm(String),

  #[error("invalid encoding: {0}")]
  InvalidEncoding(String),

  /// A legacy registration named an event that does not exist.
  #[error("unknown hook: {0}")]
  UnknownHook(String),

  /// An asynchronous handler was registered on a synchronous hook.
  #[error("hook {hook} is synchronous and cannot take an asynchronous handler")]
  IncompatibleTap { hook: String },

  /// `run_as_child` was called on a compiler without a parent compilation.
  #[error("compiler {} has no parent compilation", .0.as_deref().unwrap_or("<unnamed>"))]
  NotAChild(Option<String>),

  /// Plugins kept requesting additional passes past the configured limit.
  #[error("additional passes exceeded the limit of {0}")]
  AdditionalPassLimit(usize),

  #[error("invalid output options: {0}")]
  InvalidOutputOptions(#[source] serde_json::Error),

  #[error("failed to read config {}: {source}", .path.display())]
  ConfigRead {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config {}: {source}", .path.display())]
  ConfigParse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// A spawned hook or write task panicked or was cancelled.
  #[error("task failed: {0}")]
  Task(String),
}

impl CompilerError {
  /// Wrap a filesystem capability error, keeping the original cause.
  pub fn fs(op: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
    CompilerError::FileSystem {
      op,
      path: path.as_ref().to_path_buf(),
      source,
    }
  }

  /// Returns true for errors raised by the single-flight guard.
  pub fn is_concurrent(&self) -> bool {
    matches!(self, CompilerError::Concurrent)
  }
}
