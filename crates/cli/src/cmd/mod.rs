mod build;
mod hash;
mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use wrapkit_lib::CompilerOptions;

pub use build::cmd_build;
pub use hash::cmd_hash;
pub use watch::cmd_watch;

/// Flags shared by `build` and `watch`.
#[derive(Debug, Clone, Args)]
pub struct CompileArgs {
  /// JSON config file
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Base directory (default: the config file's directory, else the current directory)
  #[arg(long)]
  pub context: Option<PathBuf>,

  /// Output directory, relative to the context
  #[arg(short, long)]
  pub output: Option<PathBuf>,

  /// Records file read before and written after every build
  #[arg(long)]
  pub records: Option<PathBuf>,
}

impl CompileArgs {
  /// Load the config file, if any, and layer the flags on top.
  pub fn load_options(&self) -> Result<CompilerOptions> {
    let mut options = match &self.config {
      Some(path) => {
        let mut options =
          CompilerOptions::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))?;
        if options.context.is_relative() {
          let base = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
          options.context = base.join(&options.context);
        }
        options
      }
      None => CompilerOptions::default(),
    };

    if let Some(context) = &self.context {
      options.context = context.clone();
    }
    options.context = dunce::canonicalize(&options.context)
      .with_context(|| format!("Context directory not found: {}", options.context.display()))?;

    if let Some(output) = &self.output {
      options.output.path = Some(output.clone());
    }
    if let Some(records) = &self.records {
      options.records_path = Some(records.clone());
    }
    Ok(options)
  }
}
