//! Implementation of the `wrapkit build` command.
//!
//! Runs one build against the local disk and prints what was emitted.

use anyhow::{Context, Result, bail};
use tracing::debug;

use wrapkit_lib::{Environment, create_compiler};

use super::CompileArgs;
use crate::output::{OutputFormat, print_json, print_summary};

/// Execute the build command.
///
/// Fails when the build itself fails or when the finished compilation
/// reports errors.
pub fn cmd_build(args: &CompileArgs, format: OutputFormat) -> Result<()> {
  let options = args.load_options()?;
  debug!(context = %options.context.display(), "building");

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let stats = rt.block_on(async {
    let compiler = create_compiler(options, Environment::native(), &[]).context("Failed to set up compiler")?;
    compiler.run().await.context("Build failed")
  })?;

  let summary = stats.summary();
  if format.is_json() {
    print_json(&summary)?;
  } else {
    print_summary(&summary);
  }

  if stats.has_errors() {
    bail!("Build finished with {} error(s)", summary.errors.len());
  }
  Ok(())
}
