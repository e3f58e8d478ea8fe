//! Implementation of the `wrapkit watch` command.

use anyhow::{Context, Result, anyhow};
use tracing::info;

use wrapkit_lib::{Environment, create_compiler};

use super::CompileArgs;
use crate::output::{OutputFormat, print_error, print_json, print_summary};

/// Build, then rebuild on every change until Ctrl-C.
pub fn cmd_watch(args: &CompileArgs, format: OutputFormat) -> Result<()> {
  let options = args.load_options()?;
  let watch_options = options.watch_options.clone();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async {
    let compiler = create_compiler(options, Environment::native(), &[]).context("Failed to set up compiler")?;

    let watching = compiler
      .watch(watch_options, move |result| match result {
        Ok(stats) => {
          let summary = stats.summary();
          if format.is_json() {
            if let Err(err) = print_json(&summary) {
              print_error(&format!("{:#}", err));
            }
          } else {
            print_summary(&summary);
          }
        }
        Err(err) => print_error(&format!("Build failed: {}", err)),
      })
      .ok_or_else(|| anyhow!("Failed to start watching"))?;

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("stopping");
    watching.close().await.context("Failed to stop watching")
  })
}
