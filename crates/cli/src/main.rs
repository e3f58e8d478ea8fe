mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::CompileArgs;
use output::OutputFormat;

/// wrapkit - plugin-driven module bundler core
#[derive(Parser)]
#[command(name = "wrapkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one build
  Build {
    #[command(flatten)]
    args: CompileArgs,

    /// Print the stats summary as JSON
    #[arg(long)]
    json: bool,
  },

  /// Build and rebuild on every change until Ctrl-C
  Watch {
    #[command(flatten)]
    args: CompileArgs,

    /// Print each stats summary as JSON
    #[arg(long)]
    json: bool,
  },

  /// Print the digest of the given text
  Hash {
    /// sha256, sha512, xxh3 or debug
    #[arg(short, long, default_value = "sha256")]
    algorithm: String,

    /// Encoding of the text: utf8, latin1, hex or base64
    #[arg(long, default_value = "utf8")]
    input: String,

    /// Digest encoding: hex, base64 or latin1
    #[arg(short, long, default_value = "hex")]
    digest: String,

    /// Text fed to the hash, in order
    #[arg(required = true)]
    text: Vec<String>,
  },
}

fn format(json: bool) -> OutputFormat {
  if json { OutputFormat::Json } else { OutputFormat::Text }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_env("WRAPKIT_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build { args, json } => cmd::cmd_build(&args, format(json)),
    Commands::Watch { args, json } => cmd::cmd_watch(&args, format(json)),
    Commands::Hash {
      algorithm,
      input,
      digest,
      text,
    } => cmd::cmd_hash(&algorithm, &input, &digest, &text),
  }
}
