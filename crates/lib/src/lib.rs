//! wrapkit-lib: the orchestration core of the wrapkit bundler
//!
//! This crate provides:
//! - `Compiler`: the build lifecycle (run, watch, child compilers) driven
//!   through typed hooks
//! - `hooks`: event slots with sync, sync-bail, async-series and
//!   async-parallel dispatch
//! - `block`: the dependency block graph and its hashing model
//! - `Compilation`: the per-run module graph, chunk graph and assets
//! - `fs`, `watch`: the filesystem and watcher capabilities the compiler
//!   consumes

pub mod block;
pub mod compilation;
pub mod compiler;
pub mod consts;
pub mod error;
pub mod factory;
pub mod fs;
pub mod hooks;
pub mod plugin;
pub mod records;
pub mod resolver;
pub mod timestamps;
pub mod util;
pub mod watch;

pub use compilation::{Compilation, Stats, StatsSummary};
pub use compiler::{Compiler, CompilerOptions, OutputOptions, WatchOptions};
pub use error::{BuildError, CompilerError};
pub use factory::{Environment, create_compiler};
pub use plugin::{Plugin, plugin_fn};

pub type Result<T, E = CompilerError> = std::result::Result<T, E>;
