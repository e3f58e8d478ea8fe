//! Constants shared across the compiler core.

/// Textual hash updates shorter than this many bytes are buffered before
/// they reach the digest primitive.
pub const BULK_SIZE: usize = 1000;

/// Hash function used when the output options do not name one.
pub const DEFAULT_HASH_FUNCTION: &str = "sha256";

/// Number of digest characters kept for `[hash]` substitutions.
pub const DEFAULT_HASH_DIGEST_LENGTH: usize = 20;

/// Default output filename template.
pub const DEFAULT_OUTPUT_FILENAME: &str = "[name].js";

/// Compiler hooks whose taps are NOT copied onto a child compiler.
///
/// These phases belong to the parent build; replaying them in a child would
/// re-run parent-level side effects such as emission or entry creation.
pub const CHILD_EXCLUDED_HOOKS: &[&str] = &[
  "make",
  "compile",
  "emit",
  "after_emit",
  "invalid",
  "done",
  "this_compilation",
];

/// Legacy event names that always dispatch asynchronously, even when the
/// handler was registered as a plain synchronous function.
pub const FORCED_ASYNC_EVENTS: &[&str] = &[
  "additional-pass",
  "before-run",
  "run",
  "emit",
  "after-emit",
  "before-compile",
  "make",
  "after-compile",
  "watch-run",
];

/// Default debounce window between a detected change and the rebuild.
pub const DEFAULT_AGGREGATE_TIMEOUT_MS: u64 = 300;

/// Default interval between two polls of the watched files.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
