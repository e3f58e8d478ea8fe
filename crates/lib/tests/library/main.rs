mod common;

mod block_tests;
mod child_tests;
mod compiler_tests;
mod hooks_tests;
mod watch_tests;
