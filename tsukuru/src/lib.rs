//! LLM-driven README and RSpec generation for Rails projects.
//!
//! A generator session discloses project files to a chat model round by round
//! until the model emits the artifact. The crate keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (ignore rules, disclosed-set and
//!   round bookkeeping, tool schemas and reply decoding). No I/O.
//! - **[`io`]**: Side-effecting operations (config, file walking, HTTP chat,
//!   prompt rendering, terminal input, artifact output).
//!
//! Orchestration modules ([`session`], [`generate`]) coordinate the two to
//! implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod generate;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
