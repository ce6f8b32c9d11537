//! Stable exit codes for tsukuru CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid config, I/O, or transport errors.
pub const INVALID: i32 = 1;
/// The model broke the tool-call protocol (round cap exceeded, unknown action,
/// malformed arguments). Nothing was written.
pub const PROTOCOL: i32 = 2;
