//! I/O helpers for generator commands.

pub mod chat;
pub mod config;
pub mod init;
pub mod instruction;
pub mod output;
pub mod project;
pub mod prompt;
