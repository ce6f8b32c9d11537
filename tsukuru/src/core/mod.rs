//! Deterministic, pure logic shared by the generators.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod disclosed;
pub mod path_filter;
pub mod rounds;
pub mod tools;
pub mod types;
