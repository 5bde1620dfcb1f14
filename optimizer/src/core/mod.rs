//! Deterministic, pure logic shared by the optimizer.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod equivalence;
pub mod extract;
pub mod history;
pub mod selection;
pub mod types;
