//! LLM-driven iterative optimization of a single script.
//!
//! A run measures the unmodified program once, then repeatedly asks a language
//! model for a faster rewrite, executes each candidate, compares its stdout
//! with the baseline, and reports the fastest equivalent candidate.
//!
//! - **[`core`]**: Pure logic (equivalence, response extraction, history
//!   window, best/last selection). No I/O.
//! - **[`io`]**: Filesystem artifacts, config, prompt rendering, and script
//!   execution with timeouts.
//! - **[`llm`]**: Provider backends and the retrying client.
//!
//! [`optimize`] coordinates the three; [`report`] formats what the CLI prints.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod llm;
pub mod logging;
pub mod optimize;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
