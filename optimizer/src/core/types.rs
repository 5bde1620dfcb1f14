//! Shared record types for the optimization loop.
//!
//! These types define stable contracts between the orchestrator, the history
//! window and the final report. They carry no I/O handles.

use serde::{Deserialize, Serialize};

use crate::core::equivalence::StreamDigest;

/// Captured stdout and timing of the unmodified baseline script.
///
/// Computed exactly once per run, before the first iteration, and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceResult {
    /// Decoded, possibly truncated capture shown to the model.
    pub stdout: String,
    /// Digest of the full raw stdout; candidates are compared against this.
    pub stdout_digest: StreamDigest,
    pub time_micros: u64,
}

/// Outcome of one generate -> persist -> execute -> evaluate cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based, contiguous iteration index.
    pub iteration_index: u32,
    pub source_code: String,
    pub execution_stdout: String,
    pub execution_stderr: String,
    pub execution_time_micros: u64,
    /// Non-zero exit, signal death or timeout.
    pub execution_failed: bool,
    /// Stdout equals the reference. Always `false` when `execution_failed`.
    pub output_matches_reference: bool,
}

impl IterationRecord {
    /// Whether this iteration is eligible for the best/last ranking.
    pub fn qualifies(&self) -> bool {
        !self.execution_failed && self.output_matches_reference
    }

    /// Error text to surface to the next prompt, present only for failed runs.
    pub fn error_text(&self) -> Option<&str> {
        self.execution_failed.then_some(self.execution_stderr.as_str())
    }
}
