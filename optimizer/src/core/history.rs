//! Bounded rolling context of prior iterations.
//!
//! The window holds the baseline plus at most two generated versions, so the
//! prompt size stays constant over a run regardless of the step budget.

use serde::Serialize;

use crate::core::types::{IterationRecord, ReferenceResult};

/// Everything the prompt needs for the next generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptContext {
    pub base_code: String,
    pub base_time_micros: u64,
    /// Empty string when no iteration has been shifted out yet.
    pub two_iterations_ago_code: String,
    /// Zero when no iteration has been shifted out yet.
    pub two_iterations_ago_time_micros: u64,
    pub previous_code: String,
    pub previous_time_micros: u64,
    pub previous_failed: bool,
    /// Stderr of the previous iteration when it failed.
    pub previous_error: Option<String>,
    pub reference_output: String,
    pub previous_output: String,
}

/// Rolling two-deep history seeded with the baseline.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    baseline_code: String,
    reference: ReferenceResult,
    two_iterations_ago: Option<IterationRecord>,
    previous: Option<IterationRecord>,
}

impl HistoryWindow {
    pub fn new(baseline_code: impl Into<String>, reference: ReferenceResult) -> Self {
        Self {
            baseline_code: baseline_code.into(),
            reference,
            two_iterations_ago: None,
            previous: None,
        }
    }

    /// Shift `previous` into `two_iterations_ago` and install `record` as `previous`.
    ///
    /// Failed and mismatching iterations are kept as well.
    pub fn advance(&mut self, record: IterationRecord) {
        self.two_iterations_ago = self.previous.replace(record);
    }

    pub fn previous(&self) -> Option<&IterationRecord> {
        self.previous.as_ref()
    }

    pub fn two_iterations_ago(&self) -> Option<&IterationRecord> {
        self.two_iterations_ago.as_ref()
    }

    /// Build the prompt context.
    ///
    /// Before the first iteration the baseline itself stands in as the previous
    /// version (successful, with the reference output).
    pub fn snapshot(&self) -> PromptContext {
        let (two_code, two_time) = match &self.two_iterations_ago {
            Some(record) => (record.source_code.clone(), record.execution_time_micros),
            None => (String::new(), 0),
        };
        let base_code = self.baseline_code.clone();
        let base_time_micros = self.reference.time_micros;

        match &self.previous {
            Some(prev) => PromptContext {
                base_code,
                base_time_micros,
                two_iterations_ago_code: two_code,
                two_iterations_ago_time_micros: two_time,
                previous_code: prev.source_code.clone(),
                previous_time_micros: prev.execution_time_micros,
                previous_failed: prev.execution_failed,
                previous_error: prev.error_text().map(str::to_string),
                reference_output: self.reference.stdout.clone(),
                previous_output: prev.execution_stdout.clone(),
            },
            None => PromptContext {
                base_code: base_code.clone(),
                base_time_micros,
                two_iterations_ago_code: two_code,
                two_iterations_ago_time_micros: two_time,
                previous_code: base_code,
                previous_time_micros: base_time_micros,
                previous_failed: false,
                previous_error: None,
                reference_output: self.reference.stdout.clone(),
                previous_output: self.reference.stdout.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::equivalence::StreamDigest;

    fn reference() -> ReferenceResult {
        ReferenceResult {
            stdout: "hello\n".to_string(),
            stdout_digest: StreamDigest::of(b"hello\n"),
            time_micros: 5_000,
        }
    }

    fn record(index: u32, failed: bool) -> IterationRecord {
        IterationRecord {
            iteration_index: index,
            source_code: format!("version {index}"),
            execution_stdout: if failed { String::new() } else { "hello\n".to_string() },
            execution_stderr: if failed { format!("error {index}") } else { String::new() },
            execution_time_micros: 1_000 + u64::from(index),
            execution_failed: failed,
            output_matches_reference: !failed,
        }
    }

    #[test]
    fn fresh_window_presents_baseline_as_previous() {
        let window = HistoryWindow::new("print('hello')", reference());
        let ctx = window.snapshot();

        assert_eq!(ctx.base_code, "print('hello')");
        assert_eq!(ctx.base_time_micros, 5_000);
        assert_eq!(ctx.two_iterations_ago_code, "");
        assert_eq!(ctx.two_iterations_ago_time_micros, 0);
        assert_eq!(ctx.previous_code, "print('hello')");
        assert_eq!(ctx.previous_time_micros, 5_000);
        assert!(!ctx.previous_failed);
        assert_eq!(ctx.previous_error, None);
        assert_eq!(ctx.previous_output, "hello\n");
        assert!(window.previous().is_none());
        assert!(window.two_iterations_ago().is_none());
    }

    #[test]
    fn advance_rotates_previous_into_two_ago() {
        let mut window = HistoryWindow::new("base", reference());

        window.advance(record(0, false));
        assert_eq!(window.previous(), Some(&record(0, false)));
        assert!(window.two_iterations_ago().is_none());

        for i in 1..5 {
            window.advance(record(i, i % 2 == 1));
            assert_eq!(window.previous(), Some(&record(i, i % 2 == 1)));
            assert_eq!(
                window.two_iterations_ago(),
                Some(&record(i - 1, (i - 1) % 2 == 1))
            );
        }
    }

    #[test]
    fn failed_previous_surfaces_error_text() {
        let mut window = HistoryWindow::new("base", reference());
        window.advance(record(0, false));
        window.advance(record(1, true));

        let ctx = window.snapshot();
        assert_eq!(ctx.two_iterations_ago_code, "version 0");
        assert_eq!(ctx.two_iterations_ago_time_micros, 1_000);
        assert_eq!(ctx.previous_code, "version 1");
        assert!(ctx.previous_failed);
        assert_eq!(ctx.previous_error.as_deref(), Some("error 1"));
        assert_eq!(ctx.previous_output, "");
        assert_eq!(ctx.reference_output, "hello\n");
    }

    #[test]
    fn failure_flag_is_not_sticky() {
        let mut window = HistoryWindow::new("base", reference());
        window.advance(record(0, true));
        window.advance(record(1, false));

        let ctx = window.snapshot();
        assert!(!ctx.previous_failed);
        assert_eq!(ctx.previous_error, None);
    }
}
