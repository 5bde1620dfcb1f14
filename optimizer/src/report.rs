//! Human-readable run output.
//!
//! Formatting is kept separate from printing so the exact lines can be tested.

use crate::core::selection::RunSummary;
use crate::optimize::{LoopStop, Progress, RunOutcome};

/// Lines to print for one progress event.
pub fn progress_lines(event: &Progress<'_>) -> Vec<String> {
    match event {
        Progress::Baseline {
            reference,
            execution,
        } => {
            let mut lines = vec![format!(
                "Iteration Initial: Execution Time: {} microseconds",
                reference.time_micros
            )];
            if execution.failed {
                lines.push(format!(
                    "Warning: the original program exited with an error: {}",
                    execution.stderr.trim_end()
                ));
            }
            lines
        }
        Progress::Iteration(record) => {
            let mut lines = vec![format!(
                "Iteration {}: Execution Time: {} microseconds",
                record.iteration_index, record.execution_time_micros
            )];
            if record.execution_failed {
                lines.push(format!(
                    "Error during execution: {}",
                    record.execution_stderr.trim_end()
                ));
            } else if !record.output_matches_reference {
                lines.push("Output differs from the reference; iteration not eligible".to_string());
            }
            lines
        }
    }
}

/// Lines to print once the run ends.
pub fn summary_lines(outcome: &RunOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    if let LoopStop::ProviderFailed { iteration, message } = &outcome.stop {
        lines.push(format!(
            "Run stopped at iteration {iteration}: model provider failed: {message}"
        ));
    }
    match outcome.summary() {
        RunSummary::Found { last, best } => {
            lines.push(format!(
                "Last results: execution_time {} iteration: {}",
                last.execution_time_micros, last.iteration
            ));
            lines.push(format!(
                "The best results: execution_time {} iteration: {}",
                best.execution_time_micros, best.iteration
            ));
        }
        RunSummary::NoQualifying => {
            lines.push(format!(
                "No qualifying iterations: none of the {} iterations ran cleanly with output matching the reference",
                outcome.records.len()
            ));
        }
    }
    lines.push(format!("Candidates saved in {}", outcome.experiment_dir.display()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::equivalence::StreamDigest;
    use crate::core::types::{IterationRecord, ReferenceResult};
    use crate::io::process::Execution;
    use std::path::PathBuf;

    fn record(index: u32, time: u64, failed: bool, matches: bool) -> IterationRecord {
        IterationRecord {
            iteration_index: index,
            source_code: String::new(),
            execution_stdout: String::new(),
            execution_stderr: if failed { "boom\n".to_string() } else { String::new() },
            execution_time_micros: time,
            execution_failed: failed,
            output_matches_reference: matches,
        }
    }

    fn outcome(records: Vec<IterationRecord>, stop: LoopStop) -> RunOutcome {
        RunOutcome {
            experiment_dir: PathBuf::from("run/exp0001"),
            reference: ReferenceResult {
                stdout: "ok\n".to_string(),
                stdout_digest: StreamDigest::of(b"ok\n"),
                time_micros: 1000,
            },
            records,
            stop,
        }
    }

    #[test]
    fn baseline_line_reports_time() {
        let reference = ReferenceResult {
            stdout: String::new(),
            stdout_digest: StreamDigest::of(b""),
            time_micros: 1234,
        };
        let execution = Execution {
            stdout: String::new(),
            stderr: String::new(),
            stdout_digest: StreamDigest::of(b""),
            elapsed_micros: 1234,
            failed: false,
            timed_out: false,
            stdout_truncated: 0,
        };
        let lines = progress_lines(&Progress::Baseline {
            reference: &reference,
            execution: &execution,
        });
        assert_eq!(lines, vec!["Iteration Initial: Execution Time: 1234 microseconds"]);
    }

    #[test]
    fn failed_iteration_shows_error() {
        let rec = record(3, 50, true, false);
        let lines = progress_lines(&Progress::Iteration(&rec));
        assert_eq!(
            lines,
            vec![
                "Iteration 3: Execution Time: 50 microseconds".to_string(),
                "Error during execution: boom".to_string(),
            ]
        );
    }

    #[test]
    fn mismatched_iteration_is_flagged() {
        let rec = record(1, 50, false, false);
        let lines = progress_lines(&Progress::Iteration(&rec));
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("differs from the reference"));
    }

    #[test]
    fn summary_reports_last_and_best() {
        let lines = summary_lines(&outcome(
            vec![record(0, 800, false, true), record(1, 500, false, true), record(2, 900, false, true)],
            LoopStop::Completed,
        ));
        assert_eq!(lines[0], "Last results: execution_time 900 iteration: 2");
        assert_eq!(lines[1], "The best results: execution_time 500 iteration: 1");
    }

    #[test]
    fn summary_without_qualifying_iterations() {
        let lines = summary_lines(&outcome(vec![record(0, 800, true, false)], LoopStop::Completed));
        assert!(lines[0].starts_with("No qualifying iterations"));
    }

    #[test]
    fn provider_failure_is_reported_before_results() {
        let lines = summary_lines(&outcome(
            vec![record(0, 800, false, true)],
            LoopStop::ProviderFailed {
                iteration: 1,
                message: "rate limited".to_string(),
            },
        ));
        assert_eq!(lines[0], "Run stopped at iteration 1: model provider failed: rate limited");
        assert_eq!(lines[1], "Last results: execution_time 800 iteration: 0");
    }
}
