//! Final ranking of iteration records.

use serde::Serialize;

use crate::core::types::IterationRecord;

/// Position and timing of one qualifying iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub iteration: u32,
    pub execution_time_micros: u64,
}

impl From<&IterationRecord> for Standing {
    fn from(record: &IterationRecord) -> Self {
        Self {
            iteration: record.iteration_index,
            execution_time_micros: record.execution_time_micros,
        }
    }
}

/// Best and most recent iterations that ran cleanly and reproduced the reference output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunSummary {
    /// No iteration both succeeded and matched the reference.
    NoQualifying,
    Found { last: Standing, best: Standing },
}

/// Rank records: disqualify failures and mismatches, then pick the last and the fastest.
///
/// Ties on time resolve to the earliest iteration.
pub fn summarize(records: &[IterationRecord]) -> RunSummary {
    let mut qualifying = records.iter().filter(|record| record.qualifies());
    let Some(first) = qualifying.next() else {
        return RunSummary::NoQualifying;
    };

    let mut last = first;
    let mut best = first;
    for record in qualifying {
        if record.execution_time_micros < best.execution_time_micros {
            best = record;
        }
        last = record;
    }

    RunSummary::Found {
        last: last.into(),
        best: best.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u32, time: u64, failed: bool, matches: bool) -> IterationRecord {
        IterationRecord {
            iteration_index: index,
            source_code: String::new(),
            execution_stdout: String::new(),
            execution_stderr: String::new(),
            execution_time_micros: time,
            execution_failed: failed,
            output_matches_reference: matches,
        }
    }

    #[test]
    fn empty_sequence_reports_no_qualifying() {
        assert_eq!(summarize(&[]), RunSummary::NoQualifying);
    }

    #[test]
    fn all_disqualified_reports_no_qualifying() {
        let records = vec![record(0, 10, true, false), record(1, 5, false, false)];
        assert_eq!(summarize(&records), RunSummary::NoQualifying);
    }

    #[test]
    fn mismatches_and_failures_cannot_be_best() {
        let records = vec![
            record(0, 900, false, true),
            record(1, 10, false, false),
            record(2, 5, true, false),
            record(3, 400, false, true),
            record(4, 700, false, true),
            record(5, 1, true, false),
        ];

        let summary = summarize(&records);
        assert_eq!(
            summary,
            RunSummary::Found {
                last: Standing {
                    iteration: 4,
                    execution_time_micros: 700
                },
                best: Standing {
                    iteration: 3,
                    execution_time_micros: 400
                },
            }
        );
    }

    #[test]
    fn ties_resolve_to_earliest_iteration() {
        let records = vec![record(0, 50, false, true), record(1, 50, false, true)];
        let RunSummary::Found { best, last } = summarize(&records) else {
            panic!("expected qualifying iterations");
        };
        assert_eq!(best.iteration, 0);
        assert_eq!(last.iteration, 1);
    }
}
