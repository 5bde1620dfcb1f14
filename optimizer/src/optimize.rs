//! Orchestration of one optimization run.
//!
//! INIT -> MEASURE_BASELINE -> ITERATE x `steps` -> DONE. The loop is strictly
//! sequential: one generation request, then one script execution, per step.
//! There is no early stopping; a run always spends its full step budget unless
//! the provider fails for good.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::core::equivalence::{self, StreamDigest};
use crate::core::history::HistoryWindow;
use crate::core::selection::{RunSummary, summarize};
use crate::core::types::{IterationRecord, ReferenceResult};
use crate::io::artifacts::{CandidateName, create_experiment_root, persist};
use crate::io::process::{Execution, ScriptRunner};
use crate::llm::CodeGenerator;

/// Inputs for a run.
#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    /// Script to optimize.
    pub program: &'a Path,
    /// Number of generate/execute iterations.
    pub steps: u32,
    /// Base directory for experiment folders.
    pub run_folder: &'a Path,
}

/// Progress events emitted while the run advances.
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    /// The unmodified script was measured.
    Baseline {
        reference: &'a ReferenceResult,
        execution: &'a Execution,
    },
    /// One iteration finished and was recorded.
    Iteration(&'a IterationRecord),
}

/// Reason why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// The full step budget was spent.
    Completed,
    /// Generation failed after retries; records collected so far are kept.
    ProviderFailed { iteration: u32, message: String },
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub experiment_dir: PathBuf,
    pub reference: ReferenceResult,
    /// Append-only, ordered by `iteration_index`.
    pub records: Vec<IterationRecord>,
    pub stop: LoopStop,
}

impl RunOutcome {
    pub fn summary(&self) -> RunSummary {
        summarize(&self.records)
    }
}

/// Run the optimization loop.
///
/// Execution failures and output mismatches are recorded and fed back to the
/// generator. Generation failures end the loop early but still return the
/// collected records. I/O failures (reading the program, creating or writing
/// artifacts, launching the interpreter) abort the run with an error.
#[instrument(skip_all, fields(program = %request.program.display(), steps = request.steps))]
pub fn run_optimization<R, G, F>(
    request: &RunRequest<'_>,
    runner: &R,
    generator: &G,
    mut on_progress: F,
) -> Result<RunOutcome>
where
    R: ScriptRunner,
    G: CodeGenerator,
    F: FnMut(Progress<'_>),
{
    let base_code = fs::read_to_string(request.program)
        .with_context(|| format!("read program {}", request.program.display()))?;
    let name = CandidateName::from_program(request.program)?;
    let experiment_dir = create_experiment_root(request.run_folder)?;
    info!(experiment_dir = %experiment_dir.display(), "experiment created");

    let baseline = runner
        .run(request.program)
        .context("measure baseline")?;
    if baseline.failed {
        warn!(stderr = %baseline.stderr, "baseline exited with an error; using its stdout as reference");
    }
    let reference = ReferenceResult {
        stdout: baseline.stdout.clone(),
        stdout_digest: baseline.stdout_digest.clone(),
        time_micros: baseline.elapsed_micros,
    };
    on_progress(Progress::Baseline {
        reference: &reference,
        execution: &baseline,
    });

    let mut window = HistoryWindow::new(base_code, reference.clone());
    let mut records: Vec<IterationRecord> = Vec::with_capacity(request.steps as usize);
    let mut stop = LoopStop::Completed;

    for iteration in 0..request.steps {
        let context = window.snapshot();
        let source = match generator.generate(&context) {
            Ok(source) => source,
            Err(err) => {
                error!(iteration, err = %format!("{err:#}"), "generation failed, stopping run");
                stop = LoopStop::ProviderFailed {
                    iteration,
                    message: format!("{err:#}"),
                };
                break;
            }
        };

        let script = persist(&experiment_dir, &name, iteration, &source)?;
        let execution = if source.trim().is_empty() {
            warn!(iteration, "model reply contained no code, recording a failed iteration");
            empty_candidate()
        } else {
            runner
                .run(&script)
                .with_context(|| format!("execute iteration {iteration}"))?
        };
        let output_matches_reference = !execution.failed
            && equivalence::matches(&reference.stdout_digest, &execution.stdout_digest);

        debug!(
            iteration,
            elapsed_us = execution.elapsed_micros,
            failed = execution.failed,
            output_matches_reference,
            "iteration evaluated"
        );
        let record = IterationRecord {
            iteration_index: iteration,
            source_code: source,
            execution_stdout: execution.stdout,
            execution_stderr: execution.stderr,
            execution_time_micros: execution.elapsed_micros,
            execution_failed: execution.failed,
            output_matches_reference,
        };
        records.push(record.clone());
        window.advance(record);
        on_progress(Progress::Iteration(&records[records.len() - 1]));
    }

    info!(iterations = records.len(), stop = ?stop, "run finished");
    Ok(RunOutcome {
        experiment_dir,
        reference,
        records,
        stop,
    })
}

/// Outcome recorded for a reply with no code in it; nothing is executed.
fn empty_candidate() -> Execution {
    Execution {
        stdout: String::new(),
        stderr: "model reply contained no source code\n".to_string(),
        stdout_digest: StreamDigest::of(&[]),
        elapsed_micros: 0,
        failed: true,
        timed_out: false,
        stdout_truncated: 0,
    }
}
