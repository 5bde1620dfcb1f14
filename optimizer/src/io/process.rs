//! Script execution with wall-clock timing, timeouts and bounded output.
//!
//! [`ScriptRunner`] is the seam the orchestrator depends on. The production
//! implementation, [`InterpreterRunner`], launches `<interpreter...> <script>`
//! as a plain child process (no sandboxing) in the caller's working directory.
//!
//! On unix the child leads its own process group, so a timeout also reaches
//! anything the script started (subprocesses, pool workers, `sleep`).

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::equivalence::{StreamDigest, StreamDigester};

/// How long reader threads get to see EOF once the process group is dead.
const DRAIN_GRACE: Duration = Duration::from_millis(500);
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    /// Digest of everything written to stdout, including truncated bytes.
    pub stdout_digest: StreamDigest,
    /// The deadline passed, either for the child or for descendants holding its pipes.
    pub timed_out: bool,
    /// Time from just before spawn until the child was reaped.
    pub elapsed: Duration,
}

/// One drained stream.
#[derive(Debug)]
struct Captured {
    bytes: Vec<u8>,
    truncated: usize,
    digest: StreamDigest,
}

impl Captured {
    /// Placeholder for a stream whose reader had to be abandoned.
    fn abandoned() -> Self {
        Self {
            bytes: Vec::new(),
            truncated: 0,
            digest: StreamDigest::of(&[]),
        }
    }
}

type Reader = JoinHandle<Result<Captured>>;

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe,
/// but still digested).
///
/// The timeout covers the whole process group. Descendants still holding the output pipes after
/// the child exits are killed once the deadline passes, and the run counts as timed out.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    own_process_group(&mut cmd);

    debug!("spawning child process");
    let started = Instant::now();
    let deadline = started + timeout;
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle: Reader =
        thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle: Reader =
        thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing process group"
            );
            timed_out = true;
            kill_process_group(&mut child)?;
            child.wait().context("wait command after kill")?
        }
    };
    let elapsed = started.elapsed();

    if !timed_out && !readers_finish_by(&stdout_handle, &stderr_handle, deadline) {
        warn!("descendants still hold the output pipes past the deadline, killing process group");
        timed_out = true;
        kill_process_group(&mut child)?;
    }
    if !readers_finish_by(&stdout_handle, &stderr_handle, Instant::now() + DRAIN_GRACE) {
        warn!("output pipes still open after kill, abandoning capture");
    }

    let stdout = join_output(stdout_handle).context("join stdout")?;
    let stderr = join_output(stderr_handle).context("join stderr")?;

    if stdout.truncated > 0 || stderr.truncated > 0 {
        warn!(
            stdout_truncated = stdout.truncated,
            stderr_truncated = stderr.truncated,
            "output truncated"
        );
    }

    debug!(exit_code = ?status.code(), timed_out, elapsed_us = elapsed.as_micros() as u64, "command finished");
    Ok(CommandOutput {
        status,
        stdout: stdout.bytes,
        stderr: stderr.bytes,
        stdout_truncated: stdout.truncated,
        stderr_truncated: stderr.truncated,
        stdout_digest: stdout.digest,
        timed_out,
        elapsed,
    })
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// SIGKILL every process in the child's group. The group may already be gone.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(child.id()).context("child pid out of range")?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(err) => Err(err).context("kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> Result<()> {
    child.kill().context("kill command")
}

/// Poll until both readers are done or `deadline` passes. Returns whether they finished.
fn readers_finish_by(stdout: &Reader, stderr: &Reader, deadline: Instant) -> bool {
    loop {
        if stdout.is_finished() && stderr.is_finished() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(DRAIN_POLL);
    }
}

fn join_output(handle: Reader) -> Result<Captured> {
    if !handle.is_finished() {
        // Dropping the handle detaches the thread; it ends when the pipe closes.
        return Ok(Captured::abandoned());
    }
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<Captured> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut digester = StreamDigester::default();
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        digester.update(&chunk[..n]);
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok(Captured {
        bytes: buf,
        truncated,
        digest: digester.finish(),
    })
}

/// Result of executing one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Lossily decoded capture, for prompts and display.
    pub stdout: String,
    pub stderr: String,
    /// Digest of the raw stdout bytes; what equivalence is decided on.
    pub stdout_digest: StreamDigest,
    pub elapsed_micros: u64,
    /// Non-zero exit, death by signal, or timeout.
    pub failed: bool,
    pub timed_out: bool,
    /// Stdout bytes discarded past the output limit.
    pub stdout_truncated: usize,
}

/// Executes a script file and reports its outcome.
///
/// A script that runs and fails is an `Ok` execution with `failed = true`;
/// `Err` is reserved for the runner itself being unable to launch anything.
pub trait ScriptRunner {
    fn run(&self, script: &Path) -> Result<Execution>;
}

/// Runs scripts through an interpreter command prefix such as `["python3"]`.
#[derive(Debug, Clone)]
pub struct InterpreterRunner {
    interpreter: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl InterpreterRunner {
    pub fn new(interpreter: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            interpreter,
            timeout,
            output_limit_bytes,
        }
    }
}

impl ScriptRunner for InterpreterRunner {
    #[instrument(skip_all, fields(script = %script.display()))]
    fn run(&self, script: &Path) -> Result<Execution> {
        let (program, args) = self
            .interpreter
            .split_first()
            .ok_or_else(|| anyhow!("interpreter command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).arg(script);

        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {} {}", self.interpreter.join(" "), script.display()))?;

        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.timed_out {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!(
                "[timed out after {} s]\n",
                self.timeout.as_secs()
            ));
        }

        Ok(Execution {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
            stdout_digest: output.stdout_digest,
            elapsed_micros: u64::try_from(output.elapsed.as_micros()).unwrap_or(u64::MAX),
            failed: output.timed_out || !output.status.success(),
            timed_out: output.timed_out,
            stdout_truncated: output.stdout_truncated,
        })
    }
}
