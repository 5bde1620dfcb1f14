//! Test-only helpers: scripted generators and `sh`-backed runners.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::history::PromptContext;
use crate::io::process::{Execution, InterpreterRunner, ScriptRunner};
use crate::llm::{CodeGenerator, LlmError};

/// Generator that replays a fixed queue of replies and records every context
/// it was asked with.
pub struct ScriptedGenerator {
    replies: RefCell<VecDeque<Result<String, LlmError>>>,
    contexts: RefCell<Vec<PromptContext>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            contexts: RefCell::new(Vec::new()),
        }
    }

    /// Convenience constructor for a run where every reply succeeds.
    pub fn sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(sources.into_iter().map(|s| Ok(s.into())).collect())
    }

    pub fn calls(&self) -> usize {
        self.contexts.borrow().len()
    }

    pub fn contexts(&self) -> Vec<PromptContext> {
        self.contexts.borrow().clone()
    }
}

impl CodeGenerator for ScriptedGenerator {
    fn generate(&self, context: &PromptContext) -> Result<String> {
        self.contexts.borrow_mut().push(context.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(source)) => Ok(source),
            Some(Err(err)) => Err(err.into()),
            None => Err(anyhow!("scripted generator exhausted")),
        }
    }
}

/// Runner wrapper that counts executions.
pub struct CountingRunner<R> {
    inner: R,
    runs: Cell<usize>,
}

impl<R> CountingRunner<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            runs: Cell::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl<R: ScriptRunner> ScriptRunner for CountingRunner<R> {
    fn run(&self, script: &Path) -> Result<Execution> {
        self.runs.set(self.runs.get() + 1);
        self.inner.run(script)
    }
}

/// Runner that executes scripts with `sh`, a short timeout, and a small output cap.
pub fn sh_runner() -> InterpreterRunner {
    InterpreterRunner::new(vec!["sh".to_string()], Duration::from_secs(10), 64 * 1024)
}

/// Write `body` to `dir/name` and return the path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    path
}
