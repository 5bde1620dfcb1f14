//! Prompt -> provider -> candidate source, with pacing and retries.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::extract::extract_source;
use crate::core::history::PromptContext;
use crate::io::config::LlmConfig;
use crate::io::prompt::{Prompt, PromptBuilder};
use crate::llm::error::LlmError;
use crate::llm::{BackendSettings, ChatBackend, Completion, ProviderKind, build_backend};

/// Produces a candidate rewrite for the given optimization context.
///
/// An empty string means the model answered without any code; that is a
/// failed iteration, not a provider error.
pub trait CodeGenerator {
    fn generate(&self, context: &PromptContext) -> Result<String>;
}

/// How transient provider failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &LlmConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_backoff: cfg.retry_backoff(),
        }
    }

    /// Backoff before retry number `retry` (zero-based), doubling each time.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << retry.min(16))
    }
}

/// Provider-backed [`CodeGenerator`].
pub struct LlmClient {
    kind: ProviderKind,
    backend: Box<dyn ChatBackend>,
    prompts: PromptBuilder,
    retry: RetryPolicy,
    delay: Duration,
    trace: bool,
}

impl LlmClient {
    pub fn new(
        kind: ProviderKind,
        backend: Box<dyn ChatBackend>,
        prompts: PromptBuilder,
        retry: RetryPolicy,
        trace: bool,
    ) -> Self {
        Self {
            kind,
            backend,
            prompts,
            retry,
            delay: kind.rate_limit_delay(),
            trace,
        }
    }

    /// Build a client from process environment credentials.
    ///
    /// Missing credentials fail here, before any iteration runs.
    pub fn from_env(
        kind: ProviderKind,
        model_name: &str,
        cfg: &LlmConfig,
        language: &str,
        trace: bool,
    ) -> Result<Self> {
        let settings = BackendSettings::resolve(kind, model_name, cfg, |var| {
            std::env::var(var).ok()
        })?;
        debug!(provider = %kind, base_url = %settings.base_url, model = model_name, "resolved backend");
        let backend = build_backend(kind, settings)?;
        let prompts = PromptBuilder::new(language)?;
        Ok(Self::new(
            kind,
            backend,
            prompts,
            RetryPolicy::from_config(cfg),
            trace,
        ))
    }

    fn complete_with_retry(&self, prompt: &Prompt) -> Result<Completion, LlmError> {
        let mut retry = 0u32;
        loop {
            if !self.delay.is_zero() {
                debug!(delay_ms = self.delay.as_millis() as u64, "rate limit pause");
                thread::sleep(self.delay);
            }
            match self.backend.complete(prompt) {
                Ok(completion) => return Ok(completion),
                Err(err) if err.is_retryable() && retry < self.retry.max_retries => {
                    let backoff = self.retry.backoff(retry);
                    warn!(provider = %self.kind, err = %err, retry = retry + 1, backoff_ms = backoff.as_millis() as u64, "provider call failed, retrying");
                    thread::sleep(backoff);
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl CodeGenerator for LlmClient {
    #[instrument(skip_all, fields(provider = %self.kind))]
    fn generate(&self, context: &PromptContext) -> Result<String> {
        let prompt = self.prompts.render(context)?;
        if self.trace {
            info!(system = %prompt.system, user = %prompt.user, "rendered prompt");
        }

        let completion = self
            .complete_with_retry(&prompt)
            .with_context(|| format!("{} generation failed", self.kind))?;
        match completion.total_tokens {
            Some(total_tokens) => info!(total_tokens, "generation complete"),
            None => info!("generation complete (usage not reported)"),
        }
        if self.trace {
            info!(response = %completion.text, "raw model response");
        }

        Ok(extract_source(&completion.text))
    }
}
