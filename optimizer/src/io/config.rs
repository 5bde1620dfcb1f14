//! Optimizer configuration loaded from an optional TOML file (`optimizer.toml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::debug;

/// Optimizer configuration (TOML).
///
/// Missing fields default to values that reproduce a plain `python3` workflow.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Base directory for `expNNNN` experiment folders.
    pub run_folder: PathBuf,

    /// Command prefix used to execute scripts; the script path is appended.
    pub interpreter: Vec<String>,

    /// Language name shown to the model.
    pub language: String,

    /// Wall-clock limit for a single script execution, in seconds.
    pub script_timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes per stream.
    pub output_limit_bytes: usize,

    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub temperature: f32,

    /// Completion cap for providers that require one.
    pub max_tokens: u32,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Retries after the first attempt for transient provider failures.
    pub max_retries: u32,

    /// Base backoff in seconds, doubled on every retry.
    pub retry_backoff_secs: u64,

    /// Override for the provider's default endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            max_tokens: 8192,
            request_timeout_secs: 300,
            max_retries: 2,
            retry_backoff_secs: 5,
            base_url: None,
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            run_folder: PathBuf::from("run"),
            interpreter: vec!["python3".to_string()],
            language: "Python 3".to_string(),
            script_timeout_secs: 600,
            output_limit_bytes: 10_000_000,
            llm: LlmConfig::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.is_empty() || self.interpreter[0].trim().is_empty() {
            return Err(anyhow!("interpreter must be a non-empty array"));
        }
        if self.script_timeout_secs == 0 {
            return Err(anyhow!("script_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.language.trim().is_empty() {
            return Err(anyhow!("language must not be empty"));
        }
        self.llm.validate()
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!("llm.temperature must be within 0.0..=2.0"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("llm.max_tokens must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("llm.request_timeout_secs must be > 0"));
        }
        if let Some(url) = &self.base_url
            && url.trim().is_empty()
        {
            return Err(anyhow!("llm.base_url must not be empty when set"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `OptimizerConfig::default()`.
pub fn load_config(path: &Path) -> Result<OptimizerConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config file missing, using defaults");
        let cfg = OptimizerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: OptimizerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, OptimizerConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("optimizer.toml");
        fs::write(&path, "interpreter = [\"pypy3\", \"-O\"]\n[llm]\nmax_retries = 0\n")
            .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.interpreter, vec!["pypy3", "-O"]);
        assert_eq!(cfg.llm.max_retries, 0);
        assert_eq!(cfg.script_timeout_secs, 600);
        assert_eq!(cfg.llm.temperature, 1.0);
    }

    #[test]
    fn rejects_invalid_values() {
        let empty_interpreter = OptimizerConfig {
            interpreter: Vec::new(),
            ..OptimizerConfig::default()
        };
        assert!(empty_interpreter.validate().is_err());

        let zero_timeout = OptimizerConfig {
            script_timeout_secs: 0,
            ..OptimizerConfig::default()
        };
        assert!(zero_timeout.validate().is_err());

        let hot = OptimizerConfig {
            llm: LlmConfig {
                temperature: 3.5,
                ..LlmConfig::default()
            },
            ..OptimizerConfig::default()
        };
        let err = hot.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }
}
