//! LLM client abstraction.
//!
//! The orchestrator only sees [`CodeGenerator`]. Behind it, [`LlmClient`]
//! renders the prompt, applies the provider's rate-limit delay and retry policy,
//! and extracts plain source from the reply. Providers are a closed set
//! ([`ProviderKind`]) mapped to one [`ChatBackend`] by [`build_backend`], once,
//! at startup.

pub mod anthropic;
pub mod client;
pub mod error;
pub mod google;
pub(crate) mod http;
pub mod ollama;
pub mod openai;

use std::fmt;
use std::time::Duration;

use clap::ValueEnum;

use crate::io::config::LlmConfig;
use crate::io::prompt::Prompt;

pub use client::{CodeGenerator, LlmClient, RetryPolicy};
pub use error::LlmError;

/// Supported model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Local Ollama server.
    #[value(name = "ollama")]
    Ollama,
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "anthropic")]
    Anthropic,
    /// Google Generative Language (Gemini) API.
    #[value(name = "googlegenai")]
    GoogleGenAi,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::GoogleGenAi => "googlegenai",
        }
    }

    /// Fixed pause before every request to stay under provider throttling.
    pub fn rate_limit_delay(self) -> Duration {
        match self {
            Self::Ollama => Duration::ZERO,
            Self::OpenAi => Duration::from_secs(5),
            Self::Anthropic | Self::GoogleGenAi => Duration::from_secs(2),
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Ollama => ollama::DEFAULT_BASE_URL,
            Self::OpenAi => openai::DEFAULT_BASE_URL,
            Self::Anthropic => anthropic::DEFAULT_BASE_URL,
            Self::GoogleGenAi => google::DEFAULT_BASE_URL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw model reply plus token accounting when the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: Option<u64>,
}

/// One provider's request/response mapping.
pub trait ChatBackend {
    fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError>;
}

/// Connection settings resolved at startup.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl BackendSettings {
    /// Resolve endpoint and credentials for `kind`, failing eagerly when credentials are absent.
    pub fn resolve<F>(
        kind: ProviderKind,
        model: &str,
        cfg: &LlmConfig,
        lookup: F,
    ) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = resolve_credentials(kind, &lookup)?;
        let base_url = match (&cfg.base_url, kind) {
            (Some(url), _) => url.clone(),
            (None, ProviderKind::Ollama) => lookup("OLLAMA_HOST")
                .filter(|host| !host.trim().is_empty())
                .map(|host| normalize_host(&host))
                .unwrap_or_else(|| kind.default_base_url().to_string()),
            (None, _) => kind.default_base_url().to_string(),
        };
        Ok(Self {
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            timeout: cfg.request_timeout(),
        })
    }
}

/// Look up the API key `kind` needs. Ollama needs none.
pub fn resolve_credentials<F>(kind: ProviderKind, lookup: &F) -> Result<Option<String>, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
    match kind {
        ProviderKind::Ollama => Ok(None),
        ProviderKind::OpenAi => present("OPENAI_API_KEY").map(Some).ok_or(
            LlmError::MissingCredentials {
                provider: "openai",
                hint: "set OPENAI_API_KEY",
            },
        ),
        ProviderKind::Anthropic => present("ANTHROPIC_API_KEY").map(Some).ok_or(
            LlmError::MissingCredentials {
                provider: "anthropic",
                hint: "set ANTHROPIC_API_KEY",
            },
        ),
        ProviderKind::GoogleGenAi => match present("GOOGLE_API_KEY") {
            Some(key) => Ok(Some(key)),
            None if present("GOOGLE_APPLICATION_CREDENTIALS").is_some() => {
                Err(LlmError::MissingCredentials {
                    provider: "googlegenai",
                    hint: "GOOGLE_APPLICATION_CREDENTIALS is set but the REST backend authenticates with GOOGLE_API_KEY",
                })
            }
            None => Err(LlmError::MissingCredentials {
                provider: "googlegenai",
                hint: "set GOOGLE_API_KEY",
            }),
        },
    }
}

/// Build the backend for `kind`.
pub fn build_backend(
    kind: ProviderKind,
    settings: BackendSettings,
) -> Result<Box<dyn ChatBackend>, LlmError> {
    let backend: Box<dyn ChatBackend> = match kind {
        ProviderKind::Ollama => Box::new(ollama::OllamaBackend::new(settings)?),
        ProviderKind::OpenAi => Box::new(openai::OpenAiBackend::new(settings)?),
        ProviderKind::Anthropic => Box::new(anthropic::AnthropicBackend::new(settings)?),
        ProviderKind::GoogleGenAi => Box::new(google::GoogleBackend::new(settings)?),
    };
    Ok(backend)
}

/// Credentials carried by settings, or a missing-credentials error naming `provider`.
pub(crate) fn require_key(
    settings: &BackendSettings,
    provider: &'static str,
    hint: &'static str,
) -> Result<String, LlmError> {
    settings
        .api_key
        .clone()
        .ok_or(LlmError::MissingCredentials { provider, hint })
}

fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
