//! Google Generative Language API backend (`models/{model}:generateContent`).

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::io::prompt::Prompt;
use crate::llm::error::LlmError;
use crate::llm::{BackendSettings, ChatBackend, Completion, http, require_key};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleBackend {
    client: Client,
    settings: BackendSettings,
    api_key: String,
}

impl GoogleBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, LlmError> {
        let api_key = require_key(&settings, "googlegenai", "set GOOGLE_API_KEY")?;
        Ok(Self {
            client: http::client(settings.timeout)?,
            settings,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        let model = self
            .settings
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.settings.model);
        format!("{}/models/{model}:generateContent", self.settings.base_url)
    }
}

impl ChatBackend for GoogleBackend {
    fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError> {
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &prompt.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt.user }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        };
        let request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response: GenerateResponse = http::send_json(request)?;
        response.into_completion()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

impl GenerateResponse {
    fn into_completion(self) -> Result<Completion, LlmError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(Completion {
            text,
            total_tokens: self.usage_metadata.and_then(|u| u.total_token_count),
        })
    }
}
