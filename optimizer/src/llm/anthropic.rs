//! Anthropic Messages API backend.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::io::prompt::Prompt;
use crate::llm::error::LlmError;
use crate::llm::{BackendSettings, ChatBackend, Completion, http, require_key};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    client: Client,
    settings: BackendSettings,
    api_key: String,
}

impl AnthropicBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, LlmError> {
        let api_key = require_key(&settings, "anthropic", "set ANTHROPIC_API_KEY")?;
        Ok(Self {
            client: http::client(settings.timeout)?,
            settings,
            api_key,
        })
    }
}

impl ChatBackend for AnthropicBackend {
    fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError> {
        let body = MessagesRequest {
            model: &self.settings.model,
            system: &prompt.system,
            messages: vec![Message {
                role: "user",
                content: &prompt.user,
            }],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature.min(1.0),
        };
        let request = self
            .client
            .post(format!("{}/messages", self.settings.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let response: MessagesResponse = http::send_json(request)?;
        response.into_completion()
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

impl MessagesResponse {
    fn into_completion(self) -> Result<Completion, LlmError> {
        let text: String = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(Completion {
            text,
            total_tokens: self.usage.map(|u| u.input_tokens + u.output_tokens),
        })
    }
}
