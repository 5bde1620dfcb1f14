//! Local Ollama server backend (`/api/chat`, non-streaming).

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::io::prompt::Prompt;
use crate::llm::error::LlmError;
use crate::llm::{BackendSettings, ChatBackend, Completion, http};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct OllamaBackend {
    client: Client,
    settings: BackendSettings,
}

impl OllamaBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, LlmError> {
        Ok(Self {
            client: http::client(settings.timeout)?,
            settings,
        })
    }
}

impl ChatBackend for OllamaBackend {
    fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            stream: false,
            options: Options {
                temperature: self.settings.temperature,
            },
        };
        let request = self
            .client
            .post(format!("{}/api/chat", self.settings.base_url))
            .json(&body);
        let response: ChatResponse = http::send_json(request)?;
        response.into_completion()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl ChatResponse {
    fn into_completion(self) -> Result<Completion, LlmError> {
        let text = self
            .message
            .map(|m| m.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;
        let total_tokens = match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, eval) => Some(prompt.unwrap_or(0) + eval.unwrap_or(0)),
        };
        Ok(Completion { text, total_tokens })
    }
}
