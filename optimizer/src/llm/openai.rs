//! OpenAI chat completions backend.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::io::prompt::Prompt;
use crate::llm::error::LlmError;
use crate::llm::{BackendSettings, ChatBackend, Completion, http, require_key};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiBackend {
    client: Client,
    settings: BackendSettings,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, LlmError> {
        let api_key = require_key(&settings, "openai", "set OPENAI_API_KEY")?;
        Ok(Self {
            client: http::client(settings.timeout)?,
            settings,
            api_key,
        })
    }
}

impl ChatBackend for OpenAiBackend {
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
            temperature: self.settings.temperature,
        };
        let request = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatResponse = http::send_json(request)?;
        response.into_completion()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

impl ChatResponse {
    fn into_completion(self) -> Result<Completion, LlmError> {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;
        Ok(Completion {
            text,
            total_tokens: self.usage.map(|u| u.total_tokens),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_and_usage() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "print(1)"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let response: ChatResponse = http::decode(body).expect("decode");
        let completion = response.into_completion().expect("completion");
        assert_eq!(completion.text, "print(1)");
        assert_eq!(completion.total_tokens, Some(15));
    }

    #[test]
    fn null_content_is_empty_response() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let response: ChatResponse = http::decode(body).expect("decode");
        assert!(matches!(
            response.into_completion(),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn request_serializes_system_then_user() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: vec![
                Message {
                    role: "system",
                    content: "rules",
                },
                Message {
                    role: "user",
                    content: "code",
                },
            ],
            temperature: 1.0,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "code");
        assert_eq!(json["model"], "gpt-4o");
    }
}
