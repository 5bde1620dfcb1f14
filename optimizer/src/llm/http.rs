//! Blocking JSON-over-HTTP plumbing shared by the backends.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::llm::error::LlmError;

const ERROR_BODY_LIMIT: usize = 2_000;

pub(crate) fn client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Client(e.to_string()))
}

/// Send a request and decode a successful JSON body into `R`.
pub(crate) fn send_json<R: DeserializeOwned>(request: RequestBuilder) -> Result<R, LlmError> {
    let response = request
        .send()
        .map_err(|e| LlmError::Network(e.to_string()))?;

    let status = response.status();
    debug!(status = status.as_u16(), "provider responded");
    if !status.is_success() {
        let mut message = response.text().unwrap_or_default();
        if message.len() > ERROR_BODY_LIMIT {
            let mut cut = ERROR_BODY_LIMIT;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response
        .text()
        .map_err(|e| LlmError::Network(e.to_string()))?;
    decode(&body)
}

pub(crate) fn decode<R: DeserializeOwned>(body: &str) -> Result<R, LlmError> {
    serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))
}
