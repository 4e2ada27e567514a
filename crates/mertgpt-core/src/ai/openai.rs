use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ChatGateway;
use crate::error::GatewayError;
use crate::settings::Settings;
use crate::state::Turn;

pub const SYSTEM_PROMPT: &str =
    "You are MGPT, a helpful AI assistant. Provide clear, concise, and accurate responses.";

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 1000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Fixed system turn followed by the full history
pub fn build_request(settings: &Settings, history: &[Turn]) -> ChatRequest {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Turn::system(SYSTEM_PROMPT));
    messages.extend(history.iter().cloned());

    ChatRequest {
        model: settings.model.clone(),
        messages,
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// Maps a raw HTTP status and body to an assistant turn or a gateway error
pub fn interpret_response(status: u16, body: &str) -> Result<Turn, GatewayError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.message)
            .filter(|m| !m.is_empty());

        return Err(match message {
            Some(message) => GatewayError::Api(message),
            None => GatewayError::status_fallback(status),
        });
    }

    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|_| GatewayError::InvalidResponse)?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(Turn::assistant)
        .ok_or(GatewayError::InvalidResponse)
}

/// Gateway for OpenAI-compatible `/chat/completions` endpoints
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
}

impl HttpGateway {
    pub fn new() -> Result<Self, GatewayError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send(&self, settings: &Settings, history: &[Turn]) -> Result<Turn, GatewayError> {
        let request = build_request(settings, history);

        tracing::debug!(
            endpoint = %settings.api_endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&settings.api_endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", settings.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            // An unreadable error body still reports the status
            Err(e) if !status.is_success() => {
                tracing::warn!(status = status.as_u16(), error = %e, "could not read error body");
                String::new()
            }
            Err(e) => return Err(e.into()),
        };
        let status = status.as_u16();

        let result = interpret_response(status, &body);
        if let Err(e) = &result {
            tracing::warn!(status, error = %e, "chat completion failed");
        }
        result
    }
}
