pub mod openai;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::settings::Settings;
use crate::state::Turn;

pub use openai::{build_request, interpret_response, ChatRequest, HttpGateway, SYSTEM_PROMPT};

/// Performs one chat-completion exchange for the given history.
///
/// Implementations make exactly one attempt per call; retrying is left to the user.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send(&self, settings: &Settings, history: &[Turn]) -> Result<Turn, GatewayError>;
}
