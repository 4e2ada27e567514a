//! Turn lifecycle: validate, append, call the gateway, render the outcome.
//!
//! A turn is split in three steps so a front end can run the network call on
//! its own task without holding the controller:
//!
//! 1. [`ChatController::begin`] validates input, records the user turn and
//!    hands out a [`PendingRequest`] tagged with the current generation.
//! 2. [`PendingRequest::dispatch`] performs the single gateway call.
//! 3. [`ChatController::complete`] applies the [`Completion`], unless a
//!    "new chat" (or any later request) bumped the generation in between, in
//!    which case the completion is stale and dropped.

use crate::ai::ChatGateway;
use crate::conversation::Conversation;
use crate::error::{ConfigurationRequired, GatewayError, SettingsError};
use crate::settings::{Settings, SettingsStore};
use crate::state::Turn;
use crate::view::ChatView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Idle,
    Sending { generation: u64 },
}

/// Result of [`ChatController::begin`]
#[derive(Debug)]
pub enum Submission {
    /// Blank input, nothing happened
    Empty,
    /// A request is already outstanding, nothing happened
    InFlight,
    Started(PendingRequest),
}

/// What [`ChatController::complete`] did with a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied,
    /// Endpoint answered with empty content; nothing recorded
    EmptyReply,
    Failed,
    /// Belonged to a request that is no longer current
    Stale,
}

/// Everything one gateway call needs, detached from the controller
#[derive(Debug)]
pub struct PendingRequest {
    generation: u64,
    settings: Settings,
    history: Vec<Turn>,
}

impl PendingRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub async fn dispatch<G: ChatGateway + ?Sized>(self, gateway: &G) -> Completion {
        let result = gateway.send(&self.settings, &self.history).await;
        Completion {
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug)]
pub struct Completion {
    generation: u64,
    result: Result<Turn, GatewayError>,
}

impl Completion {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub fn error_message(err: &GatewayError) -> String {
    format!(
        "Error: {}. Please check your API key and endpoint settings.",
        err
    )
}

/// Owns the settings, the conversation and the in-flight state
#[derive(Debug)]
pub struct ChatController {
    settings: Settings,
    conversation: Conversation,
    state: RequestState,
    generation: u64,
}

impl ChatController {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            conversation: Conversation::new(),
            state: RequestState::Idle,
            generation: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_sending(&self) -> bool {
        matches!(self.state, RequestState::Sending { .. })
    }

    /// Adopt settings for this session without persisting them
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Validate and persist through `store`; on success the saved value becomes current
    pub fn save_settings(
        &mut self,
        store: &SettingsStore,
        candidate: Settings,
    ) -> Result<&Settings, SettingsError> {
        self.settings = store.save(candidate)?;
        Ok(&self.settings)
    }

    pub fn begin(
        &mut self,
        text: &str,
        view: &mut dyn ChatView,
    ) -> Result<Submission, ConfigurationRequired> {
        if self.is_sending() {
            tracing::debug!("submit ignored, request already in flight");
            return Ok(Submission::InFlight);
        }

        let text = text.trim();
        if text.is_empty() {
            return Ok(Submission::Empty);
        }

        if !self.settings.is_configured() {
            view.request_configuration();
            return Err(ConfigurationRequired);
        }

        self.conversation.append(Turn::user(text));
        view.render_user_turn(text);
        view.show_typing_indicator();

        self.generation += 1;
        self.state = RequestState::Sending {
            generation: self.generation,
        };
        tracing::debug!(
            generation = self.generation,
            turns = self.conversation.len(),
            "request started"
        );

        Ok(Submission::Started(PendingRequest {
            generation: self.generation,
            settings: self.settings.clone(),
            history: self.conversation.snapshot().to_vec(),
        }))
    }

    pub fn complete(&mut self, completion: Completion, view: &mut dyn ChatView) -> TurnOutcome {
        match self.state {
            RequestState::Sending { generation } if generation == completion.generation => {}
            _ => {
                tracing::warn!(
                    generation = completion.generation,
                    current = self.generation,
                    "discarding stale completion"
                );
                return TurnOutcome::Stale;
            }
        }

        self.state = RequestState::Idle;
        view.clear_typing_indicator();

        match completion.result {
            Ok(turn) if turn.content().is_empty() => {
                tracing::warn!(generation = completion.generation, "endpoint returned empty content");
                TurnOutcome::EmptyReply
            }
            Ok(turn) => {
                view.render_assistant_turn(turn.content(), false);
                self.conversation.append(turn);
                TurnOutcome::Replied
            }
            Err(err) => {
                view.render_assistant_turn(&error_message(&err), true);
                TurnOutcome::Failed
            }
        }
    }

    /// Run a whole turn inline. `Ok(None)` means the submit was a no-op.
    pub async fn submit<G: ChatGateway + ?Sized>(
        &mut self,
        text: &str,
        gateway: &G,
        view: &mut dyn ChatView,
    ) -> Result<Option<TurnOutcome>, ConfigurationRequired> {
        match self.begin(text, view)? {
            Submission::Started(pending) => {
                let completion = pending.dispatch(gateway).await;
                Ok(Some(self.complete(completion, view)))
            }
            Submission::Empty | Submission::InFlight => Ok(None),
        }
    }

    /// Always accepted. Any outstanding completion becomes stale.
    pub fn new_chat(&mut self, view: &mut dyn ChatView) {
        self.conversation.reset();
        self.generation += 1;
        self.state = RequestState::Idle;
        view.reset_conversation_view();
        tracing::debug!(generation = self.generation, "new chat");
    }
}
