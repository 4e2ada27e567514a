use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use mertgpt_core::{
    ChatController, ChatGateway, Completion, Settings, SettingsError, SettingsStore, Submission,
    TurnOutcome, ValidationError, KNOWN_MODELS,
};

use crate::transcript::Transcript;
use crate::tui::AppEvent;

/// Toast lifetime in ticks (300ms each)
const TOAST_TICKS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    ticks_left: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    ApiKey,
    Endpoint,
    Model,
}

impl SettingsField {
    fn next(self) -> Self {
        match self {
            SettingsField::ApiKey => SettingsField::Endpoint,
            SettingsField::Endpoint => SettingsField::Model,
            SettingsField::Model => SettingsField::ApiKey,
        }
    }

    fn prev(self) -> Self {
        match self {
            SettingsField::ApiKey => SettingsField::Model,
            SettingsField::Endpoint => SettingsField::ApiKey,
            SettingsField::Model => SettingsField::Endpoint,
        }
    }
}

/// Editable copy of the settings shown in the modal
#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
    pub focus: SettingsField,
    pub cursor: usize,
    pub reveal_key: bool,
}

impl SettingsForm {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            api_endpoint: settings.api_endpoint.clone(),
            model: settings.model.clone(),
            focus: SettingsField::ApiKey,
            cursor: settings.api_key.chars().count(),
            reveal_key: false,
        }
    }

    pub fn to_settings(&self) -> Settings {
        Settings {
            api_key: self.api_key.clone(),
            api_endpoint: self.api_endpoint.clone(),
            model: self.model.trim().to_string(),
        }
    }

    pub fn field(&self, field: SettingsField) -> &str {
        match field {
            SettingsField::ApiKey => &self.api_key,
            SettingsField::Endpoint => &self.api_endpoint,
            SettingsField::Model => &self.model,
        }
    }

    /// The focused field's text and the cursor, borrowed together for editing
    pub fn active_mut(&mut self) -> (&mut String, &mut usize) {
        let text = match self.focus {
            SettingsField::ApiKey => &mut self.api_key,
            SettingsField::Endpoint => &mut self.api_endpoint,
            SettingsField::Model => &mut self.model,
        };
        (text, &mut self.cursor)
    }

    pub fn focus_next(&mut self) {
        self.set_focus(self.focus.next());
    }

    pub fn focus_prev(&mut self) {
        self.set_focus(self.focus.prev());
    }

    fn set_focus(&mut self, field: SettingsField) {
        self.focus = field;
        self.cursor = self.field(field).chars().count();
    }

    /// Step through the known models; a custom model name jumps to the first entry
    pub fn cycle_model(&mut self, forward: bool) {
        let len = KNOWN_MODELS.len();
        let next = match KNOWN_MODELS.iter().position(|m| *m == self.model) {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None => 0,
        };
        self.model = KNOWN_MODELS[next].to_string();
        self.cursor = self.model.chars().count();
    }
}

pub struct App {
    pub should_quit: bool,

    // Chat state
    pub controller: ChatController,
    pub transcript: Transcript,
    pub gateway: Arc<dyn ChatGateway>,
    pub store: SettingsStore,
    events: UnboundedSender<AppEvent>,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Chat pane scroll, updated during render
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub follow_tail: bool,

    // Overlays
    pub settings_form: Option<SettingsForm>,
    pub toast: Option<Toast>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(
        settings: Settings,
        store: SettingsStore,
        gateway: Arc<dyn ChatGateway>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            controller: ChatController::new(settings),
            transcript: Transcript::default(),
            gateway,
            store,
            events,
            input: String::new(),
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            follow_tail: true,
            settings_form: None,
            toast: None,
            animation_frame: 0,
        }
    }

    pub fn screen(&self) -> Screen {
        if self.transcript.is_blank() {
            Screen::Welcome
        } else {
            Screen::Chat
        }
    }

    pub fn submit_input(&mut self) {
        match self.controller.begin(&self.input, &mut self.transcript) {
            Ok(Submission::Started(pending)) => {
                self.input.clear();
                self.input_cursor = 0;
                self.follow_tail = true;

                // Run the request off the event loop; the result comes back as an event
                let gateway = Arc::clone(&self.gateway);
                let tx = self.events.clone();
                tokio::spawn(async move {
                    let completion = pending.dispatch(gateway.as_ref()).await;
                    if tx.send(AppEvent::Completion(completion)).is_err() {
                        tracing::debug!("event loop gone, dropping completion");
                    }
                });
            }
            Ok(Submission::InFlight) => {
                self.notify("Please wait for the current reply", ToastKind::Info);
            }
            Ok(Submission::Empty) => {}
            Err(e) => tracing::debug!(error = %e, "submit rejected"),
        }

        if self.transcript.take_configuration_request() {
            self.notify("Please configure your API key first", ToastKind::Error);
            self.open_settings();
        }
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        if self.controller.complete(completion, &mut self.transcript) != TurnOutcome::Stale {
            self.follow_tail = true;
        }
    }

    pub fn new_chat(&mut self) {
        self.controller.new_chat(&mut self.transcript);
        self.input.clear();
        self.input_cursor = 0;
        self.chat_scroll = 0;
        self.follow_tail = true;
    }

    pub fn open_settings(&mut self) {
        self.settings_form = Some(SettingsForm::from_settings(self.controller.settings()));
    }

    /// Discard unsaved edits
    pub fn close_settings(&mut self) {
        self.settings_form = None;
    }

    pub fn save_settings(&mut self) {
        let Some(form) = &self.settings_form else {
            return;
        };

        let saved = self
            .controller
            .save_settings(&self.store, form.to_settings())
            .map(|_| ());

        match saved {
            Ok(()) => {
                self.settings_form = None;
                self.notify("Settings saved successfully!", ToastKind::Success);
            }
            Err(SettingsError::Invalid(ValidationError::MissingApiKey)) => {
                self.notify("API Key is required", ToastKind::Error);
            }
            Err(SettingsError::Invalid(ValidationError::MissingApiEndpoint)) => {
                self.notify("API Endpoint is required", ToastKind::Error);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save settings");
                self.notify("Failed to save settings", ToastKind::Error);
            }
        }
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toast = Some(Toast {
            message: message.into(),
            kind,
            ticks_left: TOAST_TICKS,
        });
    }

    pub fn tick(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;

        if let Some(toast) = &mut self.toast {
            toast.ticks_left = toast.ticks_left.saturating_sub(1);
            if toast.ticks_left == 0 {
                self.toast = None;
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Render clamps the offset and re-enables tail following at the bottom
    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn page_size(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mertgpt_core::{GatewayError, Role, Turn};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct EchoGateway;

    #[async_trait]
    impl ChatGateway for EchoGateway {
        async fn send(&self, _settings: &Settings, history: &[Turn]) -> Result<Turn, GatewayError> {
            let last = history.last().map(|t| t.content().to_string()).unwrap_or_default();
            Ok(Turn::assistant(format!("echo: {}", last)))
        }
    }

    fn app_with(settings: Settings, dir: &TempDir) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        (App::new(settings, store, Arc::new(EchoGateway), tx), rx)
    }

    fn keyed() -> Settings {
        Settings {
            api_key: "sk-test".to_string(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_submit_round_trips_through_event_channel() {
        let dir = TempDir::new().unwrap();
        let (mut app, mut rx) = app_with(keyed(), &dir);
        app.input = "Hello".to_string();
        app.input_cursor = 5;

        app.submit_input();
        assert_eq!(app.screen(), Screen::Chat);
        assert!(app.input.is_empty());
        assert!(app.transcript.is_typing());

        let completion = match rx.recv().await {
            Some(AppEvent::Completion(c)) => c,
            other => panic!("unexpected event {:?}", other),
        };
        app.handle_completion(completion);

        let entries = app.transcript.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].role, Role::Assistant);
        assert_eq!(entries[1].text, "echo: Hello");
        assert_eq!(app.controller.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_without_key_opens_settings() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app_with(Settings::default(), &dir);
        app.input = "Hello".to_string();

        app.submit_input();

        assert!(app.settings_form.is_some());
        assert_eq!(app.toast.as_ref().map(|t| t.kind), Some(ToastKind::Error));
        assert_eq!(app.input, "Hello");
        assert_eq!(app.screen(), Screen::Welcome);
    }

    #[tokio::test]
    async fn test_submit_with_blank_endpoint_opens_settings() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            api_endpoint: String::new(),
            ..keyed()
        };
        let (mut app, mut rx) = app_with(settings, &dir);
        app.input = "Hello".to_string();

        app.submit_input();

        assert!(app.settings_form.is_some());
        assert!(!app.controller.is_sending());
        assert!(app.controller.conversation().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_resize_event_leaves_state_alone() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app_with(keyed(), &dir);
        app.input = "draft".to_string();

        crate::handler::handle_event(&mut app, AppEvent::Resize).unwrap();

        assert!(!app.should_quit);
        assert_eq!(app.input, "draft");
        assert_eq!(app.screen(), Screen::Welcome);
    }

    #[tokio::test]
    async fn test_new_chat_while_sending_drops_late_reply() {
        let dir = TempDir::new().unwrap();
        let (mut app, mut rx) = app_with(keyed(), &dir);
        app.input = "Hello".to_string();
        app.submit_input();
        app.new_chat();

        if let Some(AppEvent::Completion(c)) = rx.recv().await {
            app.handle_completion(c);
        }
        assert_eq!(app.screen(), Screen::Welcome);
        assert!(app.controller.conversation().is_empty());
    }

    #[test]
    fn test_save_settings_validates_and_closes_modal() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app_with(Settings::default(), &dir);

        app.open_settings();
        app.save_settings();
        assert!(app.settings_form.is_some());
        assert_eq!(app.toast.as_ref().map(|t| t.message.as_str()), Some("API Key is required"));

        if let Some(form) = app.settings_form.as_mut() {
            form.api_key = "sk-saved".to_string();
        }
        app.save_settings();
        assert!(app.settings_form.is_none());
        assert_eq!(app.controller.settings().api_key, "sk-saved");
        assert_eq!(app.store.load().api_key, "sk-saved");
    }

    #[test]
    fn test_toast_expires_after_ticks() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = app_with(keyed(), &dir);
        app.notify("hi", ToastKind::Info);
        for _ in 0..TOAST_TICKS {
            assert!(app.toast.is_some());
            app.tick();
        }
        assert!(app.toast.is_none());
    }

    #[test]
    fn test_cycle_model_wraps_and_resets_custom_names() {
        let mut form = SettingsForm::from_settings(&Settings::default());
        form.cycle_model(true);
        assert_eq!(form.model, KNOWN_MODELS[1]);
        form.cycle_model(true);
        assert_eq!(form.model, KNOWN_MODELS[0]);
        form.cycle_model(false);
        assert_eq!(form.model, KNOWN_MODELS[1]);

        form.model = "my-local-model".to_string();
        form.cycle_model(true);
        assert_eq!(form.model, KNOWN_MODELS[0]);
    }
}
