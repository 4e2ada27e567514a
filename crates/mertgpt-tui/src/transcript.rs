//! What the chat pane shows. Fed by the controller through [`ChatView`].

use mertgpt_core::{ChatView, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub role: Role,
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    typing: bool,
    configuration_requested: bool,
}

impl Transcript {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Nothing rendered yet: the welcome screen is shown instead of the chat
    pub fn is_blank(&self) -> bool {
        self.entries.is_empty() && !self.typing
    }

    pub fn take_configuration_request(&mut self) -> bool {
        std::mem::take(&mut self.configuration_requested)
    }
}

impl ChatView for Transcript {
    fn render_user_turn(&mut self, text: &str) {
        self.entries.push(Entry {
            role: Role::User,
            text: text.to_string(),
            is_error: false,
        });
    }

    fn render_assistant_turn(&mut self, text: &str, is_error: bool) {
        self.entries.push(Entry {
            role: Role::Assistant,
            text: text.to_string(),
            is_error,
        });
    }

    fn show_typing_indicator(&mut self) {
        self.typing = true;
    }

    fn clear_typing_indicator(&mut self) {
        self.typing = false;
    }

    fn reset_conversation_view(&mut self) {
        self.entries.clear();
        self.typing = false;
    }

    fn request_configuration(&mut self) {
        self.configuration_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_bubbles_are_kept_in_the_view() {
        let mut transcript = Transcript::default();
        transcript.render_user_turn("Hello");
        transcript.show_typing_indicator();
        assert!(!transcript.is_blank());

        transcript.clear_typing_indicator();
        transcript.render_assistant_turn("Error: boom", true);

        assert_eq!(transcript.entries().len(), 2);
        assert!(transcript.entries()[1].is_error);
        assert!(!transcript.is_typing());
    }

    #[test]
    fn test_reset_returns_to_blank() {
        let mut transcript = Transcript::default();
        transcript.render_user_turn("Hello");
        transcript.show_typing_indicator();
        transcript.reset_conversation_view();
        assert!(transcript.is_blank());
    }

    #[test]
    fn test_configuration_request_is_consumed_once() {
        let mut transcript = Transcript::default();
        transcript.request_configuration();
        assert!(transcript.take_configuration_request());
        assert!(!transcript.take_configuration_request());
    }
}
