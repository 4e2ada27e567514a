/// Rendering collaborator driven by [`crate::ChatController`].
///
/// The controller never touches presentation state directly; a front end
/// implements this trait and draws whatever it is told to.
pub trait ChatView {
    fn render_user_turn(&mut self, text: &str);

    fn render_assistant_turn(&mut self, text: &str, is_error: bool);

    fn show_typing_indicator(&mut self);

    fn clear_typing_indicator(&mut self);

    /// Conversation was cleared; drop everything rendered so far
    fn reset_conversation_view(&mut self);

    /// A submit needs an API key; the front end should open its settings UI
    fn request_configuration(&mut self);
}
