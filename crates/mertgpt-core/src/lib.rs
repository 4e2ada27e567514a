pub mod ai;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod settings;
pub mod state;
pub mod view;

// Re-export main types for convenience
pub use ai::{ChatGateway, HttpGateway};
pub use controller::{ChatController, Completion, PendingRequest, Submission, TurnOutcome};
pub use conversation::Conversation;
pub use error::{ConfigurationRequired, GatewayError, SettingsError, ValidationError};
pub use settings::{Settings, SettingsStore, KNOWN_MODELS};
pub use state::{Role, Turn};
pub use view::ChatView;
