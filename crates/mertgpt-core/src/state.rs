//! UI-agnostic conversation types
//!
//! This module contains the data structures shared between the controller, the
//! gateway and whatever front end renders the chat. None of them depend on a
//! specific UI framework.

use serde::{Deserialize, Serialize};

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message exchanged in the conversation.
///
/// Turns are immutable once created: fields are only readable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serializes_with_lowercase_role() {
        let json = serde_json::to_value(Turn::assistant("Hi there")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "Hi there"}));
    }

    #[test]
    fn test_role_as_str_matches_wire_name() {
        for role in [Role::System, Role::User, Role::Assistant] {
            let wire = serde_json::to_value(role).unwrap();
            assert_eq!(wire, serde_json::Value::String(role.as_str().to_string()));
        }
    }
}
