//! Ordered, append-only conversation history

use crate::state::Turn;

/// Turns in chat order. Cleared only by [`Conversation::reset`].
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Read-only view used to build an outbound request
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Role;

    #[test]
    fn test_append_keeps_insertion_order() {
        let mut conversation = Conversation::new();
        conversation.append(Turn::user("Hello"));
        conversation.append(Turn::assistant("Hi there"));

        let roles: Vec<Role> = conversation.iter().map(|t| t.role()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(conversation.last().map(|t| t.content()), Some("Hi there"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut conversation = Conversation::new();
        conversation.append(Turn::user("one"));
        conversation.append(Turn::user("two"));
        conversation.reset();

        assert!(conversation.is_empty());
        assert_eq!(conversation.snapshot().len(), 0);
    }
}
