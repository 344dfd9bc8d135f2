//! Dialogue history types
//!
//! A session's history is append-only and insertion-ordered. Index 0 is
//! always the system prompt, fixed at session creation. Nothing here is
//! persisted; history lives and dies with the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm_types::{Message, Role};

/// Role of a dialogue turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::System => Role::System,
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// One turn of the dialogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only dialogue history for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueHistory {
    turns: Vec<Turn>,
}

impl DialogueHistory {
    /// Create a history seeded with the system prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::new(TurnRole::System, system_prompt)],
        }
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(TurnRole::User, content));
    }

    /// Append an assistant turn
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(TurnRole::Assistant, content));
    }

    /// All turns, in insertion order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The fixed system prompt
    pub fn system_prompt(&self) -> &str {
        &self.turns[0].content
    }

    /// Number of non-system turns
    pub fn turn_count(&self) -> usize {
        self.turns.len() - 1
    }

    /// View as chat messages for an LLM request
    pub fn messages(&self) -> Vec<Message> {
        self.turns
            .iter()
            .map(|t| Message {
                role: t.role.into(),
                content: t.content.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_seeded_with_system_prompt() {
        let history = DialogueHistory::new("You are Laura.");
        assert_eq!(history.turns().len(), 1);
        assert_eq!(history.system_prompt(), "You are Laura.");
        assert_eq!(history.turn_count(), 0);
    }

    #[test]
    fn test_history_append_order() {
        let mut history = DialogueHistory::new("system");
        history.push_assistant("hola, soy Laura");
        history.push_user("hola, bien");
        history.push_assistant("me alegro");

        let roles: Vec<TurnRole> = history.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                TurnRole::System,
                TurnRole::Assistant,
                TurnRole::User,
                TurnRole::Assistant
            ]
        );
        assert_eq!(history.turn_count(), 3);
    }

    #[test]
    fn test_messages_view() {
        let mut history = DialogueHistory::new("system");
        history.push_user("hola");

        let messages = history.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "hola");
    }
}
