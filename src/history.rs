//! Conversation history.
//!
//! Ordered log of every turn exchanged in this process. The full log is the
//! payload of every completion call: nothing is windowed, reordered or
//! deduplicated. Only the session loop appends to it.

use serde::{Deserialize, Serialize};

// ── Message ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// The service's reply. Sent on the wire under the provider's reply role.
    #[serde(rename = "assistant")]
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

// ── History ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn append(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// Owned point-in-time copy, handed to the completion worker.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
