use serde::{Deserialize, Serialize};

use crate::types::{ContentBlock, ConversationRole};

/// One role-tagged message in a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// The role of the message.
    pub role: ConversationRole,

    /// The content of the message.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a new `Message` with the given role and content.
    pub fn new(role: ConversationRole, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    /// Create a new user `Message` with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ConversationRole::User, vec![ContentBlock::text(text)])
    }

    /// Create a new assistant `Message` with a single text block.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(ConversationRole::Assistant, vec![ContentBlock::text(text)])
    }
}
