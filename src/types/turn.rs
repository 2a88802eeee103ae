use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Attachment, StopReason, StreamMetrics, TokenUsage};

/// The author of a turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

/// Usage, latency, and stop reason attached to an assistant turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMetadata {
    /// Token counts, when the provider reported them.
    pub usage: Option<TokenUsage>,

    /// Latency, when the provider reported it.
    pub metrics: Option<StreamMetrics>,

    /// Why generation stopped.
    pub stop_reason: Option<StopReason>,
}

impl ResponseMetadata {
    /// Returns true when neither usage nor metrics were reported.
    pub fn is_empty(&self) -> bool {
        self.usage.is_none() && self.metrics.is_none()
    }
}

/// One message in a conversation.
///
/// A turn always carries text, an attachment, or both.  Turns are immutable
/// once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    role: ConversationRole,
    text: Option<String>,
    attachment: Option<Attachment>,
    metadata: Option<ResponseMetadata>,
}

impl Turn {
    /// Create a user turn.
    ///
    /// Whitespace-only text counts as no text.  A turn with neither text nor
    /// an attachment is rejected.
    pub fn user(text: Option<String>, attachment: Option<Attachment>) -> Result<Self> {
        let text = text.filter(|t| !t.trim().is_empty());
        if text.is_none() && attachment.is_none() {
            return Err(Error::validation(
                "a turn needs text or an attachment",
                Some("text".to_string()),
            ));
        }
        Ok(Self {
            role: ConversationRole::User,
            text,
            attachment,
            metadata: None,
        })
    }

    /// Create an assistant turn from a finished response.
    ///
    /// An empty response is kept as an empty string so the turn still
    /// satisfies the text-or-attachment invariant.
    pub fn assistant(text: impl Into<String>, metadata: Option<ResponseMetadata>) -> Self {
        Self {
            role: ConversationRole::Assistant,
            text: Some(text.into()),
            attachment: None,
            metadata,
        }
    }

    /// The author of this turn.
    pub fn role(&self) -> ConversationRole {
        self.role
    }

    /// The text of this turn, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The attachment bound to this turn, if any.
    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Response metadata; only assistant turns carry it.
    pub fn metadata(&self) -> Option<&ResponseMetadata> {
        self.metadata.as_ref()
    }
}
