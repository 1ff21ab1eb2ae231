//! Shared data model: wire bodies and the chat transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Wire bodies
// =============================================================================

/// Body of `POST /query/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Free-text question typed by the user.
    pub question: String,
}

/// JSON reply for an analytical question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
}

/// JSON body carried by every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

// =============================================================================
// Transcript
// =============================================================================

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A decoded image reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContent {
    /// Raw PNG bytes as received.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub caption: String,
}

/// Payload of a transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryContent {
    Text(String),
    Image(ImageContent),
}

impl EntryContent {
    /// Text of the entry, or `None` for images.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EntryContent::Text(t) => Some(t),
            EntryContent::Image(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, EntryContent::Image(_))
    }
}

/// One turn in the session transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub role: Role,
    pub content: EntryContent,
    pub created_at: DateTime<Utc>,
}

/// Ordered, append-only session history.
///
/// Entries can only be pushed; nothing hands out mutable access to an entry
/// already recorded.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user question.
    pub fn push_user(&mut self, text: impl Into<String>) -> &TranscriptEntry {
        self.push(Role::User, EntryContent::Text(text.into()))
    }

    /// Append an assistant text reply (answers and synthesized errors alike).
    pub fn push_assistant_text(&mut self, text: impl Into<String>) -> &TranscriptEntry {
        self.push(Role::Assistant, EntryContent::Text(text.into()))
    }

    /// Append an assistant image reply.
    pub fn push_assistant_image(&mut self, image: ImageContent) -> &TranscriptEntry {
        self.push(Role::Assistant, EntryContent::Image(image))
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    fn push(&mut self, role: Role, content: EntryContent) -> &TranscriptEntry {
        self.entries.push(TranscriptEntry {
            id: Uuid::new_v4(),
            role,
            content,
            created_at: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }
}
